//! Small helpers shared across modules.

/// Longest slice of a remote response body copied into logs and errors.
pub const BODY_PREVIEW_CHARS: usize = 500;

/// Truncate `body` to at most [`BODY_PREVIEW_CHARS`] characters.
pub fn preview(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => body[..idx].to_string(),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "é".repeat(BODY_PREVIEW_CHARS + 10);
        assert_eq!(preview(&long).chars().count(), BODY_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
