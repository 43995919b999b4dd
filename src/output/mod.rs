// Terminal output helpers.

pub mod terminal;

/// Truncate a string to at most `max_chars` characters, appending "..." when
/// anything was cut. Counts chars, not bytes, so multi-byte text is safe.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{truncated}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_within_limit() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_over_limit() {
        assert_eq!(truncate_chars("hello!", 5), "hello...");
    }

    #[test]
    fn test_truncate_emoji_safe() {
        let text = "Hello \u{1f30d}!";
        let result = truncate_chars(text, 7);
        assert_eq!(result, "Hello \u{1f30d}...");
    }
}
