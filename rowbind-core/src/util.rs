use std::borrow::Cow;

/// Shorten long SQL text for error messages and logs.
pub fn truncate_long(query: &str) -> Cow<'_, str> {
    match query.char_indices().nth(497) {
        Some((end, _)) => Cow::Owned(format!("{}...", query[..end].trim_end())),
        None => Cow::Borrowed(query.trim_end()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_queries_are_kept() {
        assert_eq!(truncate_long("SELECT 1\n"), "SELECT 1");
    }

    #[test]
    fn long_queries_are_cut() {
        let query = format!("SELECT '{}'", "é".repeat(1000));
        let truncated = truncate_long(&query);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 500);
    }
}
