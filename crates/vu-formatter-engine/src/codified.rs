/// Keyword that opens every codified statement.
pub const CODIFIED_KEYWORD: &str = "codified-vu";

/// Returns true if `text` is written in the machine-checkable VU syntax.
///
/// This is a cheap lexical pre-filter. Anything it lets through that is not
/// actually valid is rejected later by the validator; anything it misses is
/// left alone as legacy prose.
pub fn is_codified(text: &str) -> bool {
    text.trim_start()
        .strip_prefix(CODIFIED_KEYWORD)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}
