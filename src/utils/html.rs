use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Whitelist-based: safe tags (like <b>, <p>) are preserved while dangerous
/// tags (like <script>, <iframe>) and attributes (like onclick) are stripped.
///
/// Only applied to rich-text fields such as quiz descriptions. Question and
/// option text may legitimately contain angle brackets (`Vec<T>`) and is
/// stored as-is; clients must render it as text.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
