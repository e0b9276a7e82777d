use regex::Regex;
use std::sync::OnceLock;

/// Turn a book title into a file stem.
///
/// Whitespace runs become `_`, as do path separators, quotes and control
/// characters, so the stem stays inside the scratch directory and can be
/// quoted in a `Content-Disposition` header.
pub fn sanitize_title(title: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static UNSAFE: OnceLock<Regex> = OnceLock::new();

    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
    let unsafe_chars =
        UNSAFE.get_or_init(|| Regex::new(r#"[/\\"\p{Cc}]"#).expect("valid regex"));

    let stem = whitespace.replace_all(title.trim(), "_");
    unsafe_chars.replace_all(&stem, "_").into_owned()
}

/// `Content-Disposition` value for a download. Non-ASCII names get an
/// RFC 5987 `filename*` next to an ASCII-only `filename`.
pub fn content_disposition(file_name: &str) -> String {
    if file_name.is_ascii() {
        return format!("attachment; filename=\"{file_name}\"");
    }

    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}
