//! Text helpers for configuration values, URLs and scraped page content.

/// The trimmed value, or `None` when only whitespace remains.
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Whether `value` is an absolute `http` or `https` URL with something after
/// the scheme. The scheme is matched case-insensitively.
pub fn is_http_url(value: &str) -> bool {
    value.split_once("://").is_some_and(|(scheme, rest)| {
        !rest.is_empty()
            && (scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https"))
    })
}

/// Concatenate fragments and squeeze every whitespace run into one space.
pub fn collapse_whitespace<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let joined: String = parts.into_iter().collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
