//! Request header parsing

use axum::http::HeaderMap;

/// How unknown search filters are treated, from `Prefer: handling=...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreferHandling {
    /// Report unknown filters in the response and search anyway
    #[default]
    Lenient,
    /// Reject the request with 400
    Strict,
}

impl PreferHandling {
    pub fn is_strict(self) -> bool {
        matches!(self, PreferHandling::Strict)
    }
}

/// Read the handling preference from the `Prefer` header.
///
/// The header may carry several comma-separated preferences; only
/// `handling` is consulted.
///
/// # Examples
/// ```
/// use axum::http::HeaderMap;
/// use dataspace_search::api::headers::{extract_prefer_handling, PreferHandling};
/// let mut headers = HeaderMap::new();
/// headers.insert("prefer", "return=minimal, handling=strict".parse().unwrap());
/// assert_eq!(extract_prefer_handling(&headers), PreferHandling::Strict);
/// ```
pub fn extract_prefer_handling(headers: &HeaderMap) -> PreferHandling {
    headers
        .get_all("prefer")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|pref| {
            let (key, value) = pref.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("handling")
                .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
        })
        .last()
        .map(|value| match value.as_str() {
            "strict" => PreferHandling::Strict,
            _ => PreferHandling::Lenient,
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("prefer", value.parse().unwrap());
        headers
    }

    #[test]
    fn missing_header_is_lenient() {
        assert_eq!(
            extract_prefer_handling(&HeaderMap::new()),
            PreferHandling::Lenient
        );
    }

    #[test]
    fn strict_is_case_insensitive() {
        assert!(extract_prefer_handling(&headers("Handling=STRICT")).is_strict());
        assert!(extract_prefer_handling(&headers("handling=\"strict\"")).is_strict());
    }

    #[test]
    fn other_values_are_lenient() {
        assert_eq!(
            extract_prefer_handling(&headers("handling=lenient")),
            PreferHandling::Lenient
        );
        assert_eq!(
            extract_prefer_handling(&headers("return=minimal")),
            PreferHandling::Lenient
        );
        assert_eq!(
            extract_prefer_handling(&headers("handling=bogus")),
            PreferHandling::Lenient
        );
    }
}
