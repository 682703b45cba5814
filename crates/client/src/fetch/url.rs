//! URL resolution for consistent cache keys and origin checks.

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a manifest or request URL against the application origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve relative references (`./index.html`, `/app.css`) against `base`
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
///
/// The resulting string form is the cache key.
pub fn resolve(base: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        parsed
            .set_host(Some(&lowered))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Url {
        Url::parse("https://app.example/").unwrap()
    }

    #[test]
    fn test_resolve_relative() {
        let url = resolve(&origin(), "./index.html").unwrap();
        assert_eq!(url.as_str(), "https://app.example/index.html");
    }

    #[test]
    fn test_resolve_root_relative() {
        let url = resolve(&origin(), "/shell.html").unwrap();
        assert_eq!(url.as_str(), "https://app.example/shell.html");
    }

    #[test]
    fn test_resolve_absolute_cross_origin() {
        let url = resolve(&origin(), "https://cdn.example/font.css").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example"));
        assert!(!is_same_origin(&url, &origin()));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve(&origin(), "https://CDN.EXAMPLE/x.js").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example"));
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve(&origin(), "/index.html#settings").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.as_str(), "https://app.example/index.html");
    }

    #[test]
    fn test_resolve_preserve_query() {
        let url = resolve(&origin(), "https://fonts.example/css2?family=Cairo:wght@400;700&display=swap").unwrap();
        assert_eq!(url.query(), Some("family=Cairo:wght@400;700&display=swap"));
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve(&origin(), "file:///etc/passwd");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&origin(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&origin(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin_respects_port() {
        let a = Url::parse("http://localhost:8080/a").unwrap();
        let b = Url::parse("http://localhost:9090/a").unwrap();
        assert!(!is_same_origin(&a, &b));
        assert!(is_same_origin(&a, &Url::parse("http://localhost:8080/b").unwrap()));
    }
}
