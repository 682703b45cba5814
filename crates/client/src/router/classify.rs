//! Request classification.

use reqwest::Method;
use url::Url;

use crate::fetch::{Request, is_same_origin};

/// The two axes a request is routed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestClass {
    pub navigation: bool,
    pub same_origin: bool,
    /// Only GET requests are ever served from or written to the store.
    pub cacheable_method: bool,
}

pub fn classify(request: &Request, origin: &Url) -> RequestClass {
    RequestClass {
        navigation: request.is_navigation(),
        same_origin: is_same_origin(&request.url, origin),
        cacheable_method: request.method == Method::GET,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RequestMode;

    fn origin() -> Url {
        Url::parse("https://app.example/").unwrap()
    }

    #[test]
    fn test_navigation_same_origin() {
        let req = Request::navigate(Url::parse("https://app.example/settings").unwrap());
        let class = classify(&req, &origin());
        assert!(class.navigation);
        assert!(class.same_origin);
        assert!(class.cacheable_method);
    }

    #[test]
    fn test_cross_origin_subresource() {
        let req = Request::parse(&origin(), "https://cdn.example/tw.js", RequestMode::NoCors).unwrap();
        let class = classify(&req, &origin());
        assert!(!class.navigation);
        assert!(!class.same_origin);
    }

    #[test]
    fn test_post_not_cacheable() {
        let req = Request::get(Url::parse("https://app.example/api").unwrap()).with_method(Method::POST, None);
        assert!(!classify(&req, &origin()).cacheable_method);
    }
}
