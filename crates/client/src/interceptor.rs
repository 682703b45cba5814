//! Entry point for every request issued by a page.
//!
//! Resolves which version's namespace serves the request, then hands it to
//! the [`Router`]. Pages with no controlling version go straight to the
//! network, as do non-GET requests.

use std::sync::Arc;

use shellcache_core::{Error, Namespace, Response};

use crate::fetch::Request;
use crate::lifecycle::{ClientId, Registration};
use crate::router::Router;

#[derive(Clone)]
pub struct Interceptor {
    registration: Arc<Registration>,
    router: Router,
}

impl Interceptor {
    pub fn new(registration: Arc<Registration>, router: Router) -> Self {
        Self { registration, router }
    }

    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serve `request` on behalf of `client`.
    ///
    /// Without a client id the request is treated as coming from a page
    /// controlled by the active version.
    pub async fn intercept(&self, client: Option<ClientId>, request: Request) -> Result<Response, Error> {
        if request.method != reqwest::Method::GET {
            return self.router.passthrough(&request).await;
        }

        match self.namespace_for(client).await? {
            Some(namespace) => self.router.handle(&namespace, request).await,
            None => {
                tracing::debug!(url = %request.url, "uncontrolled request; passing through");
                self.router.passthrough(&request).await
            }
        }
    }

    async fn namespace_for(&self, client: Option<ClientId>) -> Result<Option<Namespace>, Error> {
        let controller = match client {
            Some(id) => self.registration.controller(id).await,
            None => self.registration.active().await,
        };
        let Some(version) = controller else {
            return Ok(None);
        };

        if let Some(namespace) = self.registration.db().existing_namespace(&version).await? {
            return Ok(Some(namespace));
        }

        match self.registration.active_namespace().await {
            Ok(namespace) => Ok(Some(namespace)),
            Err(Error::NotActive) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::RequestMode;
    use crate::precache::PrecacheLoader;
    use crate::testing::ScriptedFetcher;
    use shellcache_core::{CacheDb, PrecacheManifest, RouteTable};
    use url::Url;

    const ORIGIN: &str = "https://app.example/";

    fn ok(body: &str) -> Response {
        Response::new(200, vec![], body.to_string())
    }

    async fn interceptor(fetcher: Arc<ScriptedFetcher>) -> Interceptor {
        let origin = Url::parse(ORIGIN).unwrap();
        let db = CacheDb::open_in_memory().await.unwrap();
        let loader = PrecacheLoader::new(fetcher.clone(), origin.clone());
        let registration = Arc::new(Registration::new(db, loader, true));
        let router = Router::new(
            fetcher,
            origin.clone(),
            RouteTable::default(),
            origin.join("index.html").unwrap(),
            origin.join("offline.html").unwrap(),
        );
        Interceptor::new(registration, router)
    }

    fn manifest() -> PrecacheManifest {
        PrecacheManifest { critical: vec!["/index.html".into(), "/offline.html".into()], optional: vec![] }
    }

    fn fetcher() -> Arc<ScriptedFetcher> {
        Arc::new(
            ScriptedFetcher::new()
                .with_response("https://app.example/index.html", ok("shell"))
                .with_response("https://app.example/offline.html", ok("offline")),
        )
    }

    #[tokio::test]
    async fn test_uncontrolled_passes_through() {
        let fetcher = fetcher();
        let icpt = interceptor(fetcher.clone()).await;
        fetcher.set_response("https://app.example/data.json", ok("{}"));

        let resp = icpt
            .intercept(None, Request::parse(&Url::parse(ORIGIN).unwrap(), "/data.json", RequestMode::SameOrigin).unwrap())
            .await
            .unwrap();

        assert_eq!(&resp.body[..], b"{}");
        assert!(icpt.registration().db().namespaces().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claimed_page_served_offline() {
        let fetcher = fetcher();
        let icpt = interceptor(fetcher.clone()).await;
        let page = icpt.registration().connect_client().await;
        icpt.registration().install("v1", &manifest()).await.unwrap();

        fetcher.set_offline(true);
        let resp = icpt
            .intercept(Some(page), Request::navigate(Url::parse("https://app.example/settings").unwrap()))
            .await
            .unwrap();

        assert_eq!(&resp.body[..], b"shell");
    }

    #[tokio::test]
    async fn test_unknown_client_passes_through() {
        let fetcher = fetcher();
        let icpt = interceptor(fetcher.clone()).await;
        icpt.registration().install("v1", &manifest()).await.unwrap();
        fetcher.set_offline(true);

        let result = icpt
            .intercept(Some(ClientId(999)), Request::navigate(Url::parse("https://app.example/").unwrap()))
            .await;

        assert!(matches!(result, Err(Error::NetworkFailure(_))));
    }
}
