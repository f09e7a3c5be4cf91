use std::sync::Arc;

use web_time::Instant;

use crate::error::ReleaseError;
use crate::event::{CfRequest, CloudFrontEvent};
use crate::resolver::{ReleaseResolver, Resolution};
use crate::rewrite::rewrite_origin_path;

/// Entry point invoked once per edge request.
///
/// Cheap to clone; clones share the resolver and therefore its cache.
#[derive(Clone)]
pub struct ReleaseRouter {
    resolver: Arc<dyn ReleaseResolver>,
}

impl ReleaseRouter {
    pub fn new<R>(resolver: R) -> Self
    where
        R: ReleaseResolver + 'static,
    {
        Self {
            resolver: Arc::new(resolver),
        }
    }

    pub fn from_shared(resolver: Arc<dyn ReleaseResolver>) -> Self {
        Self { resolver }
    }

    /// Handle a full platform event and return the rewritten request record.
    pub async fn handle_event(&self, event: CloudFrontEvent) -> Result<CfRequest, ReleaseError> {
        let request = event.into_request()?;
        self.handle_request(request).await
    }

    /// Resolve the release for `request` and point its origin at the release prefix.
    pub async fn handle_request(&self, mut request: CfRequest) -> Result<CfRequest, ReleaseError> {
        let start = Instant::now();
        match self.route(&mut request).await {
            Ok(Resolution { release, source }) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                log::info!(
                    "request uri={} release={} source={} origin_path={} elapsed_ms={:.2}",
                    request.uri,
                    release,
                    source,
                    request.origin_path().unwrap_or(""),
                    elapsed
                );
                Ok(request)
            }
            Err(err) => {
                let elapsed = start.elapsed().as_secs_f64() * 1000.0;
                log::error!(
                    "request uri={} error={} elapsed_ms={:.2}",
                    request.uri,
                    err,
                    elapsed
                );
                Err(err)
            }
        }
    }

    async fn route(&self, request: &mut CfRequest) -> Result<Resolution, ReleaseError> {
        let resolution = self.resolver.resolve(request).await?;
        rewrite_origin_path(request, &resolution.release)?;
        Ok(resolution)
    }
}

impl std::fmt::Debug for ReleaseRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseRouter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ReleaseCache, DEFAULT_TTL};
    use crate::clock::ManualClock;
    use crate::parameter::{ParameterError, ParameterStore};
    use crate::resolver::{CachedResolver, CookieResolver};
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedStore {
        value: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ParameterStore for FixedStore {
        async fn get_parameter(&self, name: &str) -> Result<String, ParameterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.value
                .map(str::to_string)
                .ok_or_else(|| ParameterError::NotFound {
                    name: name.to_string(),
                })
        }
    }

    fn event(uri: &str, cookie: Option<&str>) -> CloudFrontEvent {
        let mut request = CfRequest::new("GET", uri).with_s3_origin("releases.s3.amazonaws.com");
        if let Some(cookie) = cookie {
            request.append_header("Cookie", cookie);
        }
        CloudFrontEvent::from_request(request)
    }

    #[test]
    fn cookie_router_rewrites_with_cookie_release() {
        let router = ReleaseRouter::new(CookieResolver::default());
        let request = block_on(router.handle_event(event("/assets/app.js", Some("release=2.3.1"))))
            .expect("request");
        assert_eq!(request.origin_path(), Some("/2.3.1/assets/app.js"));
    }

    #[test]
    fn cookie_router_uses_fallback() {
        let router = ReleaseRouter::new(CookieResolver::default());
        let request =
            block_on(router.handle_event(event("/index.html", None))).expect("request");
        assert_eq!(request.origin_path(), Some("/1.0.2/index.html"));
    }

    #[test]
    fn cached_router_fetches_once_across_invocations() {
        let store = Arc::new(FixedStore {
            value: Some("4.2.0"),
            calls: AtomicUsize::new(0),
        });
        let clock = Arc::new(ManualClock::new());
        let resolver = CachedResolver::new(store.clone())
            .with_cache(ReleaseCache::new(DEFAULT_TTL, clock));
        let router = ReleaseRouter::new(resolver);

        for uri in ["/a.js", "/b.css", "/index.html"] {
            let request = block_on(router.handle_event(event(uri, None))).expect("request");
            assert_eq!(request.origin_path(), Some(format!("/4.2.0{uri}").as_str()));
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clones_share_the_cache() {
        let store = Arc::new(FixedStore {
            value: Some("4.2.0"),
            calls: AtomicUsize::new(0),
        });
        let router = ReleaseRouter::new(CachedResolver::new(store.clone()));
        let other = router.clone();
        block_on(router.handle_event(event("/a.js", None))).expect("first");
        block_on(other.handle_event(event("/b.js", None))).expect("second");
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_parameter_fails_invocation() {
        let store = Arc::new(FixedStore {
            value: None,
            calls: AtomicUsize::new(0),
        });
        let router = ReleaseRouter::new(CachedResolver::new(store));
        let err = block_on(router.handle_event(event("/index.html", None))).expect_err("error");
        assert!(err.to_string().contains("targetRelease"));
    }

    #[test]
    fn event_without_origin_fails() {
        let router = ReleaseRouter::new(CookieResolver::default());
        let event = CloudFrontEvent::from_request(CfRequest::new("GET", "/index.html"));
        let err = block_on(router.handle_event(event)).expect_err("error");
        assert!(matches!(err, ReleaseError::InvalidEvent { .. }));
    }

    #[test]
    fn handle_request_preserves_other_fields() {
        let router = ReleaseRouter::new(CookieResolver::default());
        let mut request = CfRequest::new("POST", "/api/form").with_s3_origin("bucket");
        request.querystring = "a=1".into();
        request.append_header("Host", "example.com");
        let request = block_on(router.handle_request(request)).expect("request");
        assert_eq!(request.method, "POST");
        assert_eq!(request.uri, "/api/form");
        assert_eq!(request.querystring, "a=1");
        assert_eq!(request.header("host"), Some("example.com"));
    }

    #[test]
    fn from_shared_uses_given_resolver() {
        let resolver: Arc<dyn ReleaseResolver> =
            Arc::new(CookieResolver::new("7.0.0".parse().expect("release")));
        let router = ReleaseRouter::from_shared(resolver);
        let request = block_on(router.handle_event(event("/", None))).expect("request");
        assert_eq!(request.origin_path(), Some("/7.0.0/"));
        assert!(format!("{router:?}").contains("ReleaseRouter"));
    }
}
