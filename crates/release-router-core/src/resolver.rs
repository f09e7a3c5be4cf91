use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{ReleaseCache, DEFAULT_TTL};
use crate::clock::SystemClock;
use crate::cookie::{find_cookie, RELEASE_COOKIE};
use crate::error::ReleaseError;
use crate::event::CfRequest;
use crate::parameter::{ParameterStore, DEFAULT_PARAMETER_NAME};
use crate::release::ReleaseId;

/// Where a resolved release came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseSource {
    Cookie,
    Fallback,
    Cache,
    Remote,
    Stale,
}

impl ReleaseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Fallback => "fallback",
            Self::Cache => "cache",
            Self::Remote => "remote",
            Self::Stale => "stale",
        }
    }
}

impl fmt::Display for ReleaseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub release: ReleaseId,
    pub source: ReleaseSource,
}

impl Resolution {
    pub fn new(release: ReleaseId, source: ReleaseSource) -> Self {
        Self { release, source }
    }
}

/// Picks the release a request should be served from.
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    async fn resolve(&self, request: &CfRequest) -> Result<Resolution, ReleaseError>;
}

/// Release pinned by cookie. Values that are not valid release ids are ignored.
fn cookie_release(request: &CfRequest, cookie: &str) -> Option<ReleaseId> {
    let raw = find_cookie(request, cookie)?;
    match ReleaseId::parse(raw) {
        Ok(release) => Some(release),
        Err(err) => {
            log::warn!("ignoring `{cookie}` cookie: {err}");
            None
        }
    }
}

/// Resolves from the release cookie, otherwise serves a fixed fallback release.
#[derive(Clone, Debug)]
pub struct CookieResolver {
    cookie: String,
    fallback: ReleaseId,
}

impl CookieResolver {
    pub fn new(fallback: ReleaseId) -> Self {
        Self {
            cookie: RELEASE_COOKIE.to_string(),
            fallback,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }
}

impl Default for CookieResolver {
    fn default() -> Self {
        Self::new(ReleaseId::default())
    }
}

#[async_trait]
impl ReleaseResolver for CookieResolver {
    async fn resolve(&self, request: &CfRequest) -> Result<Resolution, ReleaseError> {
        let resolution = match cookie_release(request, &self.cookie) {
            Some(release) => Resolution::new(release, ReleaseSource::Cookie),
            None => Resolution::new(self.fallback.clone(), ReleaseSource::Fallback),
        };
        Ok(resolution)
    }
}

/// Resolves from the release cookie, otherwise from a cached copy of a
/// remotely stored default release.
///
/// A cookie match never touches the cache. When the cached value is missing or
/// older than the cache TTL, the parameter is fetched once per call; a failed
/// fetch fails the resolution unless stale serving is switched on.
pub struct CachedResolver {
    cookie: String,
    parameter: String,
    store: Arc<dyn ParameterStore>,
    cache: ReleaseCache,
    serve_stale_on_error: bool,
}

impl CachedResolver {
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self {
            cookie: RELEASE_COOKIE.to_string(),
            parameter: DEFAULT_PARAMETER_NAME.to_string(),
            store,
            cache: ReleaseCache::new(DEFAULT_TTL, Arc::new(SystemClock)),
            serve_stale_on_error: false,
        }
    }

    #[must_use]
    pub fn with_cookie_name(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = cookie.into();
        self
    }

    #[must_use]
    pub fn with_parameter_name(mut self, parameter: impl Into<String>) -> Self {
        self.parameter = parameter.into();
        self
    }

    /// Replace the cache, e.g. to change its TTL or clock.
    #[must_use]
    pub fn with_cache(mut self, cache: ReleaseCache) -> Self {
        self.cache = cache;
        self
    }

    /// Serve an expired cached release when the parameter store fails.
    #[must_use]
    pub fn serve_stale_on_error(mut self, enabled: bool) -> Self {
        self.serve_stale_on_error = enabled;
        self
    }

    pub fn cache(&self) -> &ReleaseCache {
        &self.cache
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter
    }

    async fn refresh(&self) -> Result<ReleaseId, ReleaseError> {
        let requested_at = self.cache.now();
        let value = self.store.get_parameter(&self.parameter).await?;
        let release = ReleaseId::parse(value.trim())?;
        self.cache.store(release.clone(), requested_at);
        log::debug!(
            "refreshed `{}` from parameter store: {}",
            self.parameter,
            release
        );
        Ok(release)
    }
}

impl fmt::Debug for CachedResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedResolver")
            .field("cookie", &self.cookie)
            .field("parameter", &self.parameter)
            .field("cache", &self.cache)
            .field("serve_stale_on_error", &self.serve_stale_on_error)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ReleaseResolver for CachedResolver {
    async fn resolve(&self, request: &CfRequest) -> Result<Resolution, ReleaseError> {
        if let Some(release) = cookie_release(request, &self.cookie) {
            return Ok(Resolution::new(release, ReleaseSource::Cookie));
        }

        if let Some(release) = self.cache.fresh() {
            log::debug!("release cache hit: {release}");
            return Ok(Resolution::new(release, ReleaseSource::Cache));
        }

        match self.refresh().await {
            Ok(release) => Ok(Resolution::new(release, ReleaseSource::Remote)),
            Err(err) => {
                if self.serve_stale_on_error && err.is_remote() {
                    if let Some(stale) = self.cache.any() {
                        let age = self.cache.age().unwrap_or_default();
                        log::warn!(
                            "serving stale release {stale} ({}ms old): {err}",
                            age.as_millis()
                        );
                        return Ok(Resolution::new(stale, ReleaseSource::Stale));
                    }
                }
                Err(err)
            }
        }
    }
}
