//! Edge function entry point for the release router.
//!
//! The function receives origin-request events, rewrites the origin path and
//! hands the request record back to the platform. In parameter mode the default
//! release is read from AWS Systems Manager and cached per process.

mod ssm;

use std::sync::Arc;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use release_router_core::config::{ConfigLoader, LoggingConfig, ResolverMode, RouterConfig};
use release_router_core::event::{CfRequest, CloudFrontEvent};
use release_router_core::parameter::ParameterStore;
use release_router_core::router::ReleaseRouter;

pub use ssm::SsmParameterStore;

/// Install `simple_logger` at the configured level. The platform timestamps
/// every log line, so local timestamps are left out.
pub fn init_logging(logging: &LoggingConfig) {
    let level: LevelFilter = logging.level_filter();
    SimpleLogger::new()
        .with_level(level)
        .without_timestamps()
        .init()
        .ok();
}

/// Handle one invocation.
pub async fn handle(router: &ReleaseRouter, event: CloudFrontEvent) -> Result<CfRequest, Error> {
    let request = router.handle_event(event).await?;
    Ok(request)
}

/// Build the router for `config`, creating an SSM client only in parameter mode.
pub async fn build_router(config: &RouterConfig) -> Result<ReleaseRouter, Error> {
    let store: Option<Arc<dyn ParameterStore>> = match config.release.mode {
        ResolverMode::Cookie => None,
        ResolverMode::Parameter => Some(Arc::new(
            SsmParameterStore::from_env(&config.release.parameter).await,
        )),
    };
    Ok(config.build_router(store)?)
}

/// Load the manifest, set up logging and run the invocation loop.
pub async fn run(config_src: &str) -> Result<(), Error> {
    let loader = ConfigLoader::load_from_str(config_src)?;
    let config = loader.config();
    init_logging(&config.logging);

    let router = build_router(config).await?;
    log::info!(
        "release router ready (mode={})",
        config.release.mode.as_str()
    );

    lambda_runtime::run(service_fn(move |event: LambdaEvent<CloudFrontEvent>| {
        let router = router.clone();
        async move { handle(&router, event.payload).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMBEDDED: &str = include_str!("../release-router.toml");

    fn origin_request(cookie: Option<&str>) -> CloudFrontEvent {
        let mut payload = serde_json::json!({
            "Records": [{
                "cf": {
                    "config": { "eventType": "origin-request" },
                    "request": {
                        "clientIp": "203.0.113.178",
                        "method": "GET",
                        "uri": "/assets/app.js",
                        "querystring": "",
                        "headers": {},
                        "origin": {
                            "s3": {
                                "domainName": "releases.s3.amazonaws.com",
                                "path": "",
                                "region": "eu-central-1"
                            }
                        }
                    }
                }
            }]
        });
        if let Some(cookie) = cookie {
            payload["Records"][0]["cf"]["request"]["headers"]["cookie"] =
                serde_json::json!([{ "key": "Cookie", "value": cookie }]);
        }
        serde_json::from_value(payload).expect("event")
    }

    #[test]
    fn embedded_config_is_valid() {
        let loader = ConfigLoader::load_from_str(EMBEDDED).expect("embedded config");
        let config = loader.config();
        assert_eq!(config.release.mode, ResolverMode::Parameter);
        assert_eq!(config.release.parameter.name, "targetRelease");
        assert_eq!(
            config.release.parameter.region.as_deref(),
            Some("eu-central-1")
        );
    }

    #[tokio::test]
    async fn cookie_mode_builds_without_ssm() {
        let loader = ConfigLoader::load_from_str("[release]\nmode = \"cookie\"\n").expect("config");
        let router = build_router(loader.config()).await.expect("router");
        let request = handle(&router, origin_request(Some("release=2.3.1")))
            .await
            .expect("request");
        assert_eq!(request.origin_path(), Some("/2.3.1/assets/app.js"));
    }

    #[tokio::test]
    async fn handle_returns_record_with_untouched_fields() {
        let router = ReleaseRouter::new(release_router_core::CookieResolver::default());
        let request = handle(&router, origin_request(None)).await.expect("request");
        let json = serde_json::to_value(&request).expect("json");
        assert_eq!(json["origin"]["s3"]["path"], "/1.0.2/assets/app.js");
        assert_eq!(json["origin"]["s3"]["domainName"], "releases.s3.amazonaws.com");
        assert_eq!(json["clientIp"], "203.0.113.178");
    }

    #[tokio::test]
    async fn handle_surfaces_invalid_events() {
        let router = ReleaseRouter::new(release_router_core::CookieResolver::default());
        let event: CloudFrontEvent =
            serde_json::from_str(r#"{"Records": []}"#).expect("event");
        let err = handle(&router, event).await.expect_err("expected error");
        assert!(err.to_string().contains("exactly one record"));
    }
}
