use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body as AxumBody;
use axum::http::{Request, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use serde_json::json;
use tower::Service;

use release_router_core::error::ReleaseError;
use release_router_core::router::ReleaseRouter;

use crate::request::into_cf_request;

/// Tower service that runs every incoming request through the release router
/// and answers with the rewritten request record as JSON.
#[derive(Clone)]
pub struct ReleaseRouterAxumService {
    router: ReleaseRouter,
}

impl ReleaseRouterAxumService {
    pub fn new(router: ReleaseRouter) -> Self {
        Self { router }
    }
}

impl Service<Request<AxumBody>> for ReleaseRouterAxumService {
    type Response = Response<AxumBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<AxumBody>) -> Self::Future {
        let router = self.router.clone();
        let cf_request = into_cf_request(&request);
        Box::pin(async move {
            let response = match router.handle_request(cf_request).await {
                Ok(rewritten) => match serde_json::to_vec(&rewritten) {
                    Ok(body) => json_response(StatusCode::OK, body),
                    Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
                },
                Err(err) => error_response(error_status(&err), &err.to_string()),
            };
            Ok(response)
        })
    }
}

fn error_status(err: &ReleaseError) -> StatusCode {
    match err {
        ReleaseError::InvalidEvent { .. } => StatusCode::BAD_REQUEST,
        ReleaseError::InvalidRelease { .. } | ReleaseError::Parameter { .. } => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<AxumBody> {
    let payload = json!({
        "error": {
            "status": status.as_u16(),
            "message": message,
        }
    });
    json_response(status, payload.to_string().into_bytes())
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<AxumBody> {
    let mut response = Response::new(AxumBody::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameter::MemoryParameterStore;
    use release_router_core::event::CfRequest;
    use release_router_core::resolver::{CachedResolver, CookieResolver};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn call(router: ReleaseRouter, request: Request<AxumBody>) -> Response<AxumBody> {
        let mut service = ReleaseRouterAxumService::new(router);
        service.ready().await.unwrap().call(request).await.unwrap()
    }

    async fn body_json(response: Response<AxumBody>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn returns_rewritten_request() {
        let router = ReleaseRouter::new(CookieResolver::default());
        let request = Request::builder()
            .uri("/assets/app.js")
            .header("cookie", "release=2.3.1")
            .body(AxumBody::empty())
            .unwrap();

        let response = call(router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let rewritten: CfRequest =
            serde_json::from_value(body_json(response).await).expect("request record");
        assert_eq!(rewritten.origin_path(), Some("/2.3.1/assets/app.js"));
        assert_eq!(rewritten.uri, "/assets/app.js");
    }

    #[tokio::test]
    async fn serves_remote_default_without_cookie() {
        let store = Arc::new(MemoryParameterStore::from_pairs([("targetRelease", "4.0.0")]));
        let router = ReleaseRouter::new(CachedResolver::new(store));
        let request = Request::builder()
            .uri("/index.html")
            .body(AxumBody::empty())
            .unwrap();

        let response = call(router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        let payload = body_json(response).await;
        assert_eq!(payload["origin"]["s3"]["path"], "/4.0.0/index.html");
    }

    #[tokio::test]
    async fn missing_parameter_returns_bad_gateway() {
        let store = Arc::new(MemoryParameterStore::new());
        let router = ReleaseRouter::new(CachedResolver::new(store));
        let request = Request::builder()
            .uri("/index.html")
            .body(AxumBody::empty())
            .unwrap();

        let response = call(router, request).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let payload = body_json(response).await;
        assert_eq!(payload["error"]["status"], 502);
        assert!(payload["error"]["message"]
            .as_str()
            .unwrap()
            .contains("targetRelease"));
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            error_status(&ReleaseError::invalid_event("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&ReleaseError::invalid_release("..", "bad")),
            StatusCode::BAD_GATEWAY
        );
    }
}
