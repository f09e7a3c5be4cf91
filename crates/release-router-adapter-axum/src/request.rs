use std::net::SocketAddr;

use axum::body::Body as AxumBody;
use axum::extract::connect_info::ConnectInfo;
use axum::http::Request;
use release_router_core::event::CfRequest;

/// Origin domain recorded on requests synthesized by the dev server.
pub const LOCAL_ORIGIN_DOMAIN: &str = "local-origin.s3.amazonaws.com";

/// Convert an Axum/Hyper request into the edge platform's request record.
///
/// Header names are already lowercase in `http`; values that are not valid
/// UTF-8 are skipped. The body is dropped: origin-request rewriting never
/// reads it.
pub fn into_cf_request(request: &Request<AxumBody>) -> CfRequest {
    let uri = request.uri();
    let mut cf_request = CfRequest::new(request.method().as_str(), uri.path())
        .with_s3_origin(LOCAL_ORIGIN_DOMAIN);
    cf_request.querystring = uri.query().unwrap_or("").to_string();

    for (name, value) in request.headers() {
        match value.to_str() {
            Ok(value) => cf_request.append_header(name.as_str(), value),
            Err(_) => log::debug!("skipping non-UTF-8 header {}", name),
        }
    }

    cf_request.client_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    cf_request
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method};

    #[test]
    fn converts_request_line_and_headers() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/assets/app.js?v=3")
            .header("Cookie", "release=2.3.1")
            .header("x-test", "1")
            .body(AxumBody::empty())
            .expect("request");

        let cf_request = into_cf_request(&request);
        assert_eq!(cf_request.method, "POST");
        assert_eq!(cf_request.uri, "/assets/app.js");
        assert_eq!(cf_request.querystring, "v=3");
        assert_eq!(cf_request.header("cookie"), Some("release=2.3.1"));
        assert_eq!(cf_request.header("x-test"), Some("1"));
        assert_eq!(cf_request.origin_path(), Some(""));
    }

    #[test]
    fn repeated_headers_keep_order() {
        let request = Request::builder()
            .uri("/")
            .header("cookie", "a=1")
            .header("cookie", "release=1.0.0")
            .body(AxumBody::empty())
            .expect("request");

        let cf_request = into_cf_request(&request);
        let values: Vec<&str> = cf_request
            .header_values("cookie")
            .iter()
            .map(|header| header.value.as_str())
            .collect();
        assert_eq!(values, vec!["a=1", "release=1.0.0"]);
    }

    #[test]
    fn records_client_ip_from_connect_info() {
        let mut request = Request::builder()
            .uri("/")
            .body(AxumBody::empty())
            .expect("request");
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("127.0.0.1:4000".parse().unwrap()));

        let cf_request = into_cf_request(&request);
        assert_eq!(cf_request.client_ip.as_deref(), Some("127.0.0.1"));
    }

    #[test]
    fn missing_connect_info_is_handled_gracefully() {
        let request = Request::builder()
            .uri("/")
            .body(AxumBody::empty())
            .expect("request");
        assert!(into_cf_request(&request).client_ip.is_none());
    }

    #[test]
    fn skips_non_utf8_header_values() {
        let mut request = Request::builder()
            .uri("/")
            .body(AxumBody::empty())
            .expect("request");
        request.headers_mut().insert(
            "x-binary",
            HeaderValue::from_bytes(&[0xfa, 0xfb]).expect("header value"),
        );
        let cf_request = into_cf_request(&request);
        assert!(cf_request.header("x-binary").is_none());
    }
}
