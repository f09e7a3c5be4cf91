use crate::error::ReleaseError;
use crate::event::CfRequest;
use crate::release::ReleaseId;

/// Build `/<release><path>`. The path must be slash-prefixed; it is used verbatim.
pub fn release_path(release: &ReleaseId, path: &str) -> Result<String, ReleaseError> {
    if !path.starts_with('/') {
        return Err(ReleaseError::invalid_event(format!(
            "request path must start with `/` (got `{}`)",
            path.escape_debug()
        )));
    }
    Ok(format!("/{release}{path}"))
}

/// Point the request's origin at the release prefix and return the new origin path.
pub fn rewrite_origin_path(
    request: &mut CfRequest,
    release: &ReleaseId,
) -> Result<String, ReleaseError> {
    let path = release_path(release, &request.uri)?;
    request.set_origin_path(path.clone())?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(value: &str) -> ReleaseId {
        ReleaseId::parse(value).expect("release")
    }

    #[test]
    fn prefixes_path_with_release() {
        let path = release_path(&release("2.3.1"), "/assets/app.js").expect("path");
        assert_eq!(path, "/2.3.1/assets/app.js");
    }

    #[test]
    fn root_path() {
        assert_eq!(release_path(&release("1.0.2"), "/").expect("path"), "/1.0.2/");
    }

    #[test]
    fn keeps_double_slashes_and_escapes() {
        let path = release_path(&release("1.0.2"), "//a%20b/c").expect("path");
        assert_eq!(path, "/1.0.2//a%20b/c");
    }

    #[test]
    fn rejects_relative_path() {
        let err = release_path(&release("1.0.2"), "index.html").expect_err("expected error");
        assert!(matches!(err, ReleaseError::InvalidEvent { .. }));
    }

    #[test]
    fn rewrites_request_origin() {
        let mut request = CfRequest::new("GET", "/assets/app.js").with_s3_origin("bucket");
        let path = rewrite_origin_path(&mut request, &release("2.3.1")).expect("rewrite");
        assert_eq!(path, "/2.3.1/assets/app.js");
        assert_eq!(request.origin_path(), Some("/2.3.1/assets/app.js"));
        assert_eq!(request.uri, "/assets/app.js");
    }

    #[test]
    fn rewrite_replaces_existing_origin_path() {
        let mut request = CfRequest::new("GET", "/index.html").with_s3_origin("bucket");
        request.set_origin_path("/old".into()).expect("path");
        rewrite_origin_path(&mut request, &release("3.0.0")).expect("rewrite");
        assert_eq!(request.origin_path(), Some("/3.0.0/index.html"));
    }

    #[test]
    fn rewrite_without_origin_fails() {
        let mut request = CfRequest::new("GET", "/index.html");
        assert!(rewrite_origin_path(&mut request, &release("1.0.0")).is_err());
    }
}
