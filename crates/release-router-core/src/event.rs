//! Wire model of the edge platform's origin-request event.
//!
//! Only the fields the router reads or writes are typed; everything else is
//! captured in `extra` maps so that the record returned to the platform carries
//! the same data it was given.
//!
//! ```json
//! { "Records": [ { "cf": { "config": { ... }, "request": {
//!     "uri": "/assets/app.js",
//!     "headers": { "cookie": [ { "key": "Cookie", "value": "release=2.3.1" } ] },
//!     "origin": { "s3": { "domainName": "bucket.s3.amazonaws.com", "path": "" } }
//! } } } ] }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReleaseError;

/// Header map keyed by lowercase header name, each holding an ordered list of values.
pub type CfHeaders = BTreeMap<String, Vec<CfHeader>>;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CloudFrontEvent {
    #[serde(rename = "Records")]
    pub records: Vec<CloudFrontRecord>,
}

impl CloudFrontEvent {
    /// Wrap a single request record into an event.
    pub fn from_request(request: CfRequest) -> Self {
        Self {
            records: vec![CloudFrontRecord {
                cf: CloudFrontPayload {
                    config: None,
                    request,
                },
            }],
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ReleaseError> {
        serde_json::from_str(raw)
            .map_err(|err| ReleaseError::invalid_event(format!("malformed event: {err}")))
    }

    /// Take the single request record out of the event.
    ///
    /// Events carrying zero or several records are rejected.
    pub fn into_request(self) -> Result<CfRequest, ReleaseError> {
        let count = self.records.len();
        if count != 1 {
            return Err(ReleaseError::invalid_event(format!(
                "expected exactly one record, got {count}"
            )));
        }
        self.records
            .into_iter()
            .next()
            .map(|record| record.cf.request)
            .ok_or_else(|| ReleaseError::invalid_event("event has no records"))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CloudFrontRecord {
    pub cf: CloudFrontPayload,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CloudFrontPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
    pub request: CfRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CfHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CfRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    pub uri: String,
    #[serde(default)]
    pub querystring: String,
    #[serde(default)]
    pub headers: CfHeaders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<CfOrigin>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl CfRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            client_ip: None,
            method: method.into(),
            uri: uri.into(),
            querystring: String::new(),
            headers: CfHeaders::new(),
            origin: None,
            extra: Map::new(),
        }
    }

    /// Attach an empty S3 origin, as the platform does for bucket-backed distributions.
    #[must_use]
    pub fn with_s3_origin(mut self, domain_name: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("domainName".into(), Value::String(domain_name.into()));
        self.origin = Some(CfOrigin {
            s3: Some(CfOriginTarget {
                path: String::new(),
                extra,
            }),
            custom: None,
        });
        self
    }

    /// Append a header value, keeping the original spelling in `key`.
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(CfHeader {
                key: Some(name.to_string()),
                value: value.into(),
            });
    }

    /// All values recorded for a header, matched case-insensitively.
    pub fn header_values(&self, name: &str) -> &[CfHeader] {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
            .unwrap_or(&[])
    }

    /// First value of a header, if any.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name)
            .first()
            .map(|header| header.value.as_str())
    }

    pub fn origin_path(&self) -> Option<&str> {
        self.origin
            .as_ref()
            .and_then(CfOrigin::target)
            .map(|target| target.path.as_str())
    }

    /// Replace the origin path. The S3 origin wins when both kinds are present.
    pub fn set_origin_path(&mut self, path: String) -> Result<(), ReleaseError> {
        let target = self
            .origin
            .as_mut()
            .and_then(CfOrigin::target_mut)
            .ok_or_else(|| ReleaseError::invalid_event("request has no origin"))?;
        target.path = path;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CfOrigin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3: Option<CfOriginTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<CfOriginTarget>,
}

impl CfOrigin {
    fn target(&self) -> Option<&CfOriginTarget> {
        self.s3.as_ref().or(self.custom.as_ref())
    }

    fn target_mut(&mut self) -> Option<&mut CfOriginTarget> {
        match self {
            CfOrigin { s3: Some(target), .. } => Some(target),
            CfOrigin {
                custom: Some(target),
                ..
            } => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CfOriginTarget {
    #[serde(default)]
    pub path: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
