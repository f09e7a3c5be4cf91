use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ReleaseError;

/// Maximum length of a release identifier in bytes.
pub const MAX_RELEASE_LEN: usize = 128;

/// Release served when nothing else selects one.
pub const DEFAULT_FALLBACK: &str = "1.0.2";

static RELEASE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").expect("release pattern should compile")
});

/// A release identifier that is safe to use as a single origin path segment.
///
/// Identifiers start with an ASCII letter or digit and otherwise contain only
/// letters, digits, `.`, `_` and `-`. Slashes, percent escapes, whitespace and
/// control characters are rejected, so the value can never escape its segment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReleaseId(String);

impl ReleaseId {
    pub fn parse(value: &str) -> Result<Self, ReleaseError> {
        if value.is_empty() {
            return Err(ReleaseError::invalid_release(value, "release is empty"));
        }
        if value.len() > MAX_RELEASE_LEN {
            return Err(ReleaseError::invalid_release(
                truncate(value).escape_debug().to_string(),
                format!("release exceeds {MAX_RELEASE_LEN} bytes"),
            ));
        }
        if !RELEASE_PATTERN.is_match(value) {
            return Err(ReleaseError::invalid_release(
                value.escape_debug().to_string(),
                "release may only contain letters, digits, `.`, `_` and `-`",
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn truncate(value: &str) -> String {
    value.chars().take(32).collect::<String>() + "…"
}

impl Default for ReleaseId {
    fn default() -> Self {
        Self(DEFAULT_FALLBACK.to_string())
    }
}

impl fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReleaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for ReleaseId {
    type Err = ReleaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl<'de> Deserialize<'de> for ReleaseId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(value.trim()).map_err(serde::de::Error::custom)
    }
}
