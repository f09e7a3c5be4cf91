use log::LevelFilter;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::cache::ReleaseCache;
use crate::clock::SystemClock;
use crate::cookie::RELEASE_COOKIE;
use crate::parameter::{ParameterStore, DEFAULT_PARAMETER_NAME};
use crate::release::ReleaseId;
use crate::resolver::{CachedResolver, CookieResolver, ReleaseResolver};
use crate::router::ReleaseRouter;

/// Conventional file name of the router manifest.
pub const CONFIG_FILE_NAME: &str = "release-router.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config failed validation: {0}")]
    Validation(String),
}

impl From<validator::ValidationErrors> for ConfigError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConfigError::Validation(err.to_string())
    }
}

pub struct ConfigLoader {
    config: Arc<RouterConfig>,
}

impl ConfigLoader {
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: RouterConfig = toml::from_str(&contents)?;
        config.validate()?;
        config.source = Some(path.to_path_buf());
        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct RouterConfig {
    #[serde(default)]
    #[validate(nested)]
    pub release: ReleaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub dev: DevConfig,
    #[serde(skip)]
    pub(crate) source: Option<PathBuf>,
}

impl RouterConfig {
    /// File the config was loaded from, if it came from disk.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Build the resolver selected by `[release] mode`.
    ///
    /// Parameter mode needs a store; cookie mode ignores it.
    pub fn build_resolver(
        &self,
        store: Option<Arc<dyn ParameterStore>>,
    ) -> Result<Arc<dyn ReleaseResolver>, ConfigError> {
        let release = &self.release;
        match release.mode {
            ResolverMode::Cookie => Ok(Arc::new(
                CookieResolver::new(release.fallback.clone()).with_cookie_name(&release.cookie),
            )),
            ResolverMode::Parameter => {
                let store = store.ok_or_else(|| {
                    ConfigError::Validation(
                        "release mode `parameter` requires a parameter store".to_string(),
                    )
                })?;
                let parameter = &release.parameter;
                let resolver = CachedResolver::new(store)
                    .with_cookie_name(&release.cookie)
                    .with_parameter_name(&parameter.name)
                    .with_cache(ReleaseCache::new(parameter.ttl(), Arc::new(SystemClock)))
                    .serve_stale_on_error(parameter.serve_stale_on_error);
                Ok(Arc::new(resolver))
            }
        }
    }

    pub fn build_router(
        &self,
        store: Option<Arc<dyn ParameterStore>>,
    ) -> Result<ReleaseRouter, ConfigError> {
        Ok(ReleaseRouter::from_shared(self.build_resolver(store)?))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub mode: ResolverMode,
    #[serde(default = "default_cookie")]
    #[validate(length(min = 1))]
    pub cookie: String,
    #[serde(default)]
    pub fallback: ReleaseId,
    #[serde(default)]
    #[validate(nested)]
    pub parameter: ParameterConfig,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            mode: ResolverMode::default(),
            cookie: default_cookie(),
            fallback: ReleaseId::default(),
            parameter: ParameterConfig::default(),
        }
    }
}

fn default_cookie() -> String {
    RELEASE_COOKIE.to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct ParameterConfig {
    #[serde(default = "default_parameter_name")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(rename = "ttl-ms", default = "default_ttl_ms")]
    #[validate(range(min = 1))]
    pub ttl_ms: u64,
    #[serde(rename = "serve-stale-on-error", default)]
    pub serve_stale_on_error: bool,
    /// Ask the store to decrypt `SecureString` parameters.
    #[serde(rename = "with-decryption", default)]
    pub with_decryption: bool,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub region: Option<String>,
}

impl ParameterConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            name: default_parameter_name(),
            ttl_ms: default_ttl_ms(),
            serve_stale_on_error: false,
            with_decryption: false,
            region: None,
        }
    }
}

fn default_parameter_name() -> String {
    DEFAULT_PARAMETER_NAME.to_string()
}

fn default_ttl_ms() -> u64 {
    300_000
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum ResolverMode {
    /// Cookie, else the fixed fallback release.
    Cookie,
    /// Cookie, else the cached remote default release.
    #[default]
    Parameter,
}

impl ResolverMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cookie => "cookie",
            Self::Parameter => "parameter",
        }
    }
}

impl<'de> Deserialize<'de> for ResolverMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "cookie" => Ok(Self::Cookie),
            "parameter" => Ok(Self::Parameter),
            other => Err(serde::de::Error::custom(format!(
                "release mode must be cookie or parameter (got `{}`)",
                other
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(rename = "echo-stdout", default)]
    pub echo_stdout: Option<bool>,
}

impl LoggingConfig {
    /// Effective filter: the configured level, or `Off` when stdout echo is disabled.
    pub fn level_filter(&self) -> LevelFilter {
        if self.echo_stdout.unwrap_or(true) {
            self.level.into()
        } else {
            LevelFilter::Off
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DevConfig {
    #[serde(default = "default_dev_addr")]
    pub addr: SocketAddr,
    /// Parameters served by the in-memory store during local development.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            addr: default_dev_addr(),
            parameters: BTreeMap::new(),
        }
    }
}

fn default_dev_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8787))
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            other => Err(serde::de::Error::custom(format!(
                "logging level must be trace, debug, info, warn, error, or off (got `{}`)",
                other
            ))),
        }
    }
}
