use std::fmt::Write as _;
use std::io::Read;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use futures::executor::block_on;

use release_router_adapter_axum::{dev_router, init_logging, run_dev};
use release_router_core::config::{ConfigLoader, ResolverMode, RouterConfig, CONFIG_FILE_NAME};
use release_router_core::event::{CfRequest, CloudFrontEvent};

pub const CONFIG_ENV: &str = "RELEASE_ROUTER_CONFIG";

/// Pick the config file: explicit flag, then `$RELEASE_ROUTER_CONFIG`, then
/// `release-router.toml` in the working directory if it exists.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    local.exists().then_some(local)
}

/// Load the config, or the built-in defaults when no file is found.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<ConfigLoader> {
    match config_path(explicit) {
        Some(path) => ConfigLoader::from_path(&path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => {
            log::debug!("no {CONFIG_FILE_NAME} found, using defaults");
            ConfigLoader::load_from_str("").context("default config")
        }
    }
}

pub fn resolve(config: Option<&Path>, event: &str, verbose: bool) -> anyhow::Result<()> {
    let loader = load_config(config)?;
    if verbose {
        init_logging(&loader.config().logging);
    }
    let raw = read_event(event)?;
    let request = resolve_event(loader.config(), &raw)?;
    println!("{}", serde_json::to_string_pretty(&request)?);
    Ok(())
}

/// Run a raw event through the dev router described by `config`.
pub fn resolve_event(config: &RouterConfig, raw: &str) -> anyhow::Result<CfRequest> {
    let event = CloudFrontEvent::from_json(raw)?;
    let router = dev_router(config)?;
    let request = block_on(router.handle_event(event))?;
    Ok(request)
}

fn read_event(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut raw = String::new();
        std::io::stdin()
            .read_to_string(&mut raw)
            .context("failed to read event from stdin")?;
        return Ok(raw);
    }
    std::fs::read_to_string(source).with_context(|| format!("failed to read event file {source}"))
}

pub fn serve(config: Option<&Path>, addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let loader = load_config(config)?;
    run_dev(loader.config(), addr)
}

pub fn check(config: Option<&Path>) -> anyhow::Result<()> {
    let loader = load_config(config)?;
    print!("{}", describe(loader.config()));
    Ok(())
}

/// Human-readable summary of the effective settings.
pub fn describe(config: &RouterConfig) -> String {
    let mut out = String::new();
    let source = config
        .source()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<defaults>".to_string());
    let release = &config.release;

    let _ = writeln!(out, "config:   {source}");
    let _ = writeln!(out, "mode:     {}", release.mode.as_str());
    let _ = writeln!(out, "cookie:   {}", release.cookie);
    match release.mode {
        ResolverMode::Cookie => {
            let _ = writeln!(out, "fallback: {}", release.fallback);
        }
        ResolverMode::Parameter => {
            let parameter = &release.parameter;
            let _ = writeln!(out, "parameter: {}", parameter.name);
            let _ = writeln!(out, "ttl:      {}ms", parameter.ttl().as_millis());
            let _ = writeln!(out, "stale:    {}", parameter.serve_stale_on_error);
            let _ = writeln!(out, "decrypt:  {}", parameter.with_decryption);
            if let Some(region) = &parameter.region {
                let _ = writeln!(out, "region:   {region}");
            }
        }
    }
    let _ = writeln!(out, "log:      {}", config.logging.level_filter());
    out
}
