use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "release-router", about = "Release router CLI")]
pub struct Args {
    /// Path to `release-router.toml` (falls back to $RELEASE_ROUTER_CONFIG, then ./release-router.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one origin-request event through the router and print the rewritten record
    Resolve(ResolveArgs),
    /// Serve the router over HTTP for local testing
    Serve {
        /// Override `[dev] addr`
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
    /// Validate the config and print the effective settings
    Check,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Event JSON file, or `-` for stdin
    #[arg(default_value = "-")]
    pub event: String,
    /// Emit router logs alongside the result
    #[arg(long, short)]
    pub verbose: bool,
}
