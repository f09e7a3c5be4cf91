//! Release router CLI.

mod args;
mod commands;

use args::{Args, Command};
use clap::Parser;

fn main() {
    let args = Args::parse();
    let config = args.config.as_deref();
    let (name, result) = match args.cmd {
        Command::Resolve(resolve) => (
            "resolve",
            commands::resolve(config, &resolve.event, resolve.verbose),
        ),
        Command::Serve { addr } => ("serve", commands::serve(config, addr)),
        Command::Check => ("check", commands::check(config)),
    };

    if let Err(err) = result {
        eprintln!("[release-router] {name} error: {err:#}");
        std::process::exit(1);
    }
}
