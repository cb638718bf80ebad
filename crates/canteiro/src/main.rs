// SPDX-FileCopyrightText: 2026 Canteiro Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canteiro - WhatsApp bot for construction site teams.
//!
//! Binary entry point: loads configuration and dispatches the subcommand.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Canteiro - WhatsApp bot for construction site teams.
#[derive(Parser, Debug)]
#[command(name = "canteiro", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the bot: conversations, broadcasts and the management API.
    Serve,
    /// Show whether a running instance is healthy.
    Status {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration and print a summary.
    Check {
        /// Check this file instead of the usual lookup hierarchy.
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // `config check` reports its own diagnostics.
    if let Some(Commands::Config {
        action: ConfigCommand::Check { path },
    }) = &cli.command
    {
        let ok = check::run_check(path.as_deref());
        std::process::exit(if ok { 0 } else { 1 });
    }

    let config = match canteiro_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            canteiro_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::Config { .. }) => Ok(()),
        None => {
            println!("canteiro: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
