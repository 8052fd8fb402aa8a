// SPDX-FileCopyrightText: 2026 Hookline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hookline - webhook ingestion and reliable async processing pipeline.
//!
//! This is the binary entry point for the Hookline service.

use clap::{Parser, Subcommand};

mod serve;

/// Hookline - webhook ingestion and reliable async processing pipeline.
#[derive(Parser, Debug)]
#[command(name = "hookline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the ingestion gateway and retry workers.
    Serve,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match hookline_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            hookline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("hookline: use --help for available commands");
        }
    }
}
