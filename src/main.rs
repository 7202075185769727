//! PAMS chat widget server
//!
//! Entry point: `serve` (default) runs the widget web app, `ask` sends one
//! message from the command line.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use mimalloc::MiMalloc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use pams_chat::cli;
use pams_chat::config::{AppConfig, Cli, Command};
use pams_chat::server;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env (if present) before clap reads env fallbacks
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED); stderr keeps `ask` output clean
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli_args = Cli::parse();
    let config = match AppConfig::load_from_cli(&cli_args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    match cli_args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            server::start_server(Arc::new(config)).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Ask(args) => {
            let backend = config.backend.build_backend()?;
            tracing::info!(
                name: "backend.config.loaded",
                endpoint = %backend.endpoint(),
                "Chat service configuration loaded"
            );

            let (report, answered) = cli::ask(&config, &args, &backend).await;
            if report.is_empty() {
                eprintln!("Nothing to send: the message is empty.");
            } else {
                println!("{report}");
            }
            Ok(if answered {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
