//! `cgd`: serve a single CGI program over HTTP or FastCGI.

use std::process::ExitCode;

use clap::Parser;

use cgd::config::{load_config, Cli, ConfigError};
use cgd::lifecycle::{signals, startup, Shutdown};
use cgd::observability::{logging, metrics};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli) {
        Ok(config) => config,
        Err(ConfigError::MissingProgram) => {
            eprint!("{}", Cli::usage());
            return ExitCode::from(2);
        }
        Err(e) => {
            eprintln!("cgd: {}", e);
            return ExitCode::from(1);
        }
    };

    logging::init_logging(config.debug);
    tracing::info!("cgd v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = config.metrics_address {
        metrics::init_metrics(addr);
    }

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    match startup::run(config, shutdown).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::from(1)
        }
    }
}
