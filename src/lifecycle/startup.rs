//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the listener for the configured address
//! - Start the HTTP server or the FastCGI responder
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Exactly one transport is active per process

use thiserror::Error;

use crate::config::{GatewayConfig, TransportMode};
use crate::fastcgi::FastCgiServer;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::net::listener::{self, ListenerError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bind and serve until `shutdown` fires.
pub async fn run(config: GatewayConfig, shutdown: Shutdown) -> Result<(), ServerError> {
    let listener = listener::bind(&config.listen_address).await?;

    tracing::info!(
        program = %config.program,
        mode = %config.mode,
        inherit = ?config.inherit_env,
        "Configuration loaded"
    );

    match config.mode {
        TransportMode::Http => {
            HttpServer::new(&config)
                .run(listener, shutdown.subscribe())
                .await?
        }
        TransportMode::FastCgi => {
            FastCgiServer::new(&config)
                .run(listener, shutdown.subscribe())
                .await?
        }
    }

    Ok(())
}
