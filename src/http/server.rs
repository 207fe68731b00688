//! HTTP transport adapter.
//!
//! # Responsibilities
//! - Create the Axum router forwarding every path and method to the program
//! - Wire up middleware (request id, tracing)
//! - Build the per-request environment, including passthrough headers
//! - Translate the CGI response (or failure) into an HTTP response

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::cgi::{CgiHandler, CgiRequest, EnvironmentBuilder};
use crate::config::GatewayConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<CgiHandler>,
    pub environment: Arc<EnvironmentBuilder>,
}

/// HTTP server in front of the CGI program.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: &GatewayConfig) -> Self {
        let state = AppState {
            handler: Arc::new(config.cgi_handler()),
            environment: Arc::new(config.environment_builder()),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(cgi_handler))
            .route("/", any(cgi_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Starting HTTP server");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Run the program for one HTTP request.
async fn cgi_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        peer = %addr,
        "Running CGI program"
    );

    let env = state.environment.build(request.headers());
    let request = CgiRequest::from_http(request, addr);

    let response = match state.handler.serve(request, env).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "CGI request failed");
            e.into_response()
        }
    };

    metrics::record_request("http", response.status().as_u16(), start);
    response
}
