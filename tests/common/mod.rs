//! Shared utilities for integration tests.

#![allow(dead_code)]

pub mod fcgi_client;

use std::net::SocketAddr;

use cgd::cgi::EnvSnapshot;
use cgd::config::loader::resolve;
use cgd::config::{Cli, FileConfig, GatewayConfig};
use cgd::net::listener;
use cgd::{FastCgiServer, HttpServer, Shutdown};

/// Flags running `script` through `/bin/sh -c`.
pub fn sh_cli(script: &str) -> Cli {
    Cli {
        program: Some("/bin/sh".to_string()),
        address: Some("127.0.0.1:0".to_string()),
        args: vec!["-c".to_string(), script.to_string()],
        ..Cli::default()
    }
}

/// Resolve `cli` against a fixed parent environment.
pub fn config(cli: Cli, env: &[(&str, &str)]) -> GatewayConfig {
    resolve(cli, FileConfig::default(), EnvSnapshot::from_pairs(env.iter().copied()))
        .expect("valid test config")
}

/// Start the HTTP transport on an ephemeral port.
pub async fn start_http(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = listener::bind(&config.listen_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (addr, shutdown)
}

/// Start the FastCGI transport on an ephemeral port.
pub async fn start_fastcgi(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = listener::bind(&config.listen_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = FastCgiServer::new(&config);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (addr, shutdown)
}
