//! Configuration schema definitions.
//!
//! `FileConfig` mirrors the optional TOML file; `GatewayConfig` is the
//! resolved, immutable configuration shared by every request.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cgi::{CgiHandler, EnvSnapshot, EnvironmentBuilder, PassthroughHeaders};

pub const DEFAULT_LISTEN_ADDRESS: &str = ":3333";
pub const DEFAULT_ROOT: &str = "/";

/// Variables every child inherits when present.
pub const DEFAULT_INHERIT: [&str; 2] = ["PATH", "PLAN9"];

/// Request headers forwarded into the child environment.
pub const DEFAULT_PASSTHROUGH_HEADERS: [&str; 2] = ["AUTH_TYPE", "REMOTE_USER"];

/// Which server runs in front of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Http,
    FastCgi,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMode::Http => f.write_str("http"),
            TransportMode::FastCgi => f.write_str("fastcgi"),
        }
    }
}

/// Contents of the optional TOML configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// CGI program path.
    pub program: Option<String>,

    /// Arguments passed to the program.
    pub args: Vec<String>,

    /// Working directory of the program.
    pub working_dir: Option<PathBuf>,

    /// URL prefix the program is mounted at.
    pub root: Option<String>,

    /// Listen address (e.g. ":3333" or "127.0.0.1:9000").
    pub listen_address: Option<String>,

    /// Serve FastCGI instead of HTTP.
    pub fastcgi: bool,

    /// Forward passthrough headers in FastCGI mode too.
    pub fastcgi_passthrough: bool,

    /// Extra variables to inherit, appended to the defaults.
    pub inherit_env: Vec<String>,

    /// Replaces the default passthrough header names.
    pub passthrough_headers: Option<Vec<String>>,

    /// Prometheus exporter address.
    pub metrics_address: Option<SocketAddr>,

    /// Raise the default log level.
    pub debug: bool,
}

/// Resolved gateway configuration. Immutable after startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Program path, already normalized (see `normalize_program`).
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub root: String,
    pub inherit_env: Vec<String>,
    pub passthrough_headers: Vec<String>,
    pub listen_address: String,
    pub mode: TransportMode,
    pub fastcgi_passthrough: bool,
    pub debug: bool,
    pub metrics_address: Option<SocketAddr>,
    /// Parent environment with `PATH` already augmented.
    pub env: Arc<EnvSnapshot>,
}

impl GatewayConfig {
    /// Per-request environment builder over this configuration.
    pub fn environment_builder(&self) -> EnvironmentBuilder {
        EnvironmentBuilder::new(
            self.inherit_env.clone(),
            PassthroughHeaders::new(self.passthrough_headers.iter().cloned()),
            (*self.env).clone(),
        )
    }

    /// CGI executor shared by both transports.
    pub fn cgi_handler(&self) -> CgiHandler {
        CgiHandler::new(self.program.clone(), self.root.clone(), Arc::clone(&self.env))
            .with_args(self.args.clone())
            .with_dir(self.working_dir.clone())
    }
}

/// Prefix relative program paths with `./`.
///
/// Some shells resolve a bare `prog` through `PATH` rather than the
/// working directory.
pub fn normalize_program(program: &str) -> String {
    if program.starts_with('/') {
        program.to_string()
    } else {
        format!("./{}", program)
    }
}

/// Built-in inherit-list followed by the given extra names.
///
/// Names are trimmed; empty ones are dropped.
pub fn inherit_list<'a, I>(extra: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    DEFAULT_INHERIT
        .iter()
        .copied()
        .chain(extra.into_iter().map(str::trim))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
