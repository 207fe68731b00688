//! Command-line flags.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{CommandFactory, Parser};

/// Serve a single CGI program over HTTP or as a FastCGI responder.
#[derive(Debug, Clone, Default, Parser)]
#[command(
    name = "cgd",
    version,
    override_usage = "cgd -c prog [-w wdir] [-a addr] [-e FOO,BAR] [-- args...]"
)]
pub struct Cli {
    /// CGI program to run
    #[arg(short = 'c', value_name = "PROG")]
    pub program: Option<String>,

    /// Working dir for CGI
    #[arg(short = 'w', value_name = "WDIR")]
    pub working_dir: Option<PathBuf>,

    /// Run as a FastCGI 'server' instead of HTTP
    #[arg(short = 'f')]
    pub fastcgi: bool,

    /// Print debug msgs to stderr
    #[arg(long)]
    pub debug: bool,

    /// Listen address [default: :3333]
    #[arg(short = 'a', value_name = "ADDR")]
    pub address: Option<String>,

    /// Comma-separated list of environment variables to preserve
    #[arg(short = 'e', value_name = "FOO,BAR")]
    pub env_vars: Option<String>,

    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// URL prefix the program is mounted at [default: /]
    #[arg(long, value_name = "PREFIX")]
    pub root: Option<String>,

    /// Forward passthrough headers in FastCGI mode too
    #[arg(long)]
    pub fcgi_passthrough: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long, value_name = "ADDR")]
    pub metrics_address: Option<SocketAddr>,

    /// Arguments passed to the program
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
}

impl Cli {
    /// Usage text printed when no program is configured.
    pub fn usage() -> String {
        Cli::command().render_help().to_string()
    }
}
