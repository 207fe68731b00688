//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! command line (clap)          optional TOML file
//!     → cli.rs                     → loader.rs (read & deserialize)
//!                 \               /
//!                  loader::resolve (flags > file > defaults,
//!                                   PATH augmentation, program normalization)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (immutable, shared via Arc)
//! ```
//!
//! # Design Decisions
//! - Config is built once at startup and never changes
//! - Every file key is optional
//! - A missing program is reported separately so `main` can print usage

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, ConfigError};
pub use schema::{FileConfig, GatewayConfig, TransportMode};
