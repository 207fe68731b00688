//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP adapter, FastCGI responder, CGI handler
//!     → logging.rs (structured tracing events to stderr)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stderr / log collector
//!     → Prometheus scrape (only with --metrics-address)
//! ```

pub mod logging;
pub mod metrics;
