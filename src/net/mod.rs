//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listen address (-a)
//!     → listener.rs (normalize, bind)
//!     → HTTP server or FastCGI responder accept loop
//! ```
//!
//! # Design Decisions
//! - Bind failure is fatal at startup
//! - Concurrency comes from one task per connection, no accept limits

pub mod listener;
