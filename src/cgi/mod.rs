//! CGI execution bridge.
//!
//! # Data Flow
//! ```text
//! Transport adapter (HTTP or FastCGI)
//!     → request.rs (transport-neutral CgiRequest)
//!     → env.rs (inherit-list + passthrough headers)
//!     → handler.rs (meta-variables from meta.rs, spawn program, feed stdin)
//!     → response.rs (parse header block, stream body)
//!     → Transport adapter writes the response
//! ```
//!
//! # Design Decisions
//! - One child process per request, nothing pooled or cached
//! - The environment snapshot is captured once and never mutated
//! - Both transports share one `CgiHandler`

pub mod env;
pub mod error;
pub mod handler;
pub mod meta;
pub mod request;
pub mod response;

pub use env::{EnvSnapshot, EnvironmentBuilder, PassthroughHeaders};
pub use error::CgiError;
pub use handler::CgiHandler;
pub use request::{BodyStream, CgiRequest};
pub use response::{CgiResponse, ResponseHead};
