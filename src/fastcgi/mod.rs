//! FastCGI transport adapter.
//!
//! A FastCGI/1 responder: the web server in front speaks FastCGI, the
//! gateway runs the CGI program for every request it receives.
//!
//! # Data Flow
//! ```text
//! TcpStream
//!     → fastcgi crate (framing, one thread per connection)
//!     → server.rs (bridge onto the runtime, abort checks)
//!     → params.rs (PARAMS → CgiRequest)
//!     → cgi::CgiHandler
//!     → FCGI_STDOUT, then END_REQUEST from the crate
//! ```
//!
//! Only the responder role is implemented.

pub mod params;
pub mod server;

pub use server::{Exchange, FastCgiServer};
