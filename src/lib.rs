//! CGI gateway library.
//!
//! Serves one CGI program either as an HTTP server or as a FastCGI
//! responder, handing each request a freshly built child environment.

pub mod cgi;
pub mod config;
pub mod fastcgi;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::GatewayConfig;
pub use fastcgi::FastCgiServer;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
