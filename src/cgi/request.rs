//! Transport-neutral view of an inbound request.

use std::io;
use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, Uri, Version};
use futures_util::stream::{self, BoxStream, StreamExt};

/// Request body as a stream of chunks.
pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// A request ready to be handed to the CGI executor.
///
/// Both transports produce one of these: the HTTP adapter from the axum
/// request, the FastCGI responder from the `PARAMS` stream.
pub struct CgiRequest {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    /// Request reached the front-end over TLS.
    pub https: bool,
    pub body: BodyStream,
}

impl CgiRequest {
    /// Wrap an HTTP request received by the gateway itself.
    pub fn from_http(request: Request<Body>, remote_addr: SocketAddr) -> Self {
        let (parts, body) = request.into_parts();
        let body = body
            .into_data_stream()
            .map(|chunk| chunk.map_err(io::Error::other))
            .boxed();

        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            remote_addr: Some(remote_addr),
            https: false,
            body,
        }
    }

    /// A request without a body.
    pub fn empty_body() -> BodyStream {
        stream::empty().boxed()
    }

    /// The `Host` header, falling back to the URI authority (HTTP/2).
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .or_else(|| self.uri.authority().map(|a| a.as_str()))
    }

    /// Declared body length, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    }

    /// Body uses chunked transfer coding.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get_all(header::TRANSFER_ENCODING)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.to_ascii_lowercase().contains("chunked"))
    }
}

impl std::fmt::Debug for CgiRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CgiRequest")
            .field("method", &self.method)
            .field("uri", &self.uri)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("remote_addr", &self.remote_addr)
            .field("https", &self.https)
            .finish_non_exhaustive()
    }
}
