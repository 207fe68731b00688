//! CGI execution errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while running the CGI program for one request.
#[derive(Debug, Error)]
pub enum CgiError {
    /// The program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The request body uses chunked transfer coding.
    #[error("chunked request bodies are not supported by CGI")]
    ChunkedBody,

    /// Output ended before the header block was terminated.
    #[error("no headers")]
    NoHeaders,

    /// Neither a status, a location nor a content type was emitted.
    #[error("missing required Content-Type in headers")]
    MissingContentType,

    /// The `Status` header could not be parsed.
    #[error("bogus status: {0:?}")]
    BogusStatus(String),

    /// Reading the program's output failed.
    #[error("error reading program output: {0}")]
    Io(#[from] std::io::Error),
}

impl CgiError {
    /// HTTP status reported to the client for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CgiError::ChunkedBody => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CgiError {
    fn into_response(self) -> Response {
        match self {
            CgiError::ChunkedBody => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            other => other.status_code().into_response(),
        }
    }
}
