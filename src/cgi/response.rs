//! CGI response parsing.
//!
//! A CGI program writes a header block terminated by a blank line, then
//! the body. `Status` and `Location` are interpreted by the gateway; every
//! other header is forwarded to the client as-is.

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::error::CgiError;
use super::request::BodyStream;

/// Status and headers emitted by the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseHead {
    /// Serialize as a CGI header block (used by the FastCGI responder).
    pub fn to_cgi_bytes(&self) -> Vec<u8> {
        let mut out = format!(
            "Status: {} {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("")
        )
        .into_bytes();
        for (name, value) in &self.headers {
            out.extend_from_slice(name.as_str().as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"\r\n");
        out
    }
}

/// A parsed head plus the streamed remainder of the program's output.
pub struct CgiResponse {
    pub head: ResponseHead,
    pub body: BodyStream,
}

impl IntoResponse for CgiResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from_stream(self.body));
        *response.status_mut() = self.head.status;
        *response.headers_mut() = self.head.headers;
        response
    }
}

impl std::fmt::Debug for CgiResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CgiResponse")
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// Read the header block from the program's stdout.
///
/// Leaves `reader` positioned at the first body byte.
pub async fn read_head<R>(reader: &mut R) -> Result<ResponseHead, CgiError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = HeaderMap::new();
    let mut status = None;
    let mut header_lines = 0usize;
    let mut saw_blank_line = false;
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        let trimmed = trim_line_ending(&line);
        if trimmed.is_empty() {
            saw_blank_line = true;
            break;
        }
        header_lines += 1;

        let Some(colon) = trimmed.iter().position(|&b| b == b':') else {
            tracing::warn!(line = %String::from_utf8_lossy(trimmed), "Bogus CGI header line");
            continue;
        };
        let name = trimmed[..colon].trim_ascii();
        let value = trimmed[colon + 1..].trim_ascii();

        if name.eq_ignore_ascii_case(b"status") {
            status = Some(parse_status(value)?);
            continue;
        }

        match (HeaderName::from_bytes(name), HeaderValue::from_bytes(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => {
                tracing::warn!(line = %String::from_utf8_lossy(trimmed), "Invalid CGI header");
            }
        }
    }

    if header_lines == 0 || !saw_blank_line {
        return Err(CgiError::NoHeaders);
    }

    if status.is_none() && headers.contains_key(LOCATION) {
        status = Some(StatusCode::FOUND);
    }

    if status.is_none() && !headers.contains_key(CONTENT_TYPE) {
        return Err(CgiError::MissingContentType);
    }

    Ok(ResponseHead {
        status: status.unwrap_or(StatusCode::OK),
        headers,
    })
}

fn parse_status(value: &[u8]) -> Result<StatusCode, CgiError> {
    let bogus = || CgiError::BogusStatus(String::from_utf8_lossy(value).into_owned());
    if value.len() < 3 {
        return Err(bogus());
    }
    StatusCode::from_bytes(&value[..3]).map_err(|_| bogus())
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
