//! Rebuild a request from FastCGI `PARAMS`.

use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use thiserror::Error;

use crate::cgi::{BodyStream, CgiRequest};

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("missing REQUEST_METHOD")]
    MissingMethod,

    #[error("invalid REQUEST_METHOD {0:?}")]
    InvalidMethod(String),

    #[error("invalid request URI {0:?}")]
    InvalidUri(String),
}

/// Turn the CGI variables sent by the web server into a `CgiRequest`.
pub fn request_from_params(
    params: &[(String, String)],
    body: BodyStream,
) -> Result<CgiRequest, ParamsError> {
    let get = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    let method = get("REQUEST_METHOD").ok_or(ParamsError::MissingMethod)?;
    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| ParamsError::InvalidMethod(method.to_string()))?;

    let uri = match get("REQUEST_URI").filter(|u| !u.is_empty()) {
        Some(uri) => uri.to_string(),
        None => {
            let mut uri = format!(
                "{}{}",
                get("SCRIPT_NAME").unwrap_or_default(),
                get("PATH_INFO").unwrap_or_default()
            );
            if uri.is_empty() {
                uri.push('/');
            }
            if let Some(query) = get("QUERY_STRING").filter(|q| !q.is_empty()) {
                uri.push('?');
                uri.push_str(query);
            }
            uri
        }
    };
    let uri = Uri::try_from(uri.as_str()).map_err(|_| ParamsError::InvalidUri(uri.clone()))?;

    let version = match get("SERVER_PROTOCOL").unwrap_or_default() {
        "HTTP/1.0" => Version::HTTP_10,
        "HTTP/2" | "HTTP/2.0" => Version::HTTP_2,
        _ => Version::HTTP_11,
    };

    let mut headers = HeaderMap::new();
    for (name, value) in params {
        let Some(suffix) = name.strip_prefix("HTTP_") else {
            continue;
        };
        let name = suffix.to_ascii_lowercase().replace('_', "-");
        match (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::debug!(param = %suffix, "Skipping unrepresentable header param"),
        }
    }
    for (param, name) in [
        ("CONTENT_TYPE", header::CONTENT_TYPE),
        ("CONTENT_LENGTH", header::CONTENT_LENGTH),
    ] {
        if let Some(Ok(value)) = get(param).filter(|v| !v.is_empty()).map(HeaderValue::from_str) {
            headers.insert(name, value);
        }
    }

    let remote_addr = get("REMOTE_ADDR")
        .and_then(|ip| ip.parse::<IpAddr>().ok())
        .map(|ip| {
            let port = get("REMOTE_PORT").and_then(|p| p.parse().ok()).unwrap_or(0);
            SocketAddr::new(ip, port)
        });

    let https = get("HTTPS").is_some_and(|v| v.eq_ignore_ascii_case("on") || v == "1");

    Ok(CgiRequest {
        method,
        uri,
        version,
        headers,
        remote_addr,
        https,
        body,
    })
}
