//! CGI/1.1 meta-variables derived from the request.

use axum::http::header;

use super::request::CgiRequest;

pub const SERVER_SOFTWARE: &str = concat!("cgd/", env!("CARGO_PKG_VERSION"));

/// Used when the snapshot carries no `PATH`.
pub const DEFAULT_PATH: &str = "/bin:/usr/bin:/usr/ucb:/usr/bsd:/usr/local/bin";

/// Dynamic loader search path variable carried over on this platform.
#[cfg(target_os = "macos")]
pub const LIBRARY_PATH_VAR: Option<&str> = Some("DYLD_LIBRARY_PATH");
#[cfg(all(unix, not(target_os = "macos")))]
pub const LIBRARY_PATH_VAR: Option<&str> = Some("LD_LIBRARY_PATH");
#[cfg(not(unix))]
pub const LIBRARY_PATH_VAR: Option<&str> = None;

/// Build the request meta-variables.
///
/// `root` is the URL prefix the program is mounted at, `script_filename`
/// the program path as it will be executed.
pub fn meta_variables(req: &CgiRequest, root: &str, script_filename: &str) -> Vec<String> {
    let host = req.host().unwrap_or_default();
    let path = req.uri.path();
    let path_info = if root != "/" {
        path.strip_prefix(root).unwrap_or(path)
    } else {
        path
    };
    let request_uri = req
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(path);

    let mut env = vec![
        format!("SERVER_SOFTWARE={}", SERVER_SOFTWARE),
        format!("SERVER_PROTOCOL={:?}", req.version),
        format!("HTTP_HOST={}", host),
        "GATEWAY_INTERFACE=CGI/1.1".to_string(),
        format!("REQUEST_METHOD={}", req.method),
        format!("QUERY_STRING={}", req.uri.query().unwrap_or_default()),
        format!("REQUEST_URI={}", request_uri),
        format!("PATH_INFO={}", path_info),
        format!("SCRIPT_NAME={}", root),
        format!("SCRIPT_FILENAME={}", script_filename),
        format!("SERVER_PORT={}", server_port(host, req.https)),
    ];

    if let Some(addr) = req.remote_addr {
        env.push(format!("REMOTE_ADDR={}", addr.ip()));
        env.push(format!("REMOTE_HOST={}", addr.ip()));
        env.push(format!("REMOTE_PORT={}", addr.port()));
    }

    env.push(format!("SERVER_NAME={}", split_host(host).0));

    if req.https {
        env.push("HTTPS=on".to_string());
    }

    for name in req.headers.keys() {
        let key = upper_case_and_underscore(name.as_str());
        // httpoxy
        if key == "PROXY" {
            continue;
        }
        let separator = if key == "COOKIE" { "; " } else { ", " };
        let value = req
            .headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(separator);
        env.push(format!("HTTP_{}={}", key, value));
    }

    if let Some(len) = req.content_length().filter(|len| *len > 0) {
        env.push(format!("CONTENT_LENGTH={}", len));
    }

    if let Some(content_type) = req.headers.get(header::CONTENT_TYPE) {
        env.push(format!(
            "CONTENT_TYPE={}",
            String::from_utf8_lossy(content_type.as_bytes())
        ));
    }

    env
}

/// Remove earlier assignments shadowed by a later one with the same name.
pub fn remove_leading_duplicates(env: Vec<String>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::with_capacity(env.len());
    for (i, entry) in env.iter().enumerate() {
        let name = entry.split_once('=').map_or(entry.as_str(), |(n, _)| n);
        let shadowed = env[i + 1..]
            .iter()
            .any(|later| later.split_once('=').map_or(later.as_str(), |(n, _)| n) == name);
        if !shadowed {
            kept.push(entry.clone());
        }
    }
    kept
}

fn upper_case_and_underscore(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '-' | '=' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

fn server_port(host: &str, https: bool) -> &str {
    match split_host(host).1 {
        Some(port) => port,
        None if https => "443",
        None => "80",
    }
}

/// Split `host[:port]`, keeping bracketed IPv6 literals intact.
fn split_host(host: &str) -> (&str, Option<&str>) {
    match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!name.contains(':') || name.ends_with(']')) =>
        {
            (name.trim_start_matches('[').trim_end_matches(']'), Some(port))
        }
        _ => (host, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method, Version};

    fn request(uri: &str, headers: HeaderMap) -> CgiRequest {
        CgiRequest {
            method: Method::POST,
            uri: uri.parse().unwrap(),
            version: Version::HTTP_11,
            headers,
            remote_addr: Some("10.0.0.7:51000".parse().unwrap()),
            https: false,
            body: CgiRequest::empty_body(),
        }
    }

    fn lookup<'a>(env: &'a [String], name: &str) -> Option<&'a str> {
        env.iter().find_map(|e| e.strip_prefix(name)?.strip_prefix('='))
    }

    #[test]
    fn standard_variables() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("example.org:8080"));
        headers.insert("content-length", HeaderValue::from_static("11"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let req = request("/app/extra?x=1&y=2", headers);

        let env = meta_variables(&req, "/", "./prog");

        assert_eq!(lookup(&env, "REQUEST_METHOD"), Some("POST"));
        assert_eq!(lookup(&env, "QUERY_STRING"), Some("x=1&y=2"));
        assert_eq!(lookup(&env, "REQUEST_URI"), Some("/app/extra?x=1&y=2"));
        assert_eq!(lookup(&env, "PATH_INFO"), Some("/app/extra"));
        assert_eq!(lookup(&env, "SCRIPT_NAME"), Some("/"));
        assert_eq!(lookup(&env, "SCRIPT_FILENAME"), Some("./prog"));
        assert_eq!(lookup(&env, "SERVER_NAME"), Some("example.org"));
        assert_eq!(lookup(&env, "SERVER_PORT"), Some("8080"));
        assert_eq!(lookup(&env, "SERVER_PROTOCOL"), Some("HTTP/1.1"));
        assert_eq!(lookup(&env, "REMOTE_ADDR"), Some("10.0.0.7"));
        assert_eq!(lookup(&env, "REMOTE_PORT"), Some("51000"));
        assert_eq!(lookup(&env, "CONTENT_LENGTH"), Some("11"));
        assert_eq!(lookup(&env, "CONTENT_TYPE"), Some("text/plain"));
        assert_eq!(lookup(&env, "HTTP_CONTENT_TYPE"), Some("text/plain"));
        assert_eq!(lookup(&env, "HTTPS"), None);
    }

    #[test]
    fn root_prefix_is_stripped_from_path_info() {
        let req = request("/cgi/hello/world", HeaderMap::new());
        let env = meta_variables(&req, "/cgi", "/srv/hello");

        assert_eq!(lookup(&env, "PATH_INFO"), Some("/hello/world"));
        assert_eq!(lookup(&env, "SCRIPT_NAME"), Some("/cgi"));
        assert_eq!(lookup(&env, "SERVER_PORT"), Some("80"));
    }

    #[test]
    fn proxy_header_is_dropped_and_cookies_joined() {
        let mut headers = HeaderMap::new();
        headers.insert("proxy", HeaderValue::from_static("http://evil:1"));
        headers.append("cookie", HeaderValue::from_static("a=1"));
        headers.append("cookie", HeaderValue::from_static("b=2"));
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("text/plain"));
        let env = meta_variables(&request("/", headers), "/", "./prog");

        assert_eq!(lookup(&env, "HTTP_PROXY"), None);
        assert_eq!(lookup(&env, "HTTP_COOKIE"), Some("a=1; b=2"));
        assert_eq!(lookup(&env, "HTTP_ACCEPT"), Some("text/html, text/plain"));
    }

    #[test]
    fn https_defaults_port_443() {
        let mut req = request("/", HeaderMap::new());
        req.https = true;
        let env = meta_variables(&req, "/", "./prog");

        assert_eq!(lookup(&env, "HTTPS"), Some("on"));
        assert_eq!(lookup(&env, "SERVER_PORT"), Some("443"));
    }

    #[test]
    fn later_assignment_wins() {
        let env = vec![
            "PATH=/bin".to_string(),
            "A=1".to_string(),
            "PATH=/bin:.".to_string(),
        ];
        assert_eq!(remove_leading_duplicates(env), vec!["A=1", "PATH=/bin:."]);
    }

    #[test]
    fn host_splitting() {
        assert_eq!(split_host("example.org"), ("example.org", None));
        assert_eq!(split_host("[::1]:3333"), ("::1", Some("3333")));
        assert_eq!(split_host("::1"), ("::1", None));
    }
}
