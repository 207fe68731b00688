//! FastCGI responder.
//!
//! Record framing and connection handling come from the `fastcgi` crate,
//! which serves each connection on its own thread. Requests on a
//! connection are handled one at a time; each one is bridged onto the
//! tokio runtime to run the CGI program.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use futures_util::stream::{self, StreamExt};
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;

use super::params::request_from_params;
use crate::cgi::{BodyStream, CgiHandler, CgiResponse, EnvironmentBuilder, ResponseHead};
use crate::config::GatewayConfig;
use crate::observability::metrics;

const READ_CHUNK: usize = 8 * 1024;

type StdinChunk = io::Result<Bytes>;

/// One FastCGI request as seen by the responder.
///
/// Implemented for `fastcgi::Request`; the streams are already framed.
pub trait Exchange {
    fn cgi_params(&self) -> Vec<(String, String)>;

    fn read_stdin(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write_stdout(&mut self, data: &[u8]) -> io::Result<()>;

    fn write_stderr(&mut self, data: &[u8]) -> io::Result<()>;

    /// The web server gave up on the request.
    fn aborted(&self) -> bool;
}

impl Exchange for ::fastcgi::Request {
    fn cgi_params(&self) -> Vec<(String, String)> {
        self.params().collect()
    }

    fn read_stdin(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdin().read(buf)
    }

    fn write_stdout(&mut self, data: &[u8]) -> io::Result<()> {
        let mut out = self.stdout();
        out.write_all(data)?;
        out.flush()
    }

    fn write_stderr(&mut self, data: &[u8]) -> io::Result<()> {
        let mut err = self.stderr();
        err.write_all(data)?;
        err.flush()
    }

    fn aborted(&self) -> bool {
        self.is_aborted()
    }
}

/// FastCGI listener in front of the CGI program.
pub struct FastCgiServer {
    shared: Arc<Shared>,
}

struct Shared {
    handler: CgiHandler,
    environment: EnvironmentBuilder,
    passthrough: bool,
}

impl FastCgiServer {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                handler: config.cgi_handler(),
                environment: config.environment_builder(),
                passthrough: config.fastcgi_passthrough,
            }),
        }
    }

    /// Serve connections until `shutdown` fires.
    ///
    /// The accept loop blocks, so it runs on a dedicated thread that lives
    /// until the process exits.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Starting FastCGI daemon listening on {}", addr);

        let listener = listener.into_std()?;
        listener.set_nonblocking(false)?;

        let runtime = Handle::current();
        let shared = self.shared;
        let (stopped_tx, stopped_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("cgd-fastcgi".to_string())
            .spawn(move || {
                ::fastcgi::run_tcp(
                    move |mut req: ::fastcgi::Request| {
                        respond(&shared, &runtime, &mut req);
                        // Dropping the request ends it.
                    },
                    &listener,
                );
                let _ = stopped_tx.send(());
            })?;

        tokio::select! {
            _ = stopped_rx => {
                return Err(io::Error::other("FastCGI accept loop stopped"));
            }
            _ = shutdown.recv() => {}
        }

        tracing::info!("FastCGI server stopped");
        Ok(())
    }
}

/// Run the program for one request and write its output to `exchange`.
///
/// Returns the status sent to the web server.
fn respond<E: Exchange>(shared: &Arc<Shared>, runtime: &Handle, exchange: &mut E) -> u16 {
    let start = Instant::now();
    let request_id = Uuid::new_v4();
    let params = exchange.cgi_params();

    let (tx, rx) = mpsc::unbounded_channel();
    let request = request_from_params(&params, stdin_stream(rx));

    let outcome = match request {
        Ok(request) => {
            let env = if shared.passthrough {
                shared.environment.build(&request.headers)
            } else {
                shared.environment.inherited()
            };
            let task_shared = Arc::clone(shared);
            let task = runtime.spawn(async move { task_shared.handler.serve(request, env).await });

            // The channel is unbounded so a program that writes before
            // reading its input cannot stall this loop.
            pump_stdin(exchange, &tx);
            drop(tx);

            match runtime.block_on(task) {
                Ok(result) => result.map_err(|e| (e.status_code(), e.to_string())),
                Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
            }
        }
        Err(e) => {
            pump_stdin(exchange, &tx);
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
    };

    let written = match outcome {
        Ok(response) => write_response(runtime, exchange, response, request_id),
        Err((status, message)) => {
            tracing::error!(request_id = %request_id, error = %message, "CGI request failed");
            write_failure(exchange, status, &message)
        }
    };

    match written {
        Ok(status) => {
            metrics::record_request("fastcgi", status, start);
            status
        }
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "FastCGI write failed");
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        }
    }
}

/// Forward the request body to the program until `FCGI_STDIN` ends.
fn pump_stdin<E: Exchange>(exchange: &mut E, tx: &mpsc::UnboundedSender<StdinChunk>) {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match exchange.read_stdin(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                // A closed receiver means the program stopped reading;
                // the rest of the body is still drained.
                let _ = tx.send(Ok(Bytes::copy_from_slice(&buf[..n])));
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

fn stdin_stream(rx: mpsc::UnboundedReceiver<StdinChunk>) -> BodyStream {
    stream::unfold(rx, |mut rx| async move {
        let chunk = rx.recv().await?;
        Some((chunk, rx))
    })
    .boxed()
}

/// Stream the head and body, stopping as soon as the request is aborted.
///
/// Dropping the body early kills the program.
fn write_response<E: Exchange>(
    runtime: &Handle,
    exchange: &mut E,
    response: CgiResponse,
    request_id: Uuid,
) -> io::Result<u16> {
    let status = response.head.status.as_u16();
    if exchange.aborted() {
        tracing::debug!(request_id = %request_id, "FastCGI request aborted before the response");
        return Ok(status);
    }
    exchange.write_stdout(&response.head.to_cgi_bytes())?;

    let mut body = response.body;
    while let Some(chunk) = runtime.block_on(body.next()) {
        if exchange.aborted() {
            tracing::debug!(request_id = %request_id, "FastCGI request aborted");
            break;
        }
        match chunk {
            Ok(chunk) if chunk.is_empty() => {}
            Ok(chunk) => exchange.write_stdout(&chunk)?,
            Err(e) => {
                exchange.write_stderr(e.to_string().as_bytes())?;
                break;
            }
        }
    }
    Ok(status)
}

fn write_failure<E: Exchange>(exchange: &mut E, status: StatusCode, message: &str) -> io::Result<u16> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    let head = ResponseHead { status, headers };

    let mut out = head.to_cgi_bytes();
    out.extend_from_slice(status.canonical_reason().unwrap_or("error").as_bytes());
    out.push(b'\n');
    exchange.write_stdout(&out)?;
    exchange.write_stderr(message.as_bytes())?;
    Ok(status.as_u16())
}
