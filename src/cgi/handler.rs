//! CGI program execution.
//!
//! # Responsibilities
//! - Assemble the child environment (meta-variables, `PATH`, extra list)
//! - Spawn the program in its working directory
//! - Stream the request body into the child's stdin
//! - Parse the response head and stream the remaining stdout back
//!
//! # Design Decisions
//! - The child starts from an empty environment
//! - No timeouts: a hung program hangs only its own request
//! - The child is killed when the response body is dropped early

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use axum::body::Bytes;
use futures_util::stream::{self, StreamExt};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::env::EnvSnapshot;
use super::error::CgiError;
use super::meta::{self, DEFAULT_PATH, LIBRARY_PATH_VAR};
use super::request::{BodyStream, CgiRequest};
use super::response::{read_head, CgiResponse};

const READ_CHUNK: usize = 8 * 1024;

/// Runs one configured CGI program per request.
#[derive(Debug, Clone)]
pub struct CgiHandler {
    program: String,
    args: Vec<String>,
    root: String,
    dir: Option<PathBuf>,
    snapshot: Arc<EnvSnapshot>,
}

impl CgiHandler {
    /// `program` is used verbatim; callers normalize it beforehand.
    pub fn new(program: impl Into<String>, root: impl Into<String>, snapshot: Arc<EnvSnapshot>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            root: root.into(),
            dir: None,
            snapshot,
        }
    }

    /// Arguments passed after the program name.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Working directory of the child.
    pub fn with_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.dir = dir.filter(|d| !d.as_os_str().is_empty());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The configured directory, else the program's directory, else `.`.
    pub fn working_dir(&self) -> PathBuf {
        if let Some(dir) = &self.dir {
            return dir.clone();
        }
        match Path::new(&self.program).parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Path handed to the OS, relative to `working_dir`.
    ///
    /// Without a configured directory the child runs inside the program's
    /// own directory, so a relative program is executed by file name.
    pub fn command_path(&self) -> PathBuf {
        let program = Path::new(&self.program);
        if self.dir.is_some() || program.is_absolute() {
            return program.to_path_buf();
        }
        match program.file_name() {
            Some(name) => Path::new(".").join(name),
            None => program.to_path_buf(),
        }
    }

    /// Full child environment for `req` with `extra` appended last.
    pub fn environment(&self, req: &CgiRequest, extra: Vec<String>) -> Vec<String> {
        let mut env = meta::meta_variables(req, &self.root, &self.program);

        let path = self.snapshot.get("PATH").filter(|p| !p.is_empty()).unwrap_or(DEFAULT_PATH);
        env.push(format!("PATH={}", path));

        if let Some(var) = LIBRARY_PATH_VAR {
            if let Some(value) = self.snapshot.get(var).filter(|v| !v.is_empty()) {
                env.push(format!("{}={}", var, value));
            }
        }

        env.extend(extra);
        meta::remove_leading_duplicates(env)
    }

    /// Run the program for one request.
    ///
    /// `extra` is the adapter-supplied list (inherited variables and, in
    /// HTTP mode, passthrough headers).
    pub async fn serve(&self, mut req: CgiRequest, extra: Vec<String>) -> Result<CgiResponse, CgiError> {
        if req.is_chunked() {
            return Err(CgiError::ChunkedBody);
        }

        let env = self.environment(&req, extra);
        let body = std::mem::replace(&mut req.body, CgiRequest::empty_body());

        let mut command = Command::new(self.command_path());
        command
            .args(&self.args)
            .current_dir(self.working_dir())
            .env_clear()
            .envs(env.iter().filter_map(|e| e.split_once('=')))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| {
            crate::observability::metrics::record_spawn_failure();
            CgiError::Spawn {
                program: self.program.clone(),
                source,
            }
        })?;

        tracing::debug!(
            program = %self.program,
            pid = child.id(),
            method = %req.method,
            uri = %req.uri,
            "CGI program started"
        );

        if let Some(stdin) = child.stdin.take() {
            tokio::spawn(feed_stdin(stdin, body));
        }
        if let Some(stderr) = child.stderr.take() {
            let program = self.program.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(program = %program, "{}", line);
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CgiError::Io(std::io::Error::other("child stdout not captured")))?;
        let mut reader = BufReader::new(stdout);
        let head = read_head(&mut reader).await?;

        Ok(CgiResponse {
            head,
            body: body_stream(reader, child),
        })
    }
}

async fn feed_stdin(mut stdin: ChildStdin, mut body: BodyStream) {
    while let Some(chunk) = body.next().await {
        let result = match chunk {
            Ok(chunk) => stdin.write_all(&chunk).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "Stopped feeding CGI stdin");
            return;
        }
    }
    // Dropping stdin signals EOF to the child.
}

/// Stream the rest of stdout, reaping the child once it is drained.
fn body_stream(reader: BufReader<ChildStdout>, child: Child) -> BodyStream {
    stream::unfold(Some((reader, child)), |state| async move {
        let (mut reader, mut child) = state?;
        let mut buf = vec![0u8; READ_CHUNK];
        match reader.read(&mut buf).await {
            Ok(0) => {
                match child.wait().await {
                    Ok(status) if !status.success() => {
                        tracing::warn!(status = %status, "CGI program exited unsuccessfully");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "Failed to reap CGI program"),
                }
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some((reader, child))))
            }
            Err(e) => {
                tracing::error!(error = %e, "Error reading CGI output");
                Some((Err(e), None))
            }
        }
    })
    .boxed()
}
