//! Minimal FastCGI web-server side for driving the responder.

use std::io;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const BEGIN_REQUEST: u8 = 1;
pub const END_REQUEST: u8 = 3;
pub const PARAMS: u8 = 4;
pub const STDIN: u8 = 5;
pub const STDOUT: u8 = 6;
pub const STDERR: u8 = 7;

pub const RESPONDER: u16 = 1;
pub const KEEP_CONN: u8 = 1;

#[derive(Debug, Default)]
pub struct Reply {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub end: Vec<u8>,
}

impl Reply {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
}

fn record(kind: u8, id: u16, content: &[u8]) -> Vec<u8> {
    let padding = (8 - content.len() % 8) % 8;
    let mut out = vec![1, kind];
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&(content.len() as u16).to_be_bytes());
    out.push(padding as u8);
    out.push(0);
    out.extend_from_slice(content);
    out.resize(out.len() + padding, 0);
    out
}

fn pairs(params: &[(&str, &str)]) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, value) in params {
        for len in [name.len(), value.len()] {
            if len < 128 {
                out.push(len as u8);
            } else {
                out.extend_from_slice(&((len as u32) | 0x8000_0000).to_be_bytes());
            }
        }
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(value.as_bytes());
    }
    out
}

/// Send one complete request: BEGIN, PARAMS, STDIN.
pub async fn send_request(
    stream: &mut TcpStream,
    id: u16,
    params: &[(&str, &str)],
    stdin: &[u8],
    flags: u8,
) -> io::Result<()> {
    let role = RESPONDER.to_be_bytes();
    let mut out = record(BEGIN_REQUEST, id, &[role[0], role[1], flags, 0, 0, 0, 0, 0]);
    out.extend(record(PARAMS, id, &pairs(params)));
    out.extend(record(PARAMS, id, &[]));
    for chunk in stdin.chunks(65535) {
        out.extend(record(STDIN, id, chunk));
    }
    out.extend(record(STDIN, id, &[]));
    stream.write_all(&out).await
}

/// Next record as `(type, request id, content)`; `None` at end of stream.
pub async fn read_record(stream: &mut TcpStream) -> io::Result<Option<(u8, u16, Vec<u8>)>> {
    let mut header = [0u8; 8];
    match stream.read_exact(&mut header).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }
    let id = u16::from_be_bytes([header[2], header[3]]);
    let len = u16::from_be_bytes([header[4], header[5]]) as usize;
    let mut content = vec![0u8; len + header[6] as usize];
    stream.read_exact(&mut content).await?;
    content.truncate(len);
    Ok(Some((header[1], id, content)))
}

/// Collect STDOUT and STDERR until END_REQUEST.
pub async fn read_reply(stream: &mut TcpStream, id: u16) -> io::Result<Reply> {
    let mut reply = Reply::default();
    loop {
        let (kind, request_id, content) = read_record(stream)
            .await?
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "closed before END_REQUEST"))?;
        assert_eq!(request_id, id);
        match kind {
            STDOUT => reply.stdout.extend_from_slice(&content),
            STDERR => reply.stderr.extend_from_slice(&content),
            END_REQUEST => {
                reply.end = content;
                return Ok(reply);
            }
            other => panic!("unexpected record type {}", other),
        }
    }
}
