//! Raw-socket HTTP/1.1 binding: just enough parsing for the two endpoints.
//! One request per connection, answered with `Connection: close`.

use anyhow::Result;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::handlers::{ApiHandler, ApiRequest, ApiResponse, CORS_HEADERS};

const MAX_HEAD_BYTES: usize = 64 * 1024;
const READ_CHUNK: usize = 8 * 1024;
// Whole request (head and body) must arrive within this window
const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection closed before a request was received")]
    Closed,
    #[error("{0}")]
    Malformed(&'static str),
    #[error("Request body too large")]
    TooLarge,
    #[error("Request timed out")]
    TimedOut,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Reads one request (head plus `Content-Length` body) from the stream.
pub async fn read_request<S>(stream: &mut S, max_body_bytes: usize) -> Result<RawRequest, RequestError>
where
    S: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(RequestError::Malformed("Request headers too large"));
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(if buf.is_empty() {
                RequestError::Closed
            } else {
                RequestError::Malformed("Incomplete request")
            });
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = std::str::from_utf8(&buf[..head_end])
        .map_err(|_| RequestError::Malformed("Request head is not valid UTF-8"))?;
    let mut lines = head.split("\r\n");

    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let (method, path, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(path), Some(version)) => (method, path, version),
        _ => return Err(RequestError::Malformed("Invalid request line")),
    };
    if !version.starts_with("HTTP/1.") {
        return Err(RequestError::Malformed("Unsupported HTTP version"));
    }

    let mut headers = Vec::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or(RequestError::Malformed("Invalid header line"))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }

    let mut request = RawRequest {
        method: method.to_ascii_uppercase(),
        path: path.to_string(),
        headers,
        body: Vec::new(),
    };

    if request.header("transfer-encoding").is_some() {
        return Err(RequestError::Malformed("Chunked request bodies are not supported"));
    }

    let content_length = match request.header("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| RequestError::Malformed("Invalid Content-Length"))?,
        None => 0,
    };
    if content_length > max_body_bytes {
        return Err(RequestError::TooLarge);
    }

    let mut body = buf.split_off(head_end + 4);
    if body.len() < content_length {
        let already = body.len();
        body.resize(content_length, 0);
        stream.read_exact(&mut body[already..]).await?;
    }
    body.truncate(content_length);
    request.body = body;

    Ok(request)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        413 => "Payload Too Large",
        _ => "Internal Server Error",
    }
}

pub async fn write_response<S>(stream: &mut S, response: &ApiResponse) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    let body = match &response.body {
        Some(value) => serde_json::to_vec(value)?,
        None => Vec::new(),
    };

    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason_phrase(response.status));
    if response.body.is_some() {
        head.push_str("Content-Type: application/json\r\n");
    }
    head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    for (name, value) in CORS_HEADERS {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("Connection: close\r\n\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await
}

async fn handle_connection<S>(
    mut stream: S,
    handler: ApiHandler,
    max_body_bytes: usize,
    read_timeout: Duration,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let read = tokio::time::timeout(read_timeout, read_request(&mut stream, max_body_bytes)).await;
    let response = match read.unwrap_or(Err(RequestError::TimedOut)) {
        Ok(request) => {
            handler
                .handle(ApiRequest {
                    method: request.method,
                    path: request.path,
                    body: request.body,
                })
                .await
        }
        Err(RequestError::Closed) => return,
        Err(RequestError::Io(e)) => {
            log::debug!("Connection error while reading request: {}", e);
            return;
        }
        Err(RequestError::TooLarge) => {
            log::warn!("🚫 Rejected request: body too large");
            ApiResponse::error(413, "Request body too large")
        }
        Err(RequestError::TimedOut) => {
            log::warn!("⏱️ Client did not send a complete request within {:?}", read_timeout);
            ApiResponse::error(408, "Request timed out")
        }
        Err(RequestError::Malformed(reason)) => {
            log::warn!("🚫 Rejected malformed request: {}", reason);
            ApiResponse::error(400, reason)
        }
    };

    if let Err(e) = write_response(&mut stream, &response).await {
        log::debug!("Failed to write response: {}", e);
    }
}

/// Accept loop; every connection gets its own task.
pub async fn serve(listener: TcpListener, handler: ApiHandler, max_body_bytes: usize) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                log::error!("❌ Failed to accept connection: {}", e);
                continue;
            }
        };
        log::debug!("🔌 Connection from {}", peer);

        let handler = handler.clone();
        tokio::spawn(handle_connection(stream, handler, max_body_bytes, READ_TIMEOUT));
    }
}
