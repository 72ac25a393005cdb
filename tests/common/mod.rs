//! Shared helpers for integration tests
//!
//! `serve_once` is a one-connection HTTP responder on 127.0.0.1 that
//! returns the raw request it received, so tests can assert on the query
//! string and JSON body the client produced. `serve_and_hold` leaves the
//! connection open and reports whether the client closed it.

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

/// One `data:` line carrying a text delta
pub fn event(text: &str) -> String {
    format!(
        "data: {}\r\n\r\n",
        serde_json::json!({"candidates":[{"content":{"parts":[{"text": text}],"role":"model"}}]})
    )
}

/// 200 event-stream response delimited by connection close
pub fn sse_response(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n{}",
        body
    )
    .into_bytes()
}

/// JSON error response in the API's error envelope
pub fn error_response(status: u16, reason: &str, message: &str, api_status: &str) -> Vec<u8> {
    let body = serde_json::json!({
        "error": {"code": status, "message": message, "status": api_status}
    })
    .to_string();
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )
    .into_bytes()
}

/// Response promising more body bytes than it delivers before closing
pub fn truncated_response(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len() + 4096,
        body
    )
    .into_bytes()
}

/// Captured request
pub struct Captured {
    pub head: String,
    pub body: String,
}

impl Captured {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Accept one connection, answer with `response`, return what was sent
pub async fn serve_once(response: Vec<u8>) -> (String, JoinHandle<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let captured = read_request(&mut socket).await;

        socket.write_all(&response).await.unwrap();
        socket.flush().await.unwrap();
        let _ = socket.shutdown().await;

        captured
    });

    (format!("http://{}", addr), handle)
}

/// Answer with `response` but keep the socket open
///
/// Resolves to true once the client closes the connection, false if it
/// is still open after five seconds.
pub async fn serve_and_hold(response: Vec<u8>) -> (String, JoinHandle<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;

        socket.write_all(&response).await.unwrap();
        socket.flush().await.unwrap();

        let mut buf = [0u8; 64];
        matches!(
            timeout(Duration::from_secs(5), socket.read(&mut buf)).await,
            Ok(Ok(0)) | Ok(Err(_))
        )
    });

    (format!("http://{}", addr), handle)
}

/// Endpoint template pointing at a local responder
pub fn template(base: &str) -> String {
    format!("{}/v1beta/models/{{MODEL}}:streamGenerateContent", base)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Captured {
        head,
        body: String::from_utf8_lossy(&buf[header_end..]).to_string(),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
