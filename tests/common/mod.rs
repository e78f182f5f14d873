//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Start a programmable mock provider speaking just enough HTTP.
///
/// The handler receives the request path ("/v1/models" for probes,
/// "/v1/chat/completions" for completions) and returns (status, json body).
pub async fn start_mock_provider<F, Fut>(addr: SocketAddr, handler: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let mut buf: Vec<u8> = vec![0u8; 16 * 1024];
                        let mut read = 0usize;

                        // Read headers, then the full body per content-length,
                        // so the client never sees a reset mid-request.
                        let header_end = loop {
                            match socket.read(&mut buf[read..]).await {
                                Ok(0) => return,
                                Ok(n) => {
                                    read += n;
                                    if let Some(pos) = find_header_end(&buf[..read]) {
                                        break pos;
                                    }
                                    if read == buf.len() {
                                        buf.resize(buf.len() * 2, 0);
                                    }
                                }
                                Err(_) => return,
                            }
                        };

                        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                        let content_length = head
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                name.eq_ignore_ascii_case("content-length")
                                    .then(|| value.trim().parse::<usize>().ok())?
                            })
                            .unwrap_or(0);

                        let total = header_end + 4 + content_length;
                        while read < total {
                            if read == buf.len() {
                                buf.resize(buf.len() * 2, 0);
                            }
                            match socket.read(&mut buf[read..]).await {
                                Ok(0) => break,
                                Ok(n) => read += n,
                                Err(_) => return,
                            }
                        }

                        let path = head
                            .split_whitespace()
                            .nth(1)
                            .unwrap_or("/")
                            .split('?')
                            .next()
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = handler(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Start a mock provider that always probes healthy and completes with
/// `text`.
pub async fn start_healthy_provider(addr: SocketAddr, text: &'static str) {
    start_mock_provider(addr, move |path| async move {
        if path == "/v1/chat/completions" {
            (200, completion_body(text))
        } else {
            (200, models_body())
        }
    })
    .await;
}

/// OpenAI-style completion payload with the given text.
pub fn completion_body(text: &str) -> String {
    serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": text } }
        ]
    })
    .to_string()
}

/// OpenAI-style model list payload, used for probes.
pub fn models_body() -> String {
    serde_json::json!({
        "data": [ { "id": "test-model" } ]
    })
    .to_string()
}
