//! Loopback HTTP responder for embedding endpoints.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Builds a reply body from the texts of one request.
pub type Render = fn(&[String]) -> serde_json::Value;

/// Answers every POST by embedding the array under `field`, recording how
/// many texts each call carried. Calls above `limit` get a 400.
pub struct EmbedServer {
    base_url: String,
    batches: Arc<Mutex<Vec<usize>>>,
}

impl EmbedServer {
    pub async fn start(field: &'static str, limit: usize, render: Render) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let batches = Arc::new(Mutex::new(Vec::new()));

        let seen = batches.clone();
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let seen = seen.clone();
                tokio::spawn(async move {
                    let body = read_body(&mut stream).await;
                    let texts: Vec<String> = serde_json::from_slice::<serde_json::Value>(&body)
                        .ok()
                        .and_then(|v| serde_json::from_value(v[field].clone()).ok())
                        .unwrap_or_default();
                    seen.lock().unwrap().push(texts.len());

                    let (status, reply) = if texts.len() > limit {
                        ("400 Bad Request", format!("too many texts: {}", texts.len()))
                    } else {
                        ("200 OK", render(&texts).to_string())
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
                        reply.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self { base_url, batches }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Text counts of the calls received so far, in arrival order.
    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

/// Inputs are named `t<N>`; their vector is `[N]`.
pub fn vector_for(text: &str) -> Vec<f32> {
    vec![text.trim_start_matches('t').parse().unwrap_or(-1.0)]
}

pub fn numbered_inputs(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("t{i}")).collect()
}

async fn read_body(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return Vec::new();
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };

        let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let start = end + 4;
        while buf.len() < start + length {
            let n = stream.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        return buf[start..].to_vec();
    }
}
