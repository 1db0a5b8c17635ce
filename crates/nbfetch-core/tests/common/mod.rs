//! Minimal HTTP/1.1 server that can lie about its content length

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// What the server sends for one request
pub struct Reply {
    pub status: u16,
    /// Value of the Content-Length header
    pub declared: usize,
    pub body: Vec<u8>,
    /// Keep the connection open after the body instead of closing it
    pub stall: bool,
}

impl Reply {
    pub fn full(body: &[u8]) -> Self {
        Self {
            status: 200,
            declared: body.len(),
            body: body.to_vec(),
            stall: false,
        }
    }

    /// Declares `body` but only sends the first `sent` bytes, then hangs up
    pub fn truncated(body: &[u8], sent: usize) -> Self {
        Self {
            status: 200,
            declared: body.len(),
            body: body[..sent].to_vec(),
            stall: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            declared: 0,
            body: Vec::new(),
            stall: false,
        }
    }
}

pub struct TestServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    /// Serve every request with `handler(path, request_number)`;
    /// request numbers start at 1 and are shared across paths.
    pub async fn start<H>(handler: H) -> Self
    where
        H: Fn(&str, usize) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let handler = Arc::clone(&handler);
                let log = Arc::clone(&log);

                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }

                    let head = String::from_utf8_lossy(&head);
                    let path = head
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/")
                        .to_string();

                    let number = {
                        let mut log = log.lock().unwrap();
                        log.push(path.clone());
                        log.len()
                    };
                    let reply = handler(&path, number);

                    let header = format!(
                        "HTTP/1.1 {} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                        reply.status, reply.declared
                    );
                    let _ = socket.write_all(header.as_bytes()).await;
                    let _ = socket.write_all(&reply.body).await;
                    let _ = socket.flush().await;

                    if reply.stall {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                    }
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { base_url, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Request paths in arrival order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
