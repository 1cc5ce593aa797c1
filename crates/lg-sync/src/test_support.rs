//! Shared test doubles: a scripted transport and a loopback HTTP server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use crate::error::FetchError;
use crate::fetcher::Transport;

#[derive(Default)]
struct Script {
    body: Mutex<Option<String>>,
    last_url: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

/// Transport returning a canned body (or failure) and counting calls.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Script>,
}

impl ScriptedTransport {
    pub fn ok(body: &str) -> Self {
        let transport = Self::default();
        transport.set_body(Some(body));
        transport
    }

    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_body(&self, body: Option<&str>) {
        *self.script.body.lock().unwrap() = body.map(str::to_string);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.script.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn last_url(&self) -> Option<String> {
        self.script.last_url.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn get(&self, url: &str, _timeout: Duration) -> Result<String, FetchError> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        *self.script.last_url.lock().unwrap() = Some(url.to_string());

        let delay = *self.script.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let body = self.script.body.lock().unwrap().clone();
        body.ok_or_else(|| FetchError::Transport("scripted failure".to_string()))
    }
}

/// Serve every connection with the same HTTP/1.1 response.
pub async fn serve_http(status: u16, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let response = format!(
                    "HTTP/1.1 {} Test\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    format!("http://{addr}/easylist.txt")
}

/// Accept connections and never answer.
pub async fn serve_silent() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    format!("http://{addr}/easylist.txt")
}
