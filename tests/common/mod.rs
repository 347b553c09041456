#![allow(dead_code)]

use pmu_rs::{Config, PmuClient, Stores};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Client whose provider and backend both point at `url`.
pub fn client_for(url: &str) -> (PmuClient, Arc<Stores>) {
    let config = Config::default()
        .with_overrides(Some(url.to_string()), Some(url.to_string()))
        .unwrap();
    client_with(config)
}

pub fn client_with(config: Config) -> (PmuClient, Arc<Stores>) {
    let stores = Arc::new(Stores::new());
    let client = PmuClient::new(&config, stores.clone()).unwrap();
    (client, stores)
}

/// Accepts connections and never answers.
pub async fn silent_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}")
}

/// An address nothing listens on.
pub fn refused_upstream() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Answers 200 with `body` after `delay`, picking the first entry whose
/// fragment appears in the request line.
pub async fn delayed_upstream(routes: Vec<(&'static str, Duration, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
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
                let request_line = head.lines().next().unwrap_or_default().to_string();
                let Some((_, delay, body)) =
                    routes.iter().find(|(fragment, _, _)| request_line.contains(fragment))
                else {
                    let _ = socket
                        .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                        .await;
                    return;
                };
                tokio::time::sleep(*delay).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}")
}
