use crate::error::ExecError;
use crate::request::Method;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A fully resolved outbound HTTP call: absolute URL plus transport flags.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpCall {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub accept_invalid_certs: bool,
}

impl HttpCall {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: Vec::new(),
            body: None,
            accept_invalid_certs: false,
        }
    }
}

/// Body of a 2xx response, kept as text until normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody {
    pub status: u16,
    pub text: String,
}

impl RawBody {
    pub fn json(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.text)
    }
}

/// Cancellation token that fires on its own after a delay.
///
/// Dropping the deadline disarms the timer, so leaving `execute` by any path
/// (success, error, or the caller dropping the future) leaves nothing behind.
pub struct Deadline {
    token: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    pub fn arm(after: Duration) -> Self {
        let token = CancellationToken::new();
        let fire = token.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            fire.cancel();
        });
        Self { token, timer }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn fired(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Issues single HTTP calls under a deadline. Never retries.
#[derive(Clone)]
pub struct RequestExecutor {
    client: Client,
    insecure_client: Client,
}

impl RequestExecutor {
    pub fn new() -> Result<Self, ExecError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ExecError::Config(format!("failed to build HTTP client: {e}")))?;
        let insecure_client = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| ExecError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            insecure_client,
        })
    }

    pub async fn execute(&self, call: &HttpCall, timeout: Duration) -> Result<RawBody, ExecError> {
        let timeout_ms = timeout.as_millis() as u64;
        let deadline = Deadline::arm(timeout);
        let cancelled = deadline.token();
        let started = Instant::now();

        let client = if call.accept_invalid_certs {
            &self.insecure_client
        } else {
            &self.client
        };
        let method = match call.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = client
            .request(method, &call.url)
            .header(ACCEPT, "application/json");
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        debug!("{} {} (timeout {}ms)", call.method, call.url, timeout_ms);

        let in_flight = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        // The in-flight future is dropped, and the connection with it, when the
        // deadline wins.
        let outcome = tokio::select! {
            biased;
            res = in_flight => res,
            _ = cancelled.cancelled() => {
                warn!("{} {} timed out after {}ms", call.method, call.url, timeout_ms);
                return Err(ExecError::Timeout { timeout_ms });
            }
        };
        drop(deadline);

        let (status, text) = outcome.map_err(|e| {
            if e.is_timeout() {
                ExecError::Timeout { timeout_ms }
            } else {
                ExecError::Transport(e.to_string())
            }
        })?;

        debug!(
            "{} {} -> {} in {:?}",
            call.method,
            call.url,
            status,
            started.elapsed()
        );

        if !status.is_success() {
            return Err(ExecError::HttpStatus {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(RawBody {
            status: status.as_u16(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deadline_fires_after_delay() {
        let deadline = Deadline::arm(Duration::from_millis(20));
        let token = deadline.token();
        assert!(!deadline.fired());
        token.cancelled().await;
        assert!(deadline.fired());
    }

    #[tokio::test]
    async fn test_dropped_deadline_never_fires() {
        let deadline = Deadline::arm(Duration::from_millis(20));
        let token = deadline.token();
        drop(deadline);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_raw_body_json() {
        let body = RawBody {
            status: 200,
            text: r#"{"programme":{"reunions":[]}}"#.to_string(),
        };
        assert!(body.json().unwrap()["programme"]["reunions"].is_array());

        let broken = RawBody {
            status: 200,
            text: "<html>".to_string(),
        };
        assert!(broken.json().is_err());
    }
}
