use thiserror::Error;

/// Every failure a request can end in, from pre-flight validation to the
/// upstream rejecting the call.
///
/// `Validation`, `NoRoute` and `Config` are raised synchronously before any
/// network I/O. `Timeout`, `Transport` and `HttpStatus` are operational and
/// end up in the family's shared state rather than crashing the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("no route for path {0}")]
    NoRoute(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ExecError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ExecError::Validation(msg.into())
    }

    /// Operational failures are expected at runtime and recovered into state.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            ExecError::Timeout { .. } | ExecError::Transport(_) | ExecError::HttpStatus { .. }
        )
    }

    /// Whether repeating the identical request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExecError::Timeout { .. } | ExecError::Transport(_) => true,
            ExecError::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Message shown to consumers of the shared query state.
    pub fn user_message(&self) -> String {
        match self {
            ExecError::Timeout { .. } => {
                "Request timeout - the server took too long to respond".to_string()
            }
            ExecError::HttpStatus { status, body } => upstream_error_field(body)
                .unwrap_or_else(|| default_status_message(*status)),
            other => other.to_string(),
        }
    }
}

/// Backends report failures as `{"error": "..."}`; prefer that text when present.
fn upstream_error_field(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(|e| e.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn default_status_message(status: u16) -> String {
    match status {
        400 => "Bad request - invalid parameters".to_string(),
        404 => "Resource not found".to_string(),
        500 => "Server error - please try again later".to_string(),
        _ => format!("HTTP error! status: {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operational_split() {
        assert!(ExecError::Timeout { timeout_ms: 10 }.is_operational());
        assert!(ExecError::Transport("reset".into()).is_operational());
        assert!(ExecError::HttpStatus { status: 502, body: String::new() }.is_operational());
        assert!(!ExecError::validation("bad").is_operational());
        assert!(!ExecError::NoRoute("/x".into()).is_operational());
    }

    #[test]
    fn test_retryable_only_for_transient_failures() {
        assert!(ExecError::Timeout { timeout_ms: 10 }.is_retryable());
        assert!(ExecError::HttpStatus { status: 503, body: String::new() }.is_retryable());
        assert!(!ExecError::HttpStatus { status: 404, body: String::new() }.is_retryable());
        assert!(!ExecError::validation("bad").is_retryable());
    }

    #[test]
    fn test_user_message_prefers_upstream_error_field() {
        let err = ExecError::HttpStatus {
            status: 422,
            body: r#"{"error":"race not found in database"}"#.to_string(),
        };
        assert_eq!(err.user_message(), "race not found in database");
    }

    #[test]
    fn test_user_message_status_defaults() {
        let msg = |status| ExecError::HttpStatus { status, body: "<html>".into() }.user_message();
        assert_eq!(msg(400), "Bad request - invalid parameters");
        assert_eq!(msg(404), "Resource not found");
        assert_eq!(msg(500), "Server error - please try again later");
        assert_eq!(msg(418), "HTTP error! status: 418");
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(
            ExecError::Timeout { timeout_ms: 5 }.user_message(),
            "Request timeout - the server took too long to respond"
        );
    }
}
