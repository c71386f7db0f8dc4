use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failure of one backend call, classified once at the client boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No HTTP response was obtained (DNS, connect, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded its budget and was aborted.
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// A response arrived with status >= 400.
    #[error("HTTP {status}: {detail}")]
    Http { status: StatusCode, detail: String },

    /// Input rejected locally; never reached the network.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A success response whose body was not the expected JSON.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The caller's cancellation token fired before the request settled.
    #[error("Request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn http(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Http {
            status,
            detail: detail.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// Transport failures, timeouts and 5xx responses may succeed when
    /// repeated unchanged. 4xx responses need different input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Http { status, .. } => status.is_server_error(),
            Self::Validation(_) | Self::Decode(_) | Self::Cancelled => false,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            Self::Timeout(_) => {
                "The server took too long to respond. Please try again.".to_string()
            }
            Self::Http { detail, .. } => detail.clone(),
            Self::Validation(msg) => msg.clone(),
            Self::Decode(_) => "The server sent an unexpected response.".to_string(),
            Self::Cancelled => "The request was cancelled.".to_string(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Pull the user-facing detail out of an error body.
///
/// The backend answers errors with `{"detail": "..."}`; request validation
/// failures carry a list of `{"msg": ...}` objects instead.
pub(crate) fn detail_from_body(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned());

    match detail {
        Some(Value::String(s)) if !s.is_empty() => s,
        Some(Value::Array(items)) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| generic_detail(status)),
        _ => generic_detail(status),
    }
}

fn generic_detail(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("Request failed with status {} {}", status.as_u16(), reason),
        None => format!("Request failed with status {}", status.as_u16()),
    }
}
