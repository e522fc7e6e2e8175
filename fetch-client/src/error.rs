//! Client-side error types.
//!
//! This module provides [`ClientError`], the single error type returned by
//! every request issued through the client.

use http::StatusCode;

/// Errors produced while building, sending, or decoding a request.
///
/// Every failure surfaces to the caller as one of these variants; the client
/// never retries or recovers internally.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a status outside the success range.
    ///
    /// `body` is the raw response text, or empty if it could not be read.
    #[error("HTTP {}: {}", .status.as_u16(), http_error_text(.status, .body))]
    Http { status: StatusCode, body: String },

    /// Transport-level error (connection refused, DNS, reset, etc.).
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-call timeout elapsed before the response arrived.
    #[error("request timeout")]
    Timeout,

    /// The caller-supplied cancellation token fired.
    #[error("request canceled")]
    Canceled,

    /// Request body serialization failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// Response body decoding failed.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request could not be constructed (bad URL, bad header, etc.).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An interceptor aborted the call.
    #[error("interceptor error: {0}")]
    Interceptor(String),
}

fn http_error_text<'a>(status: &StatusCode, body: &'a str) -> &'a str {
    if body.is_empty() {
        status.canonical_reason().unwrap_or("")
    } else {
        body
    }
}

impl ClientError {
    /// Create an HTTP status error.
    pub fn http<S: Into<String>>(status: StatusCode, body: S) -> Self {
        ClientError::Http {
            status,
            body: body.into(),
        }
    }

    /// Create an error raised from inside an interceptor.
    pub fn interceptor<S: Into<String>>(message: S) -> Self {
        ClientError::Interceptor(message.into())
    }

    /// The HTTP status, for [`ClientError::Http`].
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The raw response body text, for [`ClientError::Http`].
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::Http { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Whether the call was aborted by its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout)
    }

    /// Returns whether this error indicates a transient condition that may
    /// be resolved by retrying.
    ///
    /// Transport failures, timeouts, and `408`, `429` and `5xx` statuses are
    /// retryable. Everything else is returned to the caller as final.
    ///
    /// # Example
    ///
    /// ```
    /// use fetch_client::ClientError;
    /// use http::StatusCode;
    ///
    /// assert!(ClientError::Timeout.is_retryable());
    /// assert!(ClientError::http(StatusCode::SERVICE_UNAVAILABLE, "").is_retryable());
    /// assert!(!ClientError::http(StatusCode::NOT_FOUND, "missing").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport(_) | ClientError::Timeout => true,
            ClientError::Http { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(format!("JSON decoding failed: {}", err))
    }
}
