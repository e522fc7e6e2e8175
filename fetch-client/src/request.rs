//! Request-side types: the body variant, the context threaded through request
//! interceptors, and URL resolution.

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::ClientError;
use crate::transport::Body;

/// A request payload.
///
/// The caller decides up front whether the payload is already encoded text or
/// a JSON value to serialize.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent unchanged.
    Raw(String),
    /// Serialized with `serde_json` before sending.
    Json(serde_json::Value),
}

impl RequestBody {
    /// Serialize any value into a [`RequestBody::Json`].
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ClientError::Encode(format!("JSON encoding failed: {}", e)))
    }

    pub(crate) fn into_bytes(self) -> Result<Bytes, ClientError> {
        match self {
            RequestBody::Raw(text) => Ok(Bytes::from(text)),
            RequestBody::Json(value) => serde_json::to_vec(&value)
                .map(Bytes::from)
                .map_err(|e| ClientError::Encode(format!("JSON encoding failed: {}", e))),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Raw(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Raw(text.to_owned())
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

/// Transport options of an outgoing request.
#[derive(Debug, Clone)]
pub struct RequestInit {
    /// HTTP method.
    pub method: Method,
    /// Headers sent with the request.
    pub headers: HeaderMap,
    /// Encoded request body, if any.
    pub body: Option<Bytes>,
    /// Caller-supplied cancellation signal.
    pub signal: Option<CancellationToken>,
}

impl RequestInit {
    /// Create options for `method` with no headers and no body.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            body: None,
            signal: None,
        }
    }
}

/// The value threaded through the request-interceptor chain.
///
/// Each interceptor receives the current context and returns the context the
/// next interceptor (and finally the network call) sees. Rewriting `url`,
/// headers, body, or signal is allowed.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Fully resolved target URL.
    pub url: String,
    /// Method, headers, body and signal.
    pub options: RequestInit,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(url: impl Into<String>, options: RequestInit) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }

    /// Get a mutable reference to the headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.options.headers
    }

    pub(crate) fn into_http(self) -> Result<http::Request<Body>, ClientError> {
        let RequestContext { url, options } = self;
        let body = options.body.map_or_else(Body::empty, Body::full);

        let mut request = http::Request::builder()
            .method(options.method)
            .uri(&url)
            .body(body)
            .map_err(|e| {
                ClientError::InvalidRequest(format!("failed to build request for {}: {}", url, e))
            })?;
        *request.headers_mut() = options.headers;
        Ok(request)
    }
}

/// Whether `path` already carries an `http://` or `https://` scheme.
pub fn is_absolute_url(path: &str) -> bool {
    ["http://", "https://"].iter().any(|scheme| {
        path.len() >= scheme.len()
            && path.is_char_boundary(scheme.len())
            && path[..scheme.len()].eq_ignore_ascii_case(scheme)
    })
}

/// Resolve `path` against `base`.
///
/// Absolute URLs are returned unchanged; anything else is appended to `base`
/// verbatim, so `base` should not end with a slash when `path` starts with one.
pub fn resolve_url(base: &str, path: &str) -> String {
    if is_absolute_url(path) {
        path.to_owned()
    } else {
        format!("{}{}", base, path)
    }
}
