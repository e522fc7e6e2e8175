//! HTTP client with ordered interceptor chains.
//!
//! This crate provides a small JSON-oriented HTTP client for talking to a
//! message-signing backend:
//!
//! - `GET` / `POST` with a default base URL and absolute-URL passthrough
//! - Ordered request and response interceptor chains with removal handles
//! - Per-call timeouts and caller cancellation via [`CancellationToken`]
//! - Response decoding by content type (JSON or text)
//! - Scoped facades that merge default options and clean up their own
//!   interceptors
//!
//! ## Example
//!
//! ```ignore
//! use fetch_client::{FetchClient, RequestOptions};
//!
//! let client = FetchClient::builder()
//!     .base_url("http://localhost:3001")
//!     .build()?;
//!
//! let health = client.get("/health", RequestOptions::new()).await?;
//! println!("{:?}", health);
//! ```
//!
//! ## Interceptors
//!
//! Request interceptors receive a [`RequestContext`] (URL plus method,
//! headers, body and signal) and return the context the next step sees.
//! Response interceptors do the same with the raw [`Response`] and may
//! substitute a different one. Both run in registration order.
//!
//! ```ignore
//! use fetch_client::{BearerAuth, HeaderInterceptor, request_fn};
//!
//! client.add_request_interceptor(HeaderInterceptor::new("x-feature", "MessageSign"));
//! let auth = client.add_request_interceptor(BearerAuth::new(|| load_token()));
//!
//! // Later
//! auth.remove();
//! ```
//!
//! An interceptor that returns `Err` aborts the call with that error.
//!
//! ## Scoped Clients
//!
//! [`FetchClient::scoped`] creates a [`ScopedClient`] carrying default
//! options. Interceptors added through it are removed by
//! [`ScopedClient::cleanup`] or when it is dropped:
//!
//! ```ignore
//! use fetch_client::{RequestOptions, verify_signature};
//! use std::time::Duration;
//!
//! let api = client.scoped(RequestOptions::new().timeout(Duration::from_secs(10)));
//! let verdict = verify_signature(&api, "hello", &signature).await?;
//! assert!(verdict.is_valid);
//! ```
//!
//! ## Timeouts and Cancellation
//!
//! Each call runs under its own [`CancellationToken`], attached to the
//! outgoing request's extensions. A caller-supplied
//! [`RequestOptions::signal`] becomes the parent of that token. When
//! [`RequestOptions::timeout`] elapses the token is cancelled and the call
//! fails with [`ClientError::Timeout`]; when the caller's signal fires it
//! fails with [`ClientError::Canceled`].
//!
//! ## Error Handling
//!
//! Every failure surfaces as a [`ClientError`]. Statuses outside `2xx` become
//! [`ClientError::Http`], whose message reads `HTTP {status}: {body}`:
//!
//! ```ignore
//! match client.get("/missing", RequestOptions::new()).await {
//!     Err(err) if err.status() == Some(http::StatusCode::NOT_FOUND) => {
//!         println!("not found: {}", err.body().unwrap_or_default());
//!     }
//!     other => println!("{:?}", other),
//! }
//! ```
//!
//! The client never retries on its own; wrap calls with
//! [`retry_with_policy`] to retry transient failures.
//!
//! ## Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tls` | `tls-ring` + `tls-native-roots` (default) | |
//! | `tls-ring` / `tls-aws-lc` | Crypto provider for rustls | `ring` / `aws-lc-rs` |
//! | `tls-native-roots` | System root certificates | `rustls-native-certs` |
//! | `tls-webpki-roots` | Bundled Mozilla roots | `webpki-roots` |
//! | `tracing` | Tracing spans for requests (default) | `tracing` |
//!
//! When `tracing` is enabled, each call creates an `http.request` span with:
//! - `http.method`: Request method
//! - `url.full`: Resolved URL before request interceptors run
//! - `otel.kind`: "client"
//!
//! ## Configuration
//!
//! [`ClientBuilder::from_env`] reads the base URL from `FETCH_API_BASE`,
//! falling back to `http://localhost:3001`.

mod builder;
mod client;
pub mod config;
mod error;
mod registry;
pub mod request;
pub mod response;
mod scoped;
pub mod transport;
mod verify;

pub use builder::{API_BASE_ENV, ClientBuilder, DEFAULT_API_BASE};
pub use client::FetchClient;
pub use error::ClientError;
pub use registry::{InterceptorRegistry, RemoveHandle};
pub use scoped::ScopedClient;
pub use verify::{VERIFY_SIGNATURE_PATH, VerifyResponse, verify_signature};

// Re-export config types
pub use config::{
    BearerAuth, BoxFuture, ExponentialBackoff, HeaderInterceptor, RequestFn, RequestInterceptor,
    RequestOptions, ResponseFn, ResponseInterceptor, RetryPolicy, TokenSource, request_fn,
    response_fn, retry, retry_with_policy,
};

// Re-export request/response types
pub use request::{RequestBody, RequestContext, RequestInit, is_absolute_url, resolve_url};
pub use response::{Payload, Response};

// Re-export transport types
pub use transport::{Body, HyperTransport, HyperTransportBuilder, TlsClientConfig};

// Re-export commonly used external types
pub use bytes::Bytes;
pub use tokio_util::sync::CancellationToken;
