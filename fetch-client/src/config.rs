//! Configuration modules for the client.
//!
//! This module contains request-level configuration:
//! - [`RequestOptions`]: Per-call base URL, timeout, headers and signal
//! - [`RetryPolicy`]: Caller-side retry with exponential backoff
//! - [`RequestInterceptor`] / [`ResponseInterceptor`]: Request/response interception

mod interceptor;
mod options;
mod retry;

pub use interceptor::{
    BearerAuth, BoxFuture, HeaderInterceptor, RequestFn, RequestInterceptor, ResponseFn,
    ResponseInterceptor, TokenSource, request_fn, response_fn,
};
pub use options::RequestOptions;
pub use retry::{ExponentialBackoff, RetryPolicy, defaults, retry, retry_with_policy};
