//! Per-call options.
//!
//! [`RequestOptions`] carries the base URL, timeout, headers and cancellation
//! signal for one call. A [`ScopedClient`](crate::ScopedClient) keeps one set
//! as defaults and merges each call's options over it.

use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;

/// Options for configuring individual calls.
///
/// # Example
///
/// ```ignore
/// use fetch_client::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::new()
///     .base_url("https://api.example.com")
///     .timeout(Duration::from_secs(5))
///     .header("x-request-id", "abc-123");
///
/// let payload = client.get("/users", options).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Overrides the client's base URL for relative paths.
    pub(crate) base_url: Option<String>,
    /// Cancels the call when it elapses.
    pub(crate) timeout: Option<Duration>,
    /// Headers layered over the `Accept: application/json` default.
    pub(crate) headers: Option<HeaderMap>,
    /// Cancels the call when fired.
    pub(crate) signal: Option<CancellationToken>,
}

impl RequestOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `base_url` instead of the client default.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Cancel the call with [`ClientError::Timeout`](crate::ClientError::Timeout)
    /// once `timeout` elapses.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a header for this call.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn header<K, V>(self, name: K, value: V) -> Self
    where
        K: TryInto<HeaderName>,
        K::Error: std::fmt::Debug,
        V: TryInto<HeaderValue>,
        V::Error: std::fmt::Debug,
    {
        let name = name.try_into().expect("invalid header name");
        let value = value.try_into().expect("invalid header value");
        self.header_value(name, value)
    }

    /// Try to add a header for this call.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header<K, V>(self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        Some(self.header_value(name, value))
    }

    fn header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    /// Replace all headers for this call.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Cancel the call when `signal` fires.
    pub fn signal(mut self, signal: CancellationToken) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Get the configured base URL, if any.
    pub fn get_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Get the configured timeout, if any.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Get the configured headers, if any.
    pub fn get_headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    /// Layer these options over `defaults`.
    ///
    /// Each field set here wins; unset fields fall back to `defaults`. Headers
    /// are one field: a call that sets any header replaces the default header
    /// map rather than extending it.
    pub fn merged_over(self, defaults: &RequestOptions) -> RequestOptions {
        RequestOptions {
            base_url: self.base_url.or_else(|| defaults.base_url.clone()),
            timeout: self.timeout.or(defaults.timeout),
            headers: self.headers.or_else(|| defaults.headers.clone()),
            signal: self.signal.or_else(|| defaults.signal.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let options = RequestOptions::new()
            .base_url("/api")
            .timeout(Duration::from_millis(1000))
            .header("x-base", "A");

        assert_eq!(options.get_base_url(), Some("/api"));
        assert_eq!(options.get_timeout(), Some(Duration::from_millis(1000)));
        assert_eq!(options.get_headers().unwrap().get("x-base").unwrap(), "A");
    }

    #[test]
    fn test_try_header_rejects_invalid() {
        assert!(RequestOptions::new().try_header("bad header", "v").is_none());
        assert!(RequestOptions::new().try_header("x-ok", "v").is_some());
    }

    #[test]
    fn test_call_level_wins() {
        let defaults = RequestOptions::new()
            .base_url("/api")
            .header("x-base", "A")
            .timeout(Duration::from_millis(1000));
        let call = RequestOptions::new()
            .header("x-req", "B")
            .timeout(Duration::from_millis(2000));

        let merged = call.merged_over(&defaults);
        assert_eq!(merged.get_base_url(), Some("/api"));
        assert_eq!(merged.get_timeout(), Some(Duration::from_millis(2000)));

        let headers = merged.get_headers().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("x-req").unwrap(), "B");
    }

    #[test]
    fn test_unset_fields_fall_back() {
        let defaults = RequestOptions::new().header("x-base", "A").timeout(Duration::from_secs(5));
        let merged = RequestOptions::new().merged_over(&defaults);

        assert_eq!(merged.get_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(merged.get_headers().unwrap().get("x-base").unwrap(), "A");
        assert!(merged.get_base_url().is_none());
    }

    #[test]
    fn test_merge_leaves_defaults_untouched() {
        let defaults = RequestOptions::new().header("a", "1").timeout(Duration::from_millis(5));
        let _ = RequestOptions::new()
            .header("b", "2")
            .timeout(Duration::from_millis(10))
            .merged_over(&defaults);

        assert_eq!(defaults.get_timeout(), Some(Duration::from_millis(5)));
        let headers = defaults.get_headers().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("a").unwrap(), "1");
    }
}
