//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`FetchClient`].

use crate::client::FetchClient;
use crate::registry::InterceptorRegistry;
use crate::transport::{HyperTransport, HyperTransportBuilder};
use crate::ClientError;

/// Environment variable read by [`ClientBuilder::from_env`].
pub const API_BASE_ENV: &str = "FETCH_API_BASE";

/// Base URL used when none is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:3001";

/// Builder for creating a [`FetchClient`].
///
/// # Example
///
/// ```ignore
/// use fetch_client::{ClientBuilder, HyperTransport};
/// use std::time::Duration;
///
/// let client = ClientBuilder::from_env()
///     .transport_builder(
///         HyperTransport::builder().pool_idle_timeout(Duration::from_secs(30)),
///     )
///     .build()?;
/// ```
pub struct ClientBuilder {
    /// Default base URL for relative paths.
    base_url: String,
    /// Registry to share instead of a fresh one.
    registry: Option<InterceptorRegistry>,
    /// Settings for the default hyper transport.
    transport: HyperTransportBuilder,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("registry", &self.registry.is_some())
            .field("transport", &self.transport)
            .finish()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a builder using [`DEFAULT_API_BASE`].
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            registry: None,
            transport: HyperTransportBuilder::new(),
        }
    }

    /// Create a builder whose base URL comes from `FETCH_API_BASE`.
    ///
    /// An unset or empty variable falls back to [`DEFAULT_API_BASE`].
    pub fn from_env() -> Self {
        Self::new().base_url(base_url_from(std::env::var(API_BASE_ENV).ok()))
    }

    /// Set the default base URL.
    ///
    /// Paths are appended verbatim, so leave off the trailing slash.
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Share an existing interceptor registry.
    pub fn registry(mut self, registry: InterceptorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Configure the default hyper transport.
    pub fn transport_builder(mut self, transport: HyperTransportBuilder) -> Self {
        self.transport = transport;
        self
    }

    /// Build the client over a [`HyperTransport`].
    pub fn build(self) -> Result<FetchClient<HyperTransport>, ClientError> {
        let transport = self.transport.build()?;
        Ok(FetchClient::from_parts(
            transport,
            self.base_url,
            self.registry.unwrap_or_default(),
        ))
    }

    /// Build the client over a custom transport.
    ///
    /// Transport settings configured through
    /// [`transport_builder`](Self::transport_builder) are ignored.
    pub fn build_with_transport<S>(self, transport: S) -> FetchClient<S> {
        FetchClient::from_parts(transport, self.base_url, self.registry.unwrap_or_default())
    }
}

fn base_url_from(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = ClientBuilder::new().build_with_transport(());
        assert_eq!(client.base_url(), DEFAULT_API_BASE);
    }

    #[test]
    fn test_base_url_from_env_value() {
        assert_eq!(
            base_url_from(Some("https://api.example.com".into())),
            "https://api.example.com"
        );
        assert_eq!(base_url_from(Some(String::new())), DEFAULT_API_BASE);
        assert_eq!(base_url_from(None), DEFAULT_API_BASE);
    }

    #[test]
    fn test_shared_registry() {
        let registry = InterceptorRegistry::new();
        let a = ClientBuilder::new().registry(registry.clone()).build_with_transport(());
        let b = ClientBuilder::new().registry(registry.clone()).build_with_transport(());

        a.add_request_interceptor(());
        b.add_response_interceptor(());
        assert_eq!(registry.request_len(), 1);
        assert_eq!(registry.response_len(), 1);
    }

    #[cfg(feature = "tls-ring")]
    #[tokio::test]
    async fn test_build_hyper_client() {
        let client = ClientBuilder::new().base_url("http://localhost:3000").build().unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }
}
