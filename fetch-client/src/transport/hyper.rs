//! The default network layer: hyper-util's pooled client behind rustls.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tokio_util::sync::CancellationToken;
use tower_service::Service;

use super::body::Body;
use super::connector::{ConnectSettings, build_https_connector, default_tls_config};
use crate::ClientError;

type PooledClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Future returned by [`HyperTransport`]'s `Service` impl.
pub type TransportFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<Body>, ClientError>> + Send>>;

/// Sends requests over a pooled hyper connection.
///
/// Plain `http://` and `https://` URLs both work; HTTPS negotiates HTTP/1.1 or
/// HTTP/2 through ALPN. Clones share the pool.
///
/// If a request carries a [`CancellationToken`] in its extensions, cancelling
/// the token drops the in-flight exchange.
///
/// ```ignore
/// use fetch_client::{FetchClient, HyperTransport};
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .connect_timeout(Duration::from_secs(3))
///     .build()?;
/// let client = FetchClient::builder().build_with_transport(transport);
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: PooledClient,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Start configuring a transport.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// A transport with the default pool and TLS settings.
    pub fn new() -> Result<Self, ClientError> {
        Self::builder().build()
    }

    /// Whether the transport skips HTTP/1.1 entirely.
    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }

    /// Perform one exchange, stopping early if the request's token fires.
    pub async fn send(
        &self,
        request: http::Request<Body>,
    ) -> Result<http::Response<Body>, ClientError> {
        let token = request.extensions().get::<CancellationToken>().cloned();
        let exchange = self.client.request(request);

        let response = match token {
            Some(token) => tokio::select! {
                response = exchange => response,
                _ = token.cancelled() => return Err(ClientError::Canceled),
            },
            None => exchange.await,
        };

        response
            .map(|response| response.map(Body::incoming))
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}

impl Service<http::Request<Body>> for HyperTransport {
    type Response = http::Response<Body>;
    type Error = ClientError;
    type Future = TransportFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // The pool hands out or opens a connection per request.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Body>) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.send(request).await })
    }
}

/// Connection-pool knobs.
#[derive(Clone, Debug, PartialEq, Eq)]
struct PoolSettings {
    idle_timeout: Option<Duration>,
    max_idle_per_host: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(90)),
            max_idle_per_host: 32,
        }
    }
}

/// Configures a [`HyperTransport`].
#[derive(Default)]
pub struct HyperTransportBuilder {
    tls: Option<ClientConfig>,
    pool: PoolSettings,
    connect: ConnectSettings,
    http2_only: bool,
    keep_alive: Option<Duration>,
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("custom_tls", &self.tls.is_some())
            .field("pool", &self.pool)
            .field("connect", &self.connect)
            .field("http2_only", &self.http2_only)
            .field("keep_alive", &self.keep_alive)
            .finish()
    }
}

impl HyperTransportBuilder {
    /// Same as [`HyperTransport::builder`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` instead of the feature-selected TLS defaults, e.g. for a
    /// private CA or client certificates.
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls = Some(config);
        self
    }

    /// Close pooled connections idle for longer than `timeout`. Default 90s.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool.idle_timeout = Some(timeout);
        self
    }

    /// Keep at most `max` idle connections per host. Default 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool.max_idle_per_host = max;
        self
    }

    /// Give up on establishing a TCP connection after `timeout`.
    ///
    /// Independent of the per-call timeout in
    /// [`RequestOptions`](crate::RequestOptions).
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect.timeout = Some(timeout);
        self
    }

    /// Speak HTTP/2 from the first byte, including over plain `http://`.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Ping idle HTTP/2 connections every `interval`.
    pub fn h2_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    /// Create the transport.
    ///
    /// Fails if no TLS configuration was supplied and none can be derived
    /// from the enabled features.
    pub fn build(self) -> Result<HyperTransport, ClientError> {
        let tls = match self.tls {
            Some(tls) => tls,
            None => default_tls_config()?,
        };

        let mut client = Client::builder(TokioExecutor::new());
        client
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(self.pool.idle_timeout)
            .pool_max_idle_per_host(self.pool.max_idle_per_host)
            .http2_only(self.http2_only);

        if let Some(interval) = self.keep_alive {
            client
                .timer(TokioTimer::new())
                .http2_keep_alive_interval(interval);
        }

        Ok(HyperTransport {
            client: client.build(build_https_connector(tls, &self.connect)),
            http2_only: self.http2_only,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_settings() {
        let builder = HyperTransport::builder();
        assert_eq!(builder.pool, PoolSettings::default());
        assert_eq!(builder.pool.max_idle_per_host, 32);
        assert!(!builder.http2_only);
        assert!(builder.connect.timeout.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let builder = HyperTransport::builder()
            .pool_idle_timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(2)
            .connect_timeout(Duration::from_secs(1))
            .h2_keep_alive_interval(Duration::from_secs(10));

        assert_eq!(builder.pool.idle_timeout, Some(Duration::from_secs(5)));
        assert_eq!(builder.pool.max_idle_per_host, 2);
        assert_eq!(builder.connect.timeout, Some(Duration::from_secs(1)));
        assert_eq!(builder.keep_alive, Some(Duration::from_secs(10)));
    }

    #[cfg(feature = "tls-ring")]
    #[tokio::test]
    async fn test_http2_only_flag_is_kept() {
        let transport = HyperTransport::builder().http2_only(true).build().unwrap();
        assert!(transport.is_http2_only());
    }

    #[cfg(feature = "tls-ring")]
    #[tokio::test]
    async fn test_cancelled_token_stops_exchange() {
        let transport = HyperTransport::new().unwrap();
        let token = CancellationToken::new();
        token.cancel();

        // Port 9 (discard) on a TEST-NET address never answers.
        let mut request = http::Request::get("http://192.0.2.1:9/").body(Body::empty()).unwrap();
        request.extensions_mut().insert(token);

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, ClientError::Canceled));
    }
}
