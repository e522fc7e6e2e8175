//! Network layer.
//!
//! [`HyperTransport`] is what [`ClientBuilder::build`](crate::ClientBuilder::build)
//! uses. Any `tower::Service<http::Request<Body>, Response = http::Response<Body>,
//! Error = ClientError>` can replace it, which is how the unit tests run the
//! client without sockets.
//!
//! Each request carries its call's
//! [`CancellationToken`](tokio_util::sync::CancellationToken) in its extensions.

mod body;
mod connector;
mod hyper;

pub use body::Body;
pub use connector::{ConnectSettings, build_https_connector, default_tls_config, has_tls_support};
pub use hyper::{HyperTransport, HyperTransportBuilder, TransportFuture};

/// rustls configuration accepted by [`HyperTransportBuilder::tls_config`].
pub use rustls::ClientConfig as TlsClientConfig;
