//! Connection setup: TCP settings plus the rustls configuration.
//!
//! The `tls` feature enables `tls-ring` and `tls-native-roots`. Swap in
//! `tls-aws-lc` for the crypto provider or `tls-webpki-roots` for the bundled
//! Mozilla roots. Building without any provider feature falls back to the
//! process-wide provider from `CryptoProvider::install_default()`.

use std::sync::Arc;
use std::time::Duration;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, RootCertStore};

use crate::ClientError;

/// TCP-level settings applied before the TLS handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectSettings {
    /// Abort the TCP connect after this long. `None` waits for the OS.
    pub timeout: Option<Duration>,
    /// Disable Nagle's algorithm. On by default; request bodies are small.
    pub nodelay: bool,
}

impl Default for ConnectSettings {
    fn default() -> Self {
        Self {
            timeout: None,
            nodelay: true,
        }
    }
}

/// True when the crate was built with both a crypto provider and a root
/// certificate source, i.e. `https://` works without extra setup.
#[inline]
pub const fn has_tls_support() -> bool {
    let provider = cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"));
    let roots = cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"));
    provider && roots
}

fn provider() -> Result<Arc<CryptoProvider>, ClientError> {
    #[cfg(feature = "tls-ring")]
    let found = Some(Arc::new(rustls::crypto::ring::default_provider()));

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    let found = Some(Arc::new(rustls::crypto::aws_lc_rs::default_provider()));

    #[cfg(not(any(feature = "tls-ring", feature = "tls-aws-lc")))]
    let found = CryptoProvider::get_default().cloned();

    found.ok_or_else(|| {
        ClientError::InvalidRequest(
            "no TLS crypto provider: enable `tls-ring` or `tls-aws-lc`, \
             or install a process-wide default"
                .into(),
        )
    })
}

fn trusted_roots() -> RootCertStore {
    #[allow(unused_mut)]
    let mut store = RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let loaded = rustls_native_certs::load_native_certs();
        // Partial failures still yield usable certificates.
        #[cfg(feature = "tracing")]
        {
            if !loaded.errors.is_empty() {
                tracing::debug!(errors = ?loaded.errors, "some system certificates failed to load");
            }
        }
        store.add_parsable_certificates(loaded.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    store
}

/// The TLS configuration used when none is given to the transport builder.
pub fn default_tls_config() -> Result<ClientConfig, ClientError> {
    let versions = ClientConfig::builder_with_provider(provider()?)
        .with_safe_default_protocol_versions()
        .map_err(|e| ClientError::InvalidRequest(format!("TLS setup failed: {}", e)))?;

    Ok(versions
        .with_root_certificates(trusted_roots())
        .with_no_client_auth())
}

/// A connector that accepts both `http://` and `https://` URLs.
pub fn build_https_connector(
    tls: ClientConfig,
    settings: &ConnectSettings,
) -> HttpsConnector<HttpConnector> {
    let mut tcp = HttpConnector::new();
    tcp.enforce_http(false);
    tcp.set_nodelay(settings.nodelay);
    tcp.set_connect_timeout(settings.timeout);

    HttpsConnectorBuilder::new()
        .with_tls_config(tls)
        .https_or_http()
        .enable_all_versions()
        .wrap_connector(tcp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_settings_default() {
        let settings = ConnectSettings::default();
        assert!(settings.nodelay);
        assert!(settings.timeout.is_none());
    }

    #[test]
    fn test_tls_support_follows_features() {
        if cfg!(feature = "tls") {
            assert!(has_tls_support());
        }
    }

    #[cfg(feature = "tls-ring")]
    #[test]
    fn test_connector_from_default_config() {
        let tls = default_tls_config().unwrap();
        let settings = ConnectSettings {
            timeout: Some(Duration::from_secs(2)),
            ..Default::default()
        };
        let _connector = build_https_connector(tls, &settings);
    }
}
