//! Per-consumer client facade.
//!
//! A [`ScopedClient`] wraps a [`FetchClient`] with default options and keeps
//! track of the interceptors it registers, so one consumer can tear down its
//! own interceptors without touching anyone else's.

use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_service::Service;

use crate::client::FetchClient;
use crate::config::{RequestInterceptor, RequestOptions, ResponseInterceptor};
use crate::registry::RemoveHandle;
use crate::request::RequestBody;
use crate::response::Payload;
use crate::transport::{Body, HyperTransport};
use crate::ClientError;

/// A facade over a shared [`FetchClient`] with its own default options.
///
/// Calls merge their options over the facade's defaults field by field, with
/// call-level values winning. Interceptors added through the facade go into
/// the client's shared registry and are removed by
/// [`cleanup`](ScopedClient::cleanup) or when the facade is dropped.
///
/// # Example
///
/// ```ignore
/// use fetch_client::{HeaderInterceptor, RequestOptions};
///
/// let api = client.scoped(RequestOptions::new().header("x-feature", "MessageSign"));
/// api.add_request(HeaderInterceptor::new("x-trace", "1"));
///
/// let health = api.get("/health", RequestOptions::new()).await?;
/// drop(api); // removes the x-trace interceptor
/// ```
pub struct ScopedClient<S = HyperTransport> {
    client: FetchClient<S>,
    defaults: RequestOptions,
    request_handles: Mutex<Vec<RemoveHandle>>,
    response_handles: Mutex<Vec<RemoveHandle>>,
}

impl<S> std::fmt::Debug for ScopedClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedClient")
            .field("client", &self.client)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

impl<S> ScopedClient<S> {
    /// The default options merged into every call.
    pub fn defaults(&self) -> &RequestOptions {
        &self.defaults
    }

    /// The underlying shared client.
    pub fn client(&self) -> &FetchClient<S> {
        &self.client
    }

    /// Register a request interceptor in the shared registry and remember it
    /// for [`cleanup`](Self::cleanup).
    pub fn add_request<I: RequestInterceptor>(&self, interceptor: I) -> RemoveHandle {
        let handle = self.client.add_request_interceptor(interceptor);
        lock(&self.request_handles).push(handle.clone());
        handle
    }

    /// Register a response interceptor in the shared registry and remember it
    /// for [`cleanup`](Self::cleanup).
    pub fn add_response<I: ResponseInterceptor>(&self, interceptor: I) -> RemoveHandle {
        let handle = self.client.add_response_interceptor(interceptor);
        lock(&self.response_handles).push(handle.clone());
        handle
    }

    /// Remove every interceptor this facade registered.
    ///
    /// Each remembered handle is invoked once and forgotten; calling this
    /// again does nothing until new interceptors are added.
    pub fn cleanup(&self) {
        let request = std::mem::take(&mut *lock(&self.request_handles));
        let response = std::mem::take(&mut *lock(&self.response_handles));

        #[cfg(feature = "tracing")]
        if !request.is_empty() || !response.is_empty() {
            tracing::debug!(
                request = request.len(),
                response = response.len(),
                "removing scoped interceptors"
            );
        }

        for handle in request.iter().chain(response.iter()) {
            handle.remove();
        }
    }
}

impl<S> ScopedClient<S>
where
    S: Service<http::Request<Body>, Response = http::Response<Body>, Error = ClientError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    pub(crate) fn new(client: FetchClient<S>, defaults: RequestOptions) -> Self {
        Self {
            client,
            defaults,
            request_handles: Mutex::default(),
            response_handles: Mutex::default(),
        }
    }

    /// Send a `GET` request with `options` merged over the defaults.
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Payload, ClientError> {
        self.client.get(path, options.merged_over(&self.defaults)).await
    }

    /// Send a `POST` request with `options` merged over the defaults.
    pub async fn post(
        &self,
        path: &str,
        body: impl Into<Option<RequestBody>>,
        options: RequestOptions,
    ) -> Result<Payload, ClientError> {
        self.client
            .post(path, body, options.merged_over(&self.defaults))
            .await
    }

    /// Typed variant of [`get`](Self::get).
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.client
            .get_json(path, options.merged_over(&self.defaults))
            .await
    }

    /// Typed variant of [`post`](Self::post).
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        options: RequestOptions,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.client
            .post_json(path, body, options.merged_over(&self.defaults))
            .await
    }
}

impl<S> Drop for ScopedClient<S> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn lock(handles: &Mutex<Vec<RemoveHandle>>) -> std::sync::MutexGuard<'_, Vec<RemoveHandle>> {
    handles.lock().unwrap_or_else(PoisonError::into_inner)
}
