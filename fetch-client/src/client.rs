//! The core request executor.
//!
//! [`FetchClient`] turns a method, path, optional body and [`RequestOptions`]
//! into a decoded [`Payload`]. Every call goes through the same steps:
//!
//! 1. resolve the URL against the base
//! 2. merge headers over `Accept: application/json`
//! 3. encode the body and default `Content-Type`
//! 4. run the request-interceptor chain
//! 5. send through the transport under a per-call cancellation token
//! 6. run the response-interceptor chain
//! 7. turn non-2xx statuses into [`ClientError::Http`]
//! 8. decode the body by content type

use std::future::Future;

use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use http::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use tower_service::Service;

#[cfg(feature = "tracing")]
use tracing::{Instrument, info_span};

use crate::builder::ClientBuilder;
use crate::config::{RequestInterceptor, RequestOptions, ResponseInterceptor};
use crate::registry::{InterceptorRegistry, RemoveHandle};
use crate::request::{RequestBody, RequestContext, RequestInit, resolve_url};
use crate::response::{Payload, Response};
use crate::scoped::ScopedClient;
use crate::transport::{Body, HyperTransport};
use crate::ClientError;

/// HTTP client with shared interceptor chains.
///
/// Cloning is cheap: clones share the transport's connection pool and the
/// interceptor registry.
///
/// The transport `S` is any
/// `Service<http::Request<Body>, Response = http::Response<Body>, Error = ClientError>`;
/// [`HyperTransport`] by default.
///
/// # Example
///
/// ```ignore
/// use fetch_client::{FetchClient, RequestBody, RequestOptions};
/// use std::time::Duration;
///
/// let client = FetchClient::builder().base_url("http://localhost:3001").build()?;
///
/// let health = client.get("/health", RequestOptions::new()).await?;
/// let created = client
///     .post(
///         "/users",
///         RequestBody::json(&serde_json::json!({ "name": "A" }))?,
///         RequestOptions::new().timeout(Duration::from_secs(5)),
///     )
///     .await?;
/// ```
#[derive(Clone)]
pub struct FetchClient<S = HyperTransport> {
    transport: S,
    base_url: String,
    registry: InterceptorRegistry,
}

impl<S> std::fmt::Debug for FetchClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("base_url", &self.base_url)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl FetchClient {
    /// Create a new [`ClientBuilder`].
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }
}

impl<S> FetchClient<S> {
    pub(crate) fn from_parts(
        transport: S,
        base_url: String,
        registry: InterceptorRegistry,
    ) -> Self {
        Self {
            transport,
            base_url,
            registry,
        }
    }

    /// The default base URL for relative paths.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The interceptor registry shared by this client and its scoped facades.
    pub fn registry(&self) -> &InterceptorRegistry {
        &self.registry
    }

    /// Append a request interceptor to the shared chain.
    pub fn add_request_interceptor<I: RequestInterceptor>(&self, interceptor: I) -> RemoveHandle {
        self.registry.add_request_interceptor(interceptor)
    }

    /// Append a response interceptor to the shared chain.
    pub fn add_response_interceptor<I: ResponseInterceptor>(&self, interceptor: I) -> RemoveHandle {
        self.registry.add_response_interceptor(interceptor)
    }
}

impl<S> FetchClient<S>
where
    S: Service<http::Request<Body>, Response = http::Response<Body>, Error = ClientError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    /// Create a facade that merges `defaults` into every call and removes the
    /// interceptors it registers when dropped.
    pub fn scoped(&self, defaults: RequestOptions) -> ScopedClient<S> {
        ScopedClient::new(self.clone(), defaults)
    }

    /// Send a `GET` request.
    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Payload, ClientError> {
        self.request(Method::GET, path, None, options).await
    }

    /// Send a `POST` request with an optional body.
    pub async fn post(
        &self,
        path: &str,
        body: impl Into<Option<RequestBody>>,
        options: RequestOptions,
    ) -> Result<Payload, ClientError> {
        self.request(Method::POST, path, body.into(), options).await
    }

    /// Send a `GET` request and deserialize the response into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ClientError> {
        self.get(path, options).await?.into_json()
    }

    /// Serialize `body` as JSON, `POST` it, and deserialize the response into `T`.
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
        let body = RequestBody::json(body)?;
        self.post(path, body, options).await?.into_json()
    }

    /// Send a request and decode the response.
    ///
    /// `GET` never carries a body; a body passed with it is ignored. Nothing
    /// is retried: every failure is returned to the caller.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload, ClientError> {
        let base = options
            .base_url
            .as_deref()
            .filter(|base| !base.is_empty())
            .unwrap_or(&self.base_url);
        let url = resolve_url(base, path);

        #[cfg(feature = "tracing")]
        let span = info_span!(
            "http.request",
            http.method = %method,
            url.full = %url,
            otel.kind = "client",
        );

        let call = self.execute(method, url, body, options);
        #[cfg(feature = "tracing")]
        let call = call.instrument(span);
        call.await
    }

    async fn execute(
        &self,
        method: Method,
        url: String,
        body: Option<RequestBody>,
        options: RequestOptions,
    ) -> Result<Payload, ClientError> {
        let RequestOptions {
            timeout,
            headers,
            signal,
            ..
        } = options;

        let mut init = RequestInit::new(method);
        init.signal = signal;
        init.headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(headers) = headers {
            init.headers.extend(headers);
        }

        if let Some(body) = body.filter(|_| init.method != Method::GET) {
            init.body = Some(body.into_bytes()?);
            if !init.headers.contains_key(CONTENT_TYPE) {
                init.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
        }

        let mut ctx = RequestContext::new(url, init);
        let request_chain = self.registry.request_chain();
        #[cfg(feature = "tracing")]
        tracing::debug!(interceptors = request_chain.len(), "running request interceptors");
        for interceptor in request_chain {
            ctx = interceptor.intercept_request(ctx).await?;
        }

        let token = match &ctx.options.signal {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        // A timeout too large to represent means no deadline.
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));

        let mut request = ctx.into_http()?;
        request.extensions_mut().insert(token.clone());

        let result = guard(&token, deadline, self.exchange(request)).await;
        #[cfg(feature = "tracing")]
        if let Err(ClientError::Timeout) = &result {
            tracing::warn!(timeout = ?timeout, "request timed out");
        }
        result
    }

    /// Send the request and process the response. Runs under the call's guard.
    async fn exchange(&self, request: http::Request<Body>) -> Result<Payload, ClientError> {
        let mut response: Response = self.transport.clone().oneshot(request).await?;

        for interceptor in self.registry.response_chain() {
            response = interceptor.intercept_response(response).await?;
        }

        let (parts, body) = response.into_parts();
        #[cfg(feature = "tracing")]
        tracing::debug!(status = parts.status.as_u16(), "response received");

        if !parts.status.is_success() {
            let text = body.text().await.unwrap_or_default();
            return Err(ClientError::http(parts.status, text));
        }

        let bytes = body.bytes().await?;
        Payload::decode(&parts.headers, &bytes)
    }
}

/// Race `fut` against the call's cancellation token and optional deadline.
///
/// Reaching the deadline cancels `token`, so a transport watching the token
/// stops too. The timer is dropped with this future.
async fn guard<F, T>(
    token: &CancellationToken,
    deadline: Option<Instant>,
    fut: F,
) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, ClientError>>,
{
    let timer = async {
        match deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        result = fut => result,
        _ = token.cancelled() => Err(ClientError::Canceled),
        _ = timer => {
            token.cancel();
            Err(ClientError::Timeout)
        }
    }
}
