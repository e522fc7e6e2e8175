//! Request and response interceptors.
//!
//! Interceptors add cross-cutting logic to every call made through a
//! [`FetchClient`](crate::FetchClient), such as:
//! - Adding authentication headers
//! - Rewriting URLs
//! - Substituting or inspecting responses
//!
//! Request interceptors receive the [`RequestContext`] and return the context
//! the next interceptor sees. Response interceptors do the same with the
//! [`Response`]. Returning an error aborts the call.
//!
//! # Example
//!
//! ```ignore
//! use fetch_client::{BearerAuth, FetchClient, HeaderInterceptor, request_fn};
//!
//! let client = FetchClient::builder().base_url("http://localhost:3001").build()?;
//!
//! client.add_request_interceptor(HeaderInterceptor::new("x-feature", "MessageSign"));
//! client.add_request_interceptor(BearerAuth::new(|| std::env::var("AUTH_TOKEN").ok()));
//! client.add_request_interceptor(request_fn(|mut ctx| async move {
//!     ctx.url = ctx.url.replace("/v1/", "/v2/");
//!     Ok(ctx)
//! }));
//! ```

use std::future::Future;
use std::pin::Pin;

use http::header::{self, HeaderName, HeaderValue};

use crate::ClientError;
use crate::request::RequestContext;
use crate::response::Response;

/// Type alias for a boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Intercept Traits
// ============================================================================

/// Transforms a request before it is sent.
pub trait RequestInterceptor: Send + Sync + 'static {
    /// Receive the current context and return the context for the next step.
    fn intercept_request(
        &self,
        ctx: RequestContext,
    ) -> BoxFuture<'_, Result<RequestContext, ClientError>>;
}

/// Transforms a response before it is decoded.
pub trait ResponseInterceptor: Send + Sync + 'static {
    /// Receive the current response and return the response for the next step.
    ///
    /// The returned response may be an entirely different one.
    fn intercept_response(
        &self,
        response: Response,
    ) -> BoxFuture<'_, Result<Response, ClientError>>;
}

/// The unit type passes requests through unchanged.
impl RequestInterceptor for () {
    fn intercept_request(
        &self,
        ctx: RequestContext,
    ) -> BoxFuture<'_, Result<RequestContext, ClientError>> {
        Box::pin(std::future::ready(Ok(ctx)))
    }
}

/// The unit type passes responses through unchanged.
impl ResponseInterceptor for () {
    fn intercept_response(
        &self,
        response: Response,
    ) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin(std::future::ready(Ok(response)))
    }
}

// ============================================================================
// Closure Interceptors
// ============================================================================

/// A request interceptor built from an async closure. See [`request_fn`].
#[derive(Clone)]
pub struct RequestFn<F> {
    func: F,
}

/// Adapt an async closure into a [`RequestInterceptor`].
pub fn request_fn<F, Fut>(func: F) -> RequestFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestContext, ClientError>> + Send + 'static,
{
    RequestFn { func }
}

impl<F, Fut> RequestInterceptor for RequestFn<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<RequestContext, ClientError>> + Send + 'static,
{
    fn intercept_request(
        &self,
        ctx: RequestContext,
    ) -> BoxFuture<'_, Result<RequestContext, ClientError>> {
        Box::pin((self.func)(ctx))
    }
}

impl<F> std::fmt::Debug for RequestFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestFn").finish()
    }
}

/// A response interceptor built from an async closure. See [`response_fn`].
#[derive(Clone)]
pub struct ResponseFn<F> {
    func: F,
}

/// Adapt an async closure into a [`ResponseInterceptor`].
pub fn response_fn<F, Fut>(func: F) -> ResponseFn<F>
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ClientError>> + Send + 'static,
{
    ResponseFn { func }
}

impl<F, Fut> ResponseInterceptor for ResponseFn<F>
where
    F: Fn(Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, ClientError>> + Send + 'static,
{
    fn intercept_response(
        &self,
        response: Response,
    ) -> BoxFuture<'_, Result<Response, ClientError>> {
        Box::pin((self.func)(response))
    }
}

impl<F> std::fmt::Debug for ResponseFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFn").finish()
    }
}

// ============================================================================
// Header Interceptor
// ============================================================================

/// A simple interceptor that sets one header on all requests.
///
/// An existing value for the same header is replaced.
///
/// # Example
///
/// ```ignore
/// use fetch_client::HeaderInterceptor;
///
/// client.add_request_interceptor(HeaderInterceptor::new("x-feature", "MessageSign"));
/// ```
#[derive(Clone, Debug)]
pub struct HeaderInterceptor {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderInterceptor {
    /// Create a new header interceptor.
    ///
    /// # Panics
    ///
    /// Panics if the header name or value is invalid.
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.parse().expect("invalid header name"),
            value: value.parse().expect("invalid header value"),
        }
    }

    /// Try to create a new header interceptor, returning an error if invalid.
    pub fn try_new(name: &str, value: &str) -> Result<Self, ClientError> {
        let name = name
            .parse()
            .map_err(|_| ClientError::InvalidRequest(format!("invalid header name: {}", name)))?;
        let value = value
            .parse()
            .map_err(|_| ClientError::InvalidRequest(format!("invalid header value: {}", value)))?;
        Ok(Self { name, value })
    }

    /// Create a new header interceptor from pre-parsed values.
    pub fn from_parts(name: HeaderName, value: HeaderValue) -> Self {
        Self { name, value }
    }
}

impl RequestInterceptor for HeaderInterceptor {
    fn intercept_request(
        &self,
        mut ctx: RequestContext,
    ) -> BoxFuture<'_, Result<RequestContext, ClientError>> {
        ctx.headers_mut().insert(self.name.clone(), self.value.clone());
        Box::pin(std::future::ready(Ok(ctx)))
    }
}

// ============================================================================
// Bearer Auth Interceptor
// ============================================================================

/// Somewhere a bearer token can be read from at request time.
pub trait TokenSource: Send + Sync + 'static {
    /// The current token, or `None` when the user is not signed in.
    fn token(&self) -> Option<String>;
}

impl<F> TokenSource for F
where
    F: Fn() -> Option<String> + Send + Sync + 'static,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// Sets `Authorization: Bearer <token>` when a token is available.
///
/// The token is looked up on every request. A present token overwrites any
/// existing `Authorization` header; without a token the request passes
/// through untouched.
pub struct BearerAuth<T> {
    source: T,
}

impl<T: TokenSource> BearerAuth<T> {
    /// Create an auth interceptor reading from `source`.
    pub fn new(source: T) -> Self {
        Self { source }
    }
}

impl<T> std::fmt::Debug for BearerAuth<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth").finish_non_exhaustive()
    }
}

impl<T: TokenSource> RequestInterceptor for BearerAuth<T> {
    fn intercept_request(
        &self,
        mut ctx: RequestContext,
    ) -> BoxFuture<'_, Result<RequestContext, ClientError>> {
        let result = match self.source.token() {
            Some(token) => HeaderValue::try_from(format!("Bearer {}", token))
                .map(|value| {
                    ctx.headers_mut().insert(header::AUTHORIZATION, value);
                    ctx
                })
                .map_err(|_| ClientError::interceptor("auth token is not a valid header value")),
            None => Ok(ctx),
        };
        Box::pin(std::future::ready(result))
    }
}
