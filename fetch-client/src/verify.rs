//! Remote signature verification.
//!
//! Signing and verification happen elsewhere; this module only talks to the
//! verification service.

use serde::{Deserialize, Serialize};
use tower_service::Service;

use crate::ClientError;
use crate::config::RequestOptions;
use crate::scoped::ScopedClient;
use crate::transport::Body;

/// Path of the verification endpoint, relative to the base URL.
pub const VERIFY_SIGNATURE_PATH: &str = "/verify-signature";

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    message: &'a str,
    signature: &'a str,
}

/// The verification service's verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether `signature` is a valid signature of the message.
    pub is_valid: bool,
    /// Address that produced the signature.
    pub signer: String,
    /// The message as the service received it.
    pub original_message: String,
}

/// Ask the verification service whether `signature` signs `message`.
///
/// The call goes through `client`, so its default options and every
/// registered interceptor apply.
pub async fn verify_signature<S>(
    client: &ScopedClient<S>,
    message: &str,
    signature: &str,
) -> Result<VerifyResponse, ClientError>
where
    S: Service<http::Request<Body>, Response = http::Response<Body>, Error = ClientError>
        + Clone
        + Send
        + Sync
        + 'static,
    S::Future: Send,
{
    let body = VerifyRequest { message, signature };
    client
        .post_json(VERIFY_SIGNATURE_PATH, &body, RequestOptions::new())
        .await
}
