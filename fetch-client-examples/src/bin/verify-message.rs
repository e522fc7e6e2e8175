//! Verify a signed message against a running backend.
//!
//! The backend address comes from `FETCH_API_BASE` (default
//! `http://localhost:3001`). If `AUTH_TOKEN` is set it is sent as a bearer
//! token.
//!
//! Usage:
//!   cargo run --bin verify-message -- "<message>" <signature>

use std::time::Duration;

use fetch_client::{BearerAuth, ClientBuilder, HeaderInterceptor, RequestOptions, verify_signature};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let (Some(message), Some(signature)) = (args.next(), args.next()) else {
        anyhow::bail!("usage: verify-message <message> <signature>");
    };

    let client = ClientBuilder::from_env().build()?;
    tracing::info!(base_url = %client.base_url(), "verifying signature");

    let api = client.scoped(RequestOptions::new().timeout(Duration::from_secs(10)));
    api.add_request(HeaderInterceptor::try_new("x-feature", "MessageSign")?);
    api.add_request(BearerAuth::new(|| std::env::var("AUTH_TOKEN").ok()));

    let verdict = verify_signature(&api, &message, &signature).await?;

    println!("valid:    {}", verdict.is_valid);
    println!("signer:   {}", verdict.signer);
    println!("message:  {}", verdict.original_message);
    Ok(())
}
