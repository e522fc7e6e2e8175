//! Interceptor Pipeline Demo
//!
//! Runs the client against an embedded server that echoes request headers.
//!
//! Scenarios:
//! 1. Scoped default headers reach the server alongside `Accept`
//! 2. Request interceptors run in registration order
//! 3. Bearer auth picks up a token set after registration
//! 4. A response interceptor substitutes the response
//! 5. `cleanup()` removes only the facade's own interceptors
//! 6. A timeout aborts a slow request
//!
//! Usage:
//!   cargo run --bin interceptors

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use fetch_client::{
    BearerAuth, Body, ClientError, FetchClient, HeaderInterceptor, RequestContext, RequestOptions,
    Response, request_fn, response_fn,
};
use serde_json::Value;
use tokio::net::TcpListener;

// ============================================================================
// Server
// ============================================================================

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let map = headers
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                Value::from(value.to_str().unwrap_or_default()),
            )
        })
        .collect();
    Json(Value::Object(map))
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "slow"
}

async fn run_server() -> anyhow::Result<SocketAddr> {
    let app = Router::new()
        .route("/echo-headers", get(echo_headers))
        .route("/slow", get(slow));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "demo server stopped");
        }
    });
    Ok(addr)
}

fn header<'a>(echoed: &'a Value, name: &str) -> &'a str {
    echoed.get(name).and_then(Value::as_str).unwrap_or("NOT_FOUND")
}

// ============================================================================
// Runner
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Interceptor Pipeline Demo ===");
    println!();

    let addr = run_server().await?;
    let client = FetchClient::builder()
        .base_url(format!("http://{}", addr))
        .build()?;

    let mut passed = 0;
    let mut failed = 0;

    let api = client.scoped(RequestOptions::new().header("x-feature", "MessageSign"));

    // ========================================================================
    // Test 1: Scoped default headers
    // ========================================================================
    println!("Test 1: Scoped default headers...");
    {
        let echoed = api.get("/echo-headers", RequestOptions::new()).await?;
        let echoed = echoed.as_json().cloned().unwrap_or_default();
        if header(&echoed, "x-feature") == "MessageSign"
            && header(&echoed, "accept") == "application/json"
        {
            println!("  PASS: default header and Accept reached the server");
            passed += 1;
        } else {
            println!("  FAIL: unexpected headers: {}", echoed);
            failed += 1;
        }
    }

    // ========================================================================
    // Test 2: Ordered request interceptors
    // ========================================================================
    println!("Test 2: Ordered request interceptors...");
    {
        api.add_request(HeaderInterceptor::new("x-trail", "a"));
        api.add_request(request_fn(|mut ctx: RequestContext| async move {
            let trail = ctx
                .options
                .headers
                .get("x-trail")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_owned();
            let value = format!("{}b", trail)
                .parse()
                .map_err(|_| ClientError::interceptor("bad x-trail value"))?;
            ctx.headers_mut().insert("x-trail", value);
            Ok(ctx)
        }));

        let echoed = api.get("/echo-headers", RequestOptions::new()).await?;
        let echoed = echoed.as_json().cloned().unwrap_or_default();
        if header(&echoed, "x-trail") == "ab" {
            println!("  PASS: interceptors ran in registration order");
            passed += 1;
        } else {
            println!("  FAIL: x-trail = {}", header(&echoed, "x-trail"));
            failed += 1;
        }
    }

    // ========================================================================
    // Test 3: Bearer auth with a late token
    // ========================================================================
    println!("Test 3: Bearer auth with a late token...");
    {
        let token = Arc::new(Mutex::new(None::<String>));
        let source = token.clone();
        api.add_request(BearerAuth::new(move || {
            source.lock().ok().and_then(|t| t.clone())
        }));

        let before = api.get("/echo-headers", RequestOptions::new()).await?;
        if let Ok(mut slot) = token.lock() {
            *slot = Some("demo-token".into());
        }
        let after = api.get("/echo-headers", RequestOptions::new()).await?;

        let before = before.as_json().cloned().unwrap_or_default();
        let after = after.as_json().cloned().unwrap_or_default();
        if header(&before, "authorization") == "NOT_FOUND"
            && header(&after, "authorization") == "Bearer demo-token"
        {
            println!("  PASS: token read on each request");
            passed += 1;
        } else {
            println!(
                "  FAIL: before={}, after={}",
                header(&before, "authorization"),
                header(&after, "authorization")
            );
            failed += 1;
        }
    }

    // ========================================================================
    // Test 4: Response substitution
    // ========================================================================
    println!("Test 4: Response substitution...");
    {
        let substitute = client.add_response_interceptor(response_fn(|_response: Response| async {
            http_response("substituted")
        }));

        let payload = client.get("/echo-headers", RequestOptions::new()).await?;
        substitute.remove();

        if payload.as_text() == Some("substituted") {
            println!("  PASS: response interceptor replaced the response");
            passed += 1;
        } else {
            println!("  FAIL: got {:?}", payload);
            failed += 1;
        }
    }

    // ========================================================================
    // Test 5: Scoped cleanup
    // ========================================================================
    println!("Test 5: Scoped cleanup...");
    {
        let global = client.add_request_interceptor(HeaderInterceptor::new("x-global", "1"));
        let before = client.registry().request_len();
        api.cleanup();
        let after = client.registry().request_len();
        global.remove();

        if before == 4 && after == 1 {
            println!("  PASS: cleanup removed the facade's 3 interceptors only");
            passed += 1;
        } else {
            println!("  FAIL: before={}, after={}", before, after);
            failed += 1;
        }
    }

    // ========================================================================
    // Test 6: Timeout
    // ========================================================================
    println!("Test 6: Timeout...");
    {
        let result = client
            .get("/slow", RequestOptions::new().timeout(Duration::from_millis(100)))
            .await;
        match result {
            Err(e) if e.is_timeout() => {
                println!("  PASS: {}", e);
                passed += 1;
            }
            other => {
                println!("  FAIL: expected timeout, got {:?}", other);
                failed += 1;
            }
        }
    }

    println!();
    println!("Passed: {}, Failed: {}", passed, failed);
    if failed > 0 {
        anyhow::bail!("{} scenario(s) failed", failed);
    }
    Ok(())
}

fn http_response(text: &'static str) -> Result<Response, ClientError> {
    axum::http::Response::builder()
        .header(axum::http::header::CONTENT_TYPE, "text/plain")
        .body(Body::from(text))
        .map_err(|e| ClientError::interceptor(e.to_string()))
}
