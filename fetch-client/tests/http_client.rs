//! End-to-end tests against an embedded axum server.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use fetch_client::{
    BearerAuth, ClientError, FetchClient, HeaderInterceptor, Payload, RequestBody, RequestContext,
    RequestOptions, request_fn, verify_signature,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;

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

async fn echo_body(headers: HeaderMap, body: String) -> Json<Value> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    Json(json!({ "contentType": content_type, "body": body }))
}

async fn missing() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "missing")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "too late"
}

#[derive(Deserialize)]
struct VerifyBody {
    message: String,
    signature: String,
}

async fn verify(Json(body): Json<VerifyBody>) -> Json<Value> {
    Json(json!({
        "isValid": body.signature == "0xvalid",
        "signer": "0x1234",
        "originalMessage": body.message,
    }))
}

async fn spawn_server() -> SocketAddr {
    let app = Router::new()
        .route("/echo-headers", get(echo_headers))
        .route("/echo-body", post(echo_body))
        .route("/json", get(|| async { Json(json!({ "hello": "world" })) }))
        .route("/text", get(|| async { "pong" }))
        .route("/missing", get(missing))
        .route("/slow", get(slow))
        .route("/verify-signature", post(verify));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn client() -> FetchClient {
    let addr = spawn_server().await;
    FetchClient::builder()
        .base_url(format!("http://{}", addr))
        .build()
        .unwrap()
}

#[tokio::test]
async fn decodes_json_and_text() {
    let client = client().await;

    let json = client.get("/json", RequestOptions::new()).await.unwrap();
    assert_eq!(json, Payload::Json(json!({ "hello": "world" })));

    let text = client.get("/text", RequestOptions::new()).await.unwrap();
    assert_eq!(text, Payload::Text("pong".into()));
}

#[tokio::test]
async fn absolute_url_bypasses_base() {
    let addr = spawn_server().await;
    let client = FetchClient::builder()
        .base_url("http://127.0.0.1:1")
        .build()
        .unwrap();

    let payload = client
        .get(&format!("http://{}/text", addr), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(payload.as_text(), Some("pong"));
}

#[tokio::test]
async fn interceptors_shape_outgoing_headers() {
    let client = client().await;
    let api = client.scoped(RequestOptions::new().header("x-feature", "MessageSign"));

    api.add_request(HeaderInterceptor::new("x-first", "1"));
    api.add_request(request_fn(|mut ctx: RequestContext| async move {
        let first = ctx
            .options
            .headers
            .get("x-first")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned();
        ctx.headers_mut()
            .insert("x-second", format!("{}-2", first).parse().unwrap());
        Ok(ctx)
    }));

    let echoed = api.get("/echo-headers", RequestOptions::new()).await.unwrap();
    let echoed = echoed.as_json().unwrap();
    assert_eq!(echoed["accept"], "application/json");
    assert_eq!(echoed["x-feature"], "MessageSign");
    assert_eq!(echoed["x-first"], "1");
    assert_eq!(echoed["x-second"], "1-2");

    api.cleanup();
    let echoed = api.get("/echo-headers", RequestOptions::new()).await.unwrap();
    let echoed = echoed.as_json().unwrap();
    assert!(echoed.get("x-first").is_none());
    assert!(echoed.get("x-second").is_none());
}

#[tokio::test]
async fn bearer_auth_reads_token_per_call() {
    let client = client().await;
    let token = std::sync::Arc::new(std::sync::Mutex::new(None::<String>));
    let source = token.clone();
    client.add_request_interceptor(BearerAuth::new(move || source.lock().unwrap().clone()));

    let echoed = client.get("/echo-headers", RequestOptions::new()).await.unwrap();
    assert!(echoed.as_json().unwrap().get("authorization").is_none());

    *token.lock().unwrap() = Some("abc123".into());
    let echoed = client.get("/echo-headers", RequestOptions::new()).await.unwrap();
    assert_eq!(echoed.as_json().unwrap()["authorization"], "Bearer abc123");
}

#[tokio::test]
async fn post_bodies_default_content_type() {
    let client = client().await;

    let echoed = client
        .post(
            "/echo-body",
            RequestBody::json(&json!({ "name": "A" })).unwrap(),
            RequestOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(
        echoed,
        Payload::Json(json!({ "contentType": "application/json", "body": r#"{"name":"A"}"# }))
    );

    let echoed = client
        .post("/echo-body", RequestBody::from("raw-string"), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(
        echoed,
        Payload::Json(json!({ "contentType": "application/json", "body": "raw-string" }))
    );
}

#[tokio::test]
async fn non_success_status_is_error() {
    let client = client().await;
    let err = client.get("/missing", RequestOptions::new()).await.unwrap_err();

    assert_eq!(err.to_string(), "HTTP 404: missing");
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.body(), Some("missing"));
}

#[tokio::test]
async fn timeout_aborts_slow_request() {
    let client = client().await;
    let started = std::time::Instant::now();

    let err = client
        .get("/slow", RequestOptions::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let client = FetchClient::builder()
        .base_url(format!("http://{}", addr))
        .build()
        .unwrap();

    let err = client.get("/text", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn concurrent_calls_share_client() {
    let client = client().await;

    let calls = (0..8).map(|_| client.get("/json", RequestOptions::new()));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| matches!(r, Ok(Payload::Json(_)))));
}

#[tokio::test]
async fn verify_signature_round_trip() {
    let client = client().await;
    let api = client.scoped(RequestOptions::new());

    let verdict = verify_signature(&api, "hello", "0xvalid").await.unwrap();
    assert!(verdict.is_valid);
    assert_eq!(verdict.signer, "0x1234");
    assert_eq!(verdict.original_message, "hello");

    let verdict = verify_signature(&api, "hello", "0xforged").await.unwrap();
    assert!(!verdict.is_valid);
}
