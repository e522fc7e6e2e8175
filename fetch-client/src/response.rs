//! Response decoding.
//!
//! Successful responses are decoded by `Content-Type`: anything declaring
//! `application/json` becomes [`Payload::Json`], everything else
//! [`Payload::Text`].

use bytes::Bytes;
use http::{HeaderMap, header};
use serde::de::DeserializeOwned;

use crate::ClientError;
use crate::transport::Body;

/// The response type threaded through response interceptors.
pub type Response = http::Response<Body>;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Parsed JSON value.
    Json(serde_json::Value),
    /// Raw text.
    Text(String),
}

impl Payload {
    /// Decode `bytes` according to the `Content-Type` in `headers`.
    pub fn decode(headers: &HeaderMap, bytes: &Bytes) -> Result<Self, ClientError> {
        if is_json(headers) {
            Ok(Payload::Json(serde_json::from_slice(bytes)?))
        } else {
            Ok(Payload::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
    }

    /// Deserialize the payload into `T`.
    ///
    /// A text payload is parsed as JSON, so endpoints that mislabel their
    /// content type still decode.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        match self {
            Payload::Json(value) => Ok(serde_json::from_value(value)?),
            Payload::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }

    /// The JSON value, if this is a JSON payload.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::Text(_) => None,
        }
    }

    /// The text, if this is a text payload.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Json(_) => None,
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
        headers
    }

    #[test]
    fn test_json_content_type_parses() {
        let payload = Payload::decode(
            &headers("application/json; charset=utf-8"),
            &Bytes::from_static(br#"{"hello":"world"}"#),
        )
        .unwrap();
        assert_eq!(payload, Payload::Json(serde_json::json!({"hello": "world"})));
    }

    #[test]
    fn test_other_content_type_is_text() {
        let payload =
            Payload::decode(&headers("text/plain"), &Bytes::from_static(b"plain")).unwrap();
        assert_eq!(payload.as_text(), Some("plain"));

        let payload = Payload::decode(&HeaderMap::new(), &Bytes::from_static(b"{}")).unwrap();
        assert_eq!(payload.as_text(), Some("{}"));
    }

    #[test]
    fn test_malformed_json_is_decode_error() {
        let err = Payload::decode(&headers("application/json"), &Bytes::from_static(b"{nope"))
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_into_json() {
        #[derive(Deserialize)]
        struct Greeting {
            hello: String,
        }

        let greeting: Greeting = Payload::Json(serde_json::json!({"hello": "world"}))
            .into_json()
            .unwrap();
        assert_eq!(greeting.hello, "world");

        let greeting: Greeting = Payload::Text(r#"{"hello":"text"}"#.into())
            .into_json()
            .unwrap();
        assert_eq!(greeting.hello, "text");
    }
}
