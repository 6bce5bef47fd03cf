//! JSON request/response helpers shared by every handler registered on the
//! `Router`.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub type Body = http_body_util::combinators::UnsyncBoxBody<Bytes, hyper::Error>;

#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("failed to read request body: {0}")]
    Read(String),
    #[error("malformed JSON body: {0}")]
    Malformed(String),
}

/// Read and deserialize a JSON request body. Bounded by `max_body_bytes` to
/// avoid an unbounded allocation from a hostile or buggy client.
pub async fn read_json_body<T: DeserializeOwned>(
    req: Request<Incoming>,
    max_body_bytes: usize,
) -> Result<T, JsonError> {
    let collected = req
        .into_body()
        .collect()
        .await
        .map_err(|e| JsonError::Read(e.to_string()))?;
    let bytes = collected.to_bytes();
    if bytes.len() > max_body_bytes {
        return Err(JsonError::Malformed(format!(
            "body of {} bytes exceeds limit of {max_body_bytes}",
            bytes.len()
        )));
    }
    serde_json::from_slice(&bytes).map_err(|e| JsonError::Malformed(e.to_string()))
}

/// Build a `Response` with a JSON body and the given status code.
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    let bytes = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(boxed(Bytes::from(bytes)))
        .expect("response with valid status and headers never fails to build")
}

/// Build an empty response with the given status code (e.g. 204, 404).
pub fn empty_response(status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(boxed(Bytes::new()))
        .expect("response with valid status never fails to build")
}

/// Build a raw-bytes response (e.g. the Export endpoint's `image/*` body).
pub fn bytes_response(status: StatusCode, content_type: &str, bytes: Vec<u8>) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", content_type)
        .body(boxed(Bytes::from(bytes)))
        .expect("response with valid status and headers never fails to build")
}

fn boxed(bytes: Bytes) -> Body {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}
