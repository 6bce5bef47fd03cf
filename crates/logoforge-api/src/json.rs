//! `{detail, details}` error envelope (spec.md §6) plus the `Retry-After`
//! header attached for rate-limited responses.

use hyper::StatusCode;
use logoforge_http_server::json::Body;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Not serialized into the JSON body; carried through so
    /// `error_response` can set the `Retry-After` header (§6).
    #[serde(skip)]
    pub retry_after_seconds: Option<u64>,
}

pub fn error_response(status: StatusCode, body: ErrorBody) -> hyper::Response<Body> {
    let retry_after = body.retry_after_seconds;
    let mut response = logoforge_http_server::json_response(status, &body);
    if let Some(seconds) = retry_after {
        if let Ok(value) = hyper::header::HeaderValue::from_str(&seconds.to_string()) {
            response.headers_mut().insert("Retry-After", value);
        }
    }
    response
}
