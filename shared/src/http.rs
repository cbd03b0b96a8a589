//! HTTP helpers and the error reporter.

use lambda_http::{Body, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::{Error, Result};

/// Create a JSON response with the given status code and data.
pub fn json_response<T: Serialize>(status: u16, data: &T) -> Result<Response<Body>> {
    let body = serde_json::to_string(data)?;
    build(status, Body::from(body))
}

/// Create a JSON response with no body, e.g. 204.
pub fn empty_response(status: u16) -> Result<Response<Body>> {
    build(status, Body::Empty)
}

fn build(status: u16, body: Body) -> Result<Response<Body>> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(body)
        .map_err(|e| Error::Internal(format!("Failed to build response: {}", e)))
}

/// Parse request body as JSON. Malformed JSON, missing fields, unknown fields
/// and bad enum values are all validation errors.
pub fn parse_json_body<T: DeserializeOwned>(body: &Body) -> Result<T> {
    if body.is_empty() {
        return Err(Error::validation("Request body is empty"));
    }
    serde_json::from_slice(body.as_ref())
        .map_err(|e| Error::validation(format!("Invalid request body: {}", e)))
}

/// `{"error": {"kind", "message", "details"?}}`
pub fn error_body(err: &Error) -> Value {
    let mut body = json!({
        "kind": err.kind(),
        "message": err.to_string(),
    });
    if let Some(details) = err.details() {
        body["details"] = details.clone();
    }
    json!({ "error": body })
}

/// Report an error: log at a severity matching its kind and write the
/// error body exactly once.
pub fn error_response(err: &Error) -> std::result::Result<Response<Body>, lambda_http::Error> {
    let status = err.status_code();
    if err.is_client_error() {
        info!(status, kind = err.kind(), "Request rejected: {}", err);
    } else {
        error!(status, kind = err.kind(), "Request failed: {}", err);
    }

    let body = serde_json::to_string(&error_body(err))?;
    Ok(Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))?)
}
