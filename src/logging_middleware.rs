// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode.
//! Credential fields are masked before anything is logged.

use axum::body::{to_bytes, Body, Bytes};
use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::{debug, enabled, Level};

use crate::common::redact_secrets;

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(body) = loggable_body(&bytes) {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %body,
            "📥 Request"
        );
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(body) = loggable_body(&bytes) {
        debug!(
            status = %parts.status,
            response_body = %body,
            "📤 Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// Pretty-printed, redacted body; `None` for empty or non-UTF-8 bodies
fn loggable_body(bytes: &Bytes) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let body_str = std::str::from_utf8(bytes).ok()?;

    match serde_json::from_str::<serde_json::Value>(body_str) {
        Ok(mut json) => {
            redact_secrets(&mut json);
            Some(serde_json::to_string_pretty(&json).unwrap_or_else(|_| body_str.to_string()))
        }
        Err(_) => Some(body_str.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loggable_body_redacts_tokens() {
        let bytes = Bytes::from_static(br#"{"id_token":"abcdefghijklmnop"}"#);
        let body = loggable_body(&bytes).unwrap();
        assert!(body.contains("abcd...mnop"));
        assert!(!body.contains("abcdefghijklmnop"));
    }

    #[test]
    fn test_loggable_body_skips_empty() {
        assert!(loggable_body(&Bytes::new()).is_none());
    }
}
