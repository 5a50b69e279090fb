/// Error envelope enforcement
///
/// Handlers already render their failures as JSON:API error documents. This
/// module covers the responses that never pass through a handler's error
/// path: rejections produced by axum itself (unknown method, oversized body)
/// and panics. Both are turned into the same single-entry error document.

use std::any::Any;

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{ApiError, Failure};
use crate::response::is_jsonapi;

/// Largest error body read back when rewriting a response
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Rewrites error responses that are not JSON:API documents
pub async fn error_envelope(request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    let status = response.status();

    if !(status.is_client_error() || status.is_server_error()) || is_jsonapi(&response) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let text = body_text(body).await;

    let mut rewritten = envelope_for(status, text);
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rewritten.headers_mut().append(name.clone(), value.clone());
        }
    }
    rewritten
}

async fn body_text(body: Body) -> Option<String> {
    let bytes = to_bytes(body, MAX_ERROR_BODY).await.ok()?;
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}

fn envelope_for(status: StatusCode, text: Option<String>) -> Response {
    let failure = Failure {
        detail: text.clone(),
        ..Failure::default()
    };

    match status {
        StatusCode::NOT_FOUND => ApiError::NotFound(failure).into_response(),
        StatusCode::BAD_REQUEST => ApiError::Validation(failure).into_response(),
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(failure).into_response(),
        StatusCode::FORBIDDEN => ApiError::Forbidden(failure).into_response(),
        StatusCode::INTERNAL_SERVER_ERROR => ApiError::Internal(
            text.unwrap_or_else(|| "Internal server error".to_string()),
        )
        .into_response(),
        other => ApiError::Rejected(other, failure).into_response(),
    }
}

/// Renders a caught panic as an internal error
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Handler panicked".to_string()
    };

    ApiError::Internal(message).into_response()
}
