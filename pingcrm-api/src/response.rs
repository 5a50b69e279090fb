/// JSON:API response bodies
///
/// Every body leaving the API, success or error, is serialized through
/// [`JsonApi`] so it carries the `application/vnd.api+json` content type.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use pingcrm_shared::jsonapi::MEDIA_TYPE;
use serde::Serialize;

/// A serializable document sent with the JSON:API media type
#[derive(Debug, Clone)]
pub struct JsonApi<T>(pub T);

impl<T: Serialize> IntoResponse for JsonApi<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => (
                [(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE))],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response document");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Whether a response already carries a JSON:API document
pub fn is_jsonapi(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with(MEDIA_TYPE))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sets_media_type() {
        let response = JsonApi(json!({ "data": [] })).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(is_jsonapi(&response));
    }

    #[test]
    fn test_plain_responses_are_not_jsonapi() {
        let response = (StatusCode::BAD_REQUEST, "bad").into_response();
        assert!(!is_jsonapi(&response));
    }
}
