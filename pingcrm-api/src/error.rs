/// Error handling for the API server
///
/// Every failure is an [`ApiError`]. Handlers return `ApiResult<T>` and never
/// build error bodies themselves; the conversion to a JSON:API error document
/// happens once, in the `IntoResponse` impl below.
///
/// | Variant        | Status | Default title        |
/// |----------------|--------|----------------------|
/// | `NotFound`     | 404    | Resource not found   |
/// | `Validation`   | 400    | Validation error     |
/// | `Unauthorized` | 401    | Unauthorized         |
/// | `Forbidden`    | 403    | Forbidden            |
/// | `Rejected`     | any    | status reason phrase |
/// | `Internal`     | 500    | the error text       |
///
/// # Example
///
/// ```
/// use pingcrm_api::error::{ApiError, ApiResult, Failure};
///
/// fn check(name: &str) -> ApiResult<()> {
///     if name.is_empty() {
///         return Err(ApiError::Validation(
///             Failure::titled("Name must not be empty").pointer("/data/attributes/name"),
///         ));
///     }
///     Ok(())
/// }
/// ```

use std::collections::BTreeMap;
use std::fmt;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pingcrm_shared::{
    jsonapi::{ErrorDocument, ErrorObject, ErrorSource, SerializeError},
    models::{user::USERS_EMAIL_KEY, ResourceKind},
    password::PasswordError,
    store::StoreError,
};
use serde_json::{json, Value};

use crate::response::JsonApi;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Title used when a user email is already taken
pub const DUPLICATE_EMAIL_TITLE: &str = "The user with this email already exists in the system.";

/// Optional members of an error entry
///
/// Any member left unset is omitted from the rendered document; an unset
/// title falls back to the variant's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Failure {
    pub title: Option<String>,
    pub detail: Option<String>,
    pub code: Option<String>,
    pub source: Option<ErrorSource>,
    pub meta: Option<Value>,
}

impl Failure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure with an explicit title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// JSON pointer into the request document
    pub fn pointer(mut self, pointer: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: Some(pointer.into()),
            parameter: None,
        });
        self
    }

    /// Name of the offending URL or query parameter
    pub fn parameter(mut self, parameter: impl Into<String>) -> Self {
        self.source = Some(ErrorSource {
            pointer: None,
            parameter: Some(parameter.into()),
        });
        self
    }

    pub fn meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Not found (404)
    NotFound(Failure),

    /// Invalid input or violated constraint (400)
    Validation(Failure),

    /// Unauthorized (401)
    Unauthorized(Failure),

    /// Forbidden (403)
    Forbidden(Failure),

    /// Request refused with any other status, such as an oversized body or
    /// an unsupported method
    Rejected(StatusCode, Failure),

    /// Internal server error (500), rendered with its text as title
    Internal(String),
}

impl ApiError {
    /// `<Entity> not found`
    pub fn resource_not_found(kind: ResourceKind) -> Self {
        ApiError::NotFound(Failure::titled(format!("{} not found", kind.label())))
    }

    /// Validation failure with only a title
    pub fn validation(title: impl Into<String>) -> Self {
        ApiError::Validation(Failure::titled(title))
    }

    /// Maps a store failure raised while deleting
    ///
    /// A foreign key violation here means other records still reference the
    /// one being deleted.
    pub fn from_delete(err: StoreError) -> Self {
        match err {
            StoreError::ForeignKeyViolation { constraint } => ApiError::Validation(
                Failure::titled("The resource still has dependent records")
                    .detail(format!(
                        "Delete the records referencing it first ({})",
                        constraint
                    ))
                    .code("dependent_records"),
            ),
            other => other.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Rejected(status, _) => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn default_title(&self) -> &'static str {
        match self {
            ApiError::Rejected(status, _) => status.canonical_reason().unwrap_or("Request failed"),
            ApiError::NotFound(_) => "Resource not found",
            ApiError::Validation(_) => "Validation error",
            ApiError::Unauthorized(_) => "Unauthorized",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::Internal(_) => "Internal server error",
        }
    }

    /// The single entry of the rendered error document
    pub fn to_error_object(&self) -> ErrorObject {
        let status = self.status().as_u16().to_string();

        match self {
            ApiError::Internal(message) => ErrorObject {
                status,
                code: None,
                title: message.clone(),
                detail: None,
                source: None,
                meta: None,
            },
            ApiError::NotFound(failure)
            | ApiError::Validation(failure)
            | ApiError::Unauthorized(failure)
            | ApiError::Forbidden(failure)
            | ApiError::Rejected(_, failure) => ErrorObject {
                status,
                code: failure.code.clone(),
                title: failure
                    .title
                    .clone()
                    .unwrap_or_else(|| self.default_title().to_string()),
                detail: failure.detail.clone(),
                source: failure.source.clone(),
                meta: failure.meta.clone(),
            },
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.to_error_object().title;
        match self {
            ApiError::NotFound(_) => write!(f, "Not found: {}", title),
            ApiError::Validation(_) => write!(f, "Validation failed: {}", title),
            ApiError::Unauthorized(_) => write!(f, "Unauthorized: {}", title),
            ApiError::Forbidden(_) => write!(f, "Forbidden: {}", title),
            ApiError::Rejected(status, _) => write!(f, "Rejected ({}): {}", status.as_u16(), title),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(msg) = &self {
            tracing::error!("Internal error: {}", msg);
        }

        let status = self.status();
        let document = ErrorDocument::single(self.to_error_object());
        (status, JsonApi(document)).into_response()
    }
}

/// Attribute behind a foreign key constraint name
fn referenced_field(constraint: &str) -> Option<&'static str> {
    if constraint.ends_with("_organization_id_fkey") {
        Some("organization_id")
    } else if constraint.ends_with("_account_id_fkey") {
        Some("account_id")
    } else {
        None
    }
}

/// Convert store errors to API errors
///
/// Constraint violations are client errors; everything else is internal.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { constraint } if constraint == USERS_EMAIL_KEY => {
                ApiError::Validation(
                    Failure::titled(DUPLICATE_EMAIL_TITLE)
                        .code("duplicate")
                        .pointer("/data/attributes/email"),
                )
            }
            StoreError::UniqueViolation { constraint } => ApiError::Validation(
                Failure::titled("A record with this value already exists")
                    .detail(constraint)
                    .code("duplicate"),
            ),
            StoreError::ForeignKeyViolation { constraint } => {
                let mut failure = Failure::titled("Referenced resource does not exist")
                    .detail(constraint.clone())
                    .code("invalid_reference");
                if let Some(field) = referenced_field(&constraint) {
                    failure = failure.pointer(format!("/data/attributes/{}", field));
                }
                ApiError::Validation(failure)
            }
            StoreError::Database(e) => ApiError::Internal(format!("Database error: {}", e)),
        }
    }
}

impl From<SerializeError> for ApiError {
    fn from(err: SerializeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {}", err))
    }
}

/// Convert body rejections to API errors
///
/// Unparseable documents are validation failures; transport-level refusals
/// such as an oversized body keep their own status.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ApiError::Validation(
                Failure::titled("Invalid request document")
                    .detail(rejection.body_text())
                    .code("invalid_document")
                    .pointer("/data"),
            ),
            status => ApiError::Rejected(status, Failure::new().detail(rejection.body_text())),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(
            Failure::titled("Invalid path parameter")
                .detail(rejection.body_text())
                .code("invalid_parameter")
                .parameter("id"),
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(
            Failure::titled("Invalid query parameter")
                .detail(rejection.body_text())
                .code("invalid_parameter"),
        )
    }
}

/// Convert attribute validation failures to API errors
///
/// The first failing field (alphabetically) supplies the title and pointer;
/// every field's messages are listed under `meta.fields`.
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields: BTreeMap<String, Vec<String>> = errors
            .field_errors()
            .iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| {
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("failed `{}` check", error.code))
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        let Some((field, messages)) = fields.iter().next() else {
            return ApiError::validation("Validation error");
        };

        let title = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "Validation error".to_string());

        ApiError::Validation(
            Failure::titled(title)
                .code("invalid_attribute")
                .pointer(format!("/data/attributes/{}", field))
                .meta(json!({ "fields": fields })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_titles() {
        let cases = [
            (ApiError::NotFound(Failure::new()), "Resource not found", "404"),
            (ApiError::Validation(Failure::new()), "Validation error", "400"),
            (ApiError::Unauthorized(Failure::new()), "Unauthorized", "401"),
            (ApiError::Forbidden(Failure::new()), "Forbidden", "403"),
        ];

        for (err, title, status) in cases {
            let object = err.to_error_object();
            assert_eq!(object.title, title);
            assert_eq!(object.status, status);
        }
    }

    #[test]
    fn test_title_override() {
        let err = ApiError::resource_not_found(ResourceKind::Contacts);
        assert_eq!(err.to_error_object().title, "Contact not found");
        assert_eq!(err.to_string(), "Not found: Contact not found");
    }

    #[test]
    fn test_internal_uses_text_as_title() {
        let object = ApiError::Internal("boom".to_string()).to_error_object();

        assert_eq!(object.status, "500");
        assert_eq!(object.title, "boom");
        assert!(object.code.is_none());
        assert!(object.meta.is_none());
    }

    #[test]
    fn test_duplicate_email_mapping() {
        let err: ApiError = StoreError::UniqueViolation {
            constraint: USERS_EMAIL_KEY.to_string(),
        }
        .into();
        let object = err.to_error_object();

        assert_eq!(object.status, "400");
        assert_eq!(object.title, DUPLICATE_EMAIL_TITLE);
        assert_eq!(object.code.as_deref(), Some("duplicate"));
    }

    #[test]
    fn test_foreign_key_mapping_depends_on_operation() {
        let write: ApiError = StoreError::ForeignKeyViolation {
            constraint: "contacts_organization_id_fkey".to_string(),
        }
        .into();
        let object = write.to_error_object();
        assert_eq!(object.code.as_deref(), Some("invalid_reference"));
        assert_eq!(
            object.source.and_then(|s| s.pointer).as_deref(),
            Some("/data/attributes/organization_id")
        );

        let delete = ApiError::from_delete(StoreError::ForeignKeyViolation {
            constraint: "users_account_id_fkey".to_string(),
        });
        assert_eq!(
            delete.to_error_object().code.as_deref(),
            Some("dependent_records")
        );
    }

    #[test]
    fn test_rejected_uses_reason_phrase() {
        let err = ApiError::Rejected(StatusCode::PAYLOAD_TOO_LARGE, Failure::new());
        let object = err.to_error_object();

        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(object.status, "413");
        assert_eq!(object.title, "Payload Too Large");
    }

    #[test]
    fn test_database_errors_are_internal() {
        let err: ApiError = StoreError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
