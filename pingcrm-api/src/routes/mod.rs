/// API route handlers
///
/// - `resources`: the generic list/create/read/update/delete pipeline
/// - `accounts`, `users`, `organizations`, `contacts`: per-type attributes and checks
/// - `health`: Health check endpoint

pub mod accounts;
pub mod contacts;
pub mod health;
pub mod organizations;
pub mod resources;
pub mod users;

use axum::http::Uri;

use crate::error::{ApiError, Failure};

/// Answers requests that match no route
pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::NotFound(Failure::new().detail(format!("No route for {}", uri.path())))
}
