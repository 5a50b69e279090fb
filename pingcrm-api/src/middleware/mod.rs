/// Middleware for the API server
///
/// - `error_envelope`: rewrites non-JSON:API error responses and catches panics

pub mod error_envelope;
