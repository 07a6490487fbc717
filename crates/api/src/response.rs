//! Common API response helpers to reduce error handling boilerplate

use axum::http::StatusCode;

/// Type alias for the common error response tuple
pub type ApiError = (StatusCode, String);

/// Create a NOT_FOUND error response
pub fn not_found(resource: &str) -> ApiError {
    (StatusCode::NOT_FOUND, format!("{} not found", resource))
}

/// Create an INTERNAL_SERVER_ERROR response with a custom message
pub fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

/// Create an INTERNAL_SERVER_ERROR response with a formatted message
pub fn internal_error_msg<E: std::fmt::Display>(prefix: &str, err: E) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("{}: {}", prefix, err),
    )
}

/// Create a BAD_REQUEST error response
pub fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, message.into())
}

/// Create a BAD_GATEWAY response for a failed bus publish; the request
/// cannot be accepted if the initiating event never left the gateway.
pub fn bus_error<E: std::fmt::Display>(err: E) -> ApiError {
    (
        StatusCode::BAD_GATEWAY,
        format!("Event bus error: {}", err),
    )
}
