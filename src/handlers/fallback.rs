use crate::error::AppError;

// Keep unmatched routes and methods on the same error body as the handlers.

pub async fn not_found() -> AppError {
    AppError::NotFound("Route not found".to_string())
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
