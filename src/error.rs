use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Errors raised by the appointment entity, its store and the listing layer.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("appointment {0} not found")]
    NotFound(i32),

    #[error("{0}")]
    Validation(String),

    #[error("cannot sort by `{0}`")]
    InvalidSort(String),

    /// A stored row that cannot be turned into an appointment.
    #[error("malformed appointment row {appointment_id}: {reason}")]
    MalformedRow { appointment_id: i32, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn revising_user_required() -> Self {
        ApiError::Unauthorized(
            "REVISING_USER_REQUIRED",
            "X-Revising-User header with a numeric user id is required".into(),
        )
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::NotFound(_) => ApiError::NotFound("NOT_FOUND", e.to_string()),
            BookingError::Validation(msg) => ApiError::BadRequest("VALIDATION_ERROR", msg),
            BookingError::InvalidSort(_) => ApiError::BadRequest("INVALID_SORT", e.to_string()),
            BookingError::MalformedRow { .. } | BookingError::Storage(_) => {
                tracing::error!(error = %e, "appointment data access failed");
                ApiError::Internal("could not process the appointment request".into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::to_error_response("INTERNAL", &msg),
            )
                .into_response(),
        }
    }
}
