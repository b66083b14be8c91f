use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Outcome classification for every catalog, detail and video lookup
///
/// Cloneable so that one settled request can be handed to every coalesced waiter.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Remote API unreachable, timed out or answered with a non-success status
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Response body did not have the expected shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The catalog reported that the requested id does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-initiated abort; never cached and never shown to a user
    #[error("Request canceled")]
    Canceled,

    /// Nothing could be derived to search for
    #[error("No search phrases could be derived")]
    NotApplicable,
}

impl FetchError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, FetchError::Canceled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::MalformedPayload(err.to_string())
        } else {
            FetchError::NetworkFailure(err.to_string())
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApi(String),

    #[error("Request canceled")]
    Canceled,

    #[error("Not applicable: {0}")]
    NotApplicable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound(msg) => AppError::NotFound(msg),
            FetchError::NetworkFailure(_) | FetchError::MalformedPayload(_) => {
                AppError::ExternalApi(err.to_string())
            }
            FetchError::Canceled => AppError::Canceled,
            FetchError::NotApplicable => AppError::NotApplicable(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::ExternalApi(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Canceled => (StatusCode::CONFLICT, self.to_string()),
            AppError::NotApplicable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
