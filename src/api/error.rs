use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::import::ImportError;
use crate::sequencer::SequencerError;

/// Error returned by HTTP handlers; rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unauthorized,
    BadGateway(String),
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound(m)
            | Self::BadRequest(m)
            | Self::Conflict(m)
            | Self::BadGateway(m)
            | Self::Internal(m) => m,
            Self::Unauthorized => "Unauthorized",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self.message());
        }
        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

impl From<outreach_core::Error> for ApiError {
    fn from(err: outreach_core::Error) -> Self {
        match err {
            outreach_core::Error::NotFound(_) => Self::NotFound(err.to_string()),
            outreach_core::Error::Validation(msg) => Self::BadRequest(msg),
            outreach_core::Error::InvalidTransition(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<SequencerError> for ApiError {
    fn from(err: SequencerError) -> Self {
        match err {
            SequencerError::NotFound(_) => Self::NotFound(err.to_string()),
            SequencerError::SequenceExhausted(_) | SequencerError::Conflict(_) => {
                Self::Conflict(err.to_string())
            }
            SequencerError::Transport(_) => Self::BadGateway(err.to_string()),
            SequencerError::Store(inner) => inner.into(),
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Csv(_) | ImportError::Validation(_) => Self::BadRequest(err.to_string()),
            ImportError::Store(inner) => inner.into(),
        }
    }
}
