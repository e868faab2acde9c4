// API errors rendered as `{error, message}` JSON bodies
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{error}")]
    NotFound {
        error: String,
        message: Option<String>,
    },

    #[error("{error}")]
    BadRequest { error: String },

    #[error("Unauthorized")]
    Unauthorized,

    /// The cause is logged, only `message` reaches the client.
    #[error("{message}")]
    Internal {
        message: String,
        #[source]
        cause: anyhow::Error,
    },
}

impl ApiError {
    pub fn not_found(error: impl Into<String>) -> Self {
        ApiError::NotFound {
            error: error.into(),
            message: None,
        }
    }

    pub fn internal(message: impl Into<String>, cause: anyhow::Error) -> Self {
        ApiError::Internal {
            message: message.into(),
            cause,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::NotFound { error, message } => ErrorBody { error, message },
            ApiError::BadRequest { error } => ErrorBody {
                error,
                message: None,
            },
            ApiError::Unauthorized => ErrorBody {
                error: "Unauthorized".to_string(),
                message: None,
            },
            ApiError::Internal { message, cause } => {
                tracing::error!("{}: {:#}", message, cause);
                ErrorBody {
                    error: message,
                    message: None,
                }
            }
        };
        (status, Json(body)).into_response()
    }
}
