use std::time::Duration;

use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::models::ErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug)]
pub enum URLError {
    Validation,
    InvalidIdentifier,
    NotFound,
    StorageUnavailable(StoreError),
    Internal(&'static str),
}

impl IntoResponse for URLError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation | Self::InvalidIdentifier => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody { error: "Invalid URL" }),
            )
                .into_response(),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody { error: "URL Not Found" }),
            )
                .into_response(),
            Self::StorageUnavailable(err) => {
                tracing::error!(err = ?err, "storage unavailable");
                internal_error()
            }
            Self::Internal(reason) => {
                tracing::error!(reason, "request failed");
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "Internal Server Error",
        }),
    )
        .into_response()
}

impl From<StoreError> for URLError {
    fn from(err: StoreError) -> Self {
        Self::StorageUnavailable(err)
    }
}

/// Renders a [`URLError`] as the HTML page shown to someone following a short link.
pub struct ErrorPage(pub URLError);

impl IntoResponse for ErrorPage {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            URLError::Validation | URLError::InvalidIdentifier => {
                (StatusCode::BAD_REQUEST, "Invalid URL")
            }
            URLError::NotFound => (StatusCode::NOT_FOUND, "404 | URL Not Found"),
            URLError::StorageUnavailable(err) => {
                tracing::error!(err = ?err, "storage unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, "500 | Something went wrong")
            }
            URLError::Internal(reason) => {
                tracing::error!(reason, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "500 | Something went wrong")
            }
        };
        (status, Html(format!("<h1>{message}</h1>"))).into_response()
    }
}

impl From<URLError> for ErrorPage {
    fn from(err: URLError) -> Self {
        Self(err)
    }
}
