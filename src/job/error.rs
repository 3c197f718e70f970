use crate::mp4::InjectError;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const NO_VIDEO_PROVIDED: &str = "No video file provided";
pub const NO_FILE_SELECTED: &str = "No file selected";
pub const EMPTY_UPLOAD: &str = "Uploaded file is empty";

/// Errors surfaced at the job boundary.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    InputMissing(&'static str),

    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    #[error("Failed to receive upload: {0}")]
    Upload(String),

    #[error(transparent)]
    Inject(#[from] InjectError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Job exceeded its {0:?} time limit")]
    Timeout(Duration),

    #[error("No more jobs are being admitted")]
    Unavailable,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl JobError {
    /// Convert error to HTTP status code
    pub fn to_err_code(&self) -> StatusCode {
        match self {
            JobError::InputMissing(_) | JobError::Upload(_) => StatusCode::BAD_REQUEST,
            JobError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            JobError::Inject(InjectError::MalformedBox { .. })
            | JobError::Inject(InjectError::TruncatedStream { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            JobError::Inject(InjectError::AlreadySpherical { .. }) => StatusCode::CONFLICT,
            JobError::Inject(InjectError::Cancelled) | JobError::Timeout(_) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            JobError::Inject(InjectError::Io(_)) | JobError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            JobError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable, caller-safe message. Internal detail only goes to the log.
    pub fn public_message(&self) -> &'static str {
        match self {
            JobError::InputMissing(message) => *message,
            JobError::PayloadTooLarge => "Uploaded file is too large",
            JobError::Upload(_) => "Failed to receive uploaded file",
            JobError::Inject(InjectError::MalformedBox { .. })
            | JobError::Inject(InjectError::TruncatedStream { .. }) => {
                "Uploaded file is not a valid MP4"
            }
            JobError::Inject(InjectError::AlreadySpherical { .. }) => {
                "Video already carries spherical metadata"
            }
            JobError::Inject(InjectError::Cancelled) | JobError::Timeout(_) => {
                "Processing timed out"
            }
            JobError::Inject(InjectError::Io(_)) | JobError::Io(_) => "Failed to inject metadata",
            JobError::Unavailable => "Service unavailable",
        }
    }
}

impl From<MultipartError> for JobError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            JobError::PayloadTooLarge
        } else {
            JobError::Upload(error.body_text())
        }
    }
}

impl IntoResponse for JobError {
    fn into_response(self) -> Response {
        (
            self.to_err_code(),
            Json(ErrorResponse {
                error: self.public_message().to_string(),
            }),
        )
            .into_response()
    }
}
