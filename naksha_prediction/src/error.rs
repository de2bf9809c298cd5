use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use naksha_core::ClassifierError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("No image file in the request")]
    MissingFile,
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Expected a multipart/form-data body: {0}")]
    NotMultipart(#[from] MultipartRejection),
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::MissingFile => StatusCode::BAD_REQUEST,
            PredictError::Multipart(e) => e.status(),
            PredictError::NotMultipart(rejection) => rejection.status(),
            PredictError::Classifier(ClassifierError::Decode(_)) => StatusCode::BAD_REQUEST,
            PredictError::Classifier(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::MissingFile
            | PredictError::Multipart(_)
            | PredictError::NotMultipart(_) => "bad_request",
            PredictError::Classifier(e) => e.kind(),
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Prediction failed: {}", self);
        } else {
            tracing::warn!("Rejected prediction request: {}", self);
        }

        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind(),
        };
        (status, Json(body)).into_response()
    }
}
