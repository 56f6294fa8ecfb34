//! API error type, HTTP status mapping, and the JSON response envelope.

use std::path::{Path, PathBuf};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use bindery_composer::ComposeError;
use bindery_core::{ContextError, PackageError};
use bindery_pipeline::PipelineError;
use bindery_renderer::RenderError;

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Uniform JSON envelope for API responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

/// Everything a request can fail with, mapped onto HTTP statuses: missing
/// inputs are 404, unrenderable inputs are 422, caller mistakes are 400,
/// and anything internal is 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("task join error: {0}")]
    Task(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Context(_) => StatusCode::BAD_REQUEST,
            ApiError::Render(err) => render_status(err),
            ApiError::Compose(err) => compose_status(err),
            ApiError::Pipeline(err) => pipeline_status(err),
            ApiError::Task(_) | ApiError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Full message for the response body. Render errors carry their cause
    /// chain; partial batch failures list every failed item.
    fn message(&self) -> String {
        match self {
            ApiError::Render(err) => err.detail(),
            ApiError::Pipeline(PipelineError::PartialBatchFailure { failures }) => {
                let mut out = self.to_string();
                for failure in failures {
                    out.push_str(&format!("; [{}] {}", failure.index, failure.reason));
                }
                out
            }
            other => other.to_string(),
        }
    }
}

fn render_status(err: &RenderError) -> StatusCode {
    match err {
        RenderError::TemplateSyntax(_) | RenderError::Substitution(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RenderError::Context(_) => StatusCode::BAD_REQUEST,
        RenderError::Package(PackageError::NotFound { .. }) => StatusCode::NOT_FOUND,
        RenderError::Package(PackageError::Corrupt { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        RenderError::Package(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn compose_status(err: &ComposeError) -> StatusCode {
    match err {
        ComposeError::InsufficientInput { .. } => StatusCode::BAD_REQUEST,
        ComposeError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,
        ComposeError::DocumentCorrupt { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ComposeError::Io { .. } | ComposeError::Build(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn pipeline_status(err: &PipelineError) -> StatusCode {
    match err {
        PipelineError::EmptyBatch | PipelineError::TitleCountMismatch { .. } => {
            StatusCode::BAD_REQUEST
        }
        PipelineError::PartialBatchFailure { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::Render(err) => render_status(err),
        PipelineError::Compose(err) => compose_status(err),
        PipelineError::Pool(_) | PipelineError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        } else {
            tracing::warn!(%status, error = %message, "request rejected");
        }
        (status, Json(ApiResponse::failure(message))).into_response()
    }
}

pub(crate) fn io_err(path: impl AsRef<Path>, source: std::io::Error) -> ApiError {
    ApiError::Io {
        path: path.as_ref().to_path_buf(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
