use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use fable_core::error::CoreError;
use fable_llm::LlmError;
use fable_provider::{PollError, ProviderApiError, SubmitError, UploadError};

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain and provider errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
///
/// A poll timeout is deliberately NOT an error status: the provider may
/// still finish the job, so it maps to 202 with a `STILL_PROCESSING` code
/// and the job id for the client to check back with.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `fable_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A job submission failure.
    #[error(transparent)]
    Submit(#[from] SubmitError),

    /// A provider REST failure outside submission and polling.
    #[error(transparent)]
    Provider(#[from] ProviderApiError),

    /// A polling outcome other than completion.
    #[error(transparent)]
    Poll(#[from] PollError),

    /// A training image upload failure.
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// A chat-completions failure.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Still-processing is a non-error outcome with its own shape.
        if let AppError::Poll(PollError::TimedOut { job_id, attempts }) = &self {
            let body = json!({
                "code": "STILL_PROCESSING",
                "message": "The job is still processing. Check back later.",
                "job_id": job_id,
                "attempts": attempts,
            });
            return (StatusCode::ACCEPTED, axum::Json(body)).into_response();
        }

        let (status, code, message) = match &self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
            },

            AppError::Submit(err) => match err {
                SubmitError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                SubmitError::Provider(provider) => classify_provider_error(provider),
            },

            AppError::Provider(err) => classify_provider_error(err),

            AppError::Poll(err) => match err {
                PollError::Failed { job_id, state } => (
                    StatusCode::BAD_GATEWAY,
                    "JOB_FAILED",
                    format!("Job {job_id} ended in state {}", state.as_str()),
                ),
                PollError::Cancelled { job_id } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SHUTTING_DOWN",
                    format!("Polling for job {job_id} was cancelled"),
                ),
                // Handled above.
                PollError::TimedOut { .. } => unreachable!(),
            },

            AppError::Upload(err) => match err {
                UploadError::UnsupportedExtension(name) => (
                    StatusCode::BAD_REQUEST,
                    "UNSUPPORTED_IMAGE",
                    format!("Unsupported image file {name:?}"),
                ),
                UploadError::Provider(provider) => classify_provider_error(provider),
                other => {
                    tracing::error!(error = %other, "Upload error");
                    (
                        StatusCode::BAD_GATEWAY,
                        "UPLOAD_FAILED",
                        "Image upload failed".to_string(),
                    )
                }
            },

            AppError::Llm(err) => {
                tracing::error!(error = %err, "LLM error");
                (
                    StatusCode::BAD_GATEWAY,
                    "LLM_ERROR",
                    "The language model request failed".to_string(),
                )
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a provider REST error into an HTTP status, code, and message.
///
/// - Provider 401/403 means our API key is bad: reported as 500, not
///   forwarded, since the client can do nothing about it.
/// - Provider 429 maps to 429 so clients can back off.
/// - Everything else maps to 502 with a sanitized message.
fn classify_provider_error(err: &ProviderApiError) -> (StatusCode, &'static str, String) {
    match err {
        ProviderApiError::Api { status: 401 | 403, .. } => {
            tracing::error!(error = %err, "Provider rejected our credentials");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        }
        ProviderApiError::Api { status: 429, .. } => (
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "The image provider is rate limiting requests. Try again shortly.".to_string(),
        ),
        other => {
            tracing::error!(error = %other, "Provider error");
            (
                StatusCode::BAD_GATEWAY,
                "PROVIDER_ERROR",
                "The image provider request failed".to_string(),
            )
        }
    }
}
