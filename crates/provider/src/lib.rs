//! REST client and job tracking for the image-generation provider.
//!
//! Provides the typed HTTP API wrapper, retry/backoff for idempotent calls,
//! single-attempt job submission, the bounded polling state machine, and the
//! asset reconciler that keeps the local snapshot in sync with provider
//! state.

pub mod api;
pub mod poll;
pub mod reconciler;
pub mod retry;
pub mod status;
pub mod submit;
pub mod upload;

pub use api::{ProviderApi, ProviderApiError};
pub use poll::{poll_job, PollConfig, PollError, PollStatus, StatusSource};
pub use reconciler::AssetReconciler;
pub use retry::{with_retry, RetryConfig};
pub use status::map_job_status;
pub use submit::{GenerationStatusSource, JobSubmitter, SubmitError, TrainingStatusSource};
pub use upload::{DatasetUploader, UploadError};
