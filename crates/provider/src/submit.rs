//! Single-attempt job submission.
//!
//! Submissions create provider-side state, and the provider offers no
//! idempotency key, so a retried create could charge for and produce a
//! duplicate job. Every submission here is therefore exactly one HTTP
//! attempt; transient failures surface to the caller, who may resubmit
//! knowingly. The retry wrapper in [`crate::retry`] is reserved for
//! idempotent reads.

use std::sync::Arc;

use async_trait::async_trait;

use fable_core::error::CoreError;
use fable_core::prompt::{compose_prompt, validate_generation_request, GenerationRequest};
use fable_core::training::{validate_training_request, TrainingRequest, TrainingTable};
use fable_core::types::{Job, JobKind, JobState};

use crate::api::{ProviderApi, ProviderApiError};
use crate::poll::{PollStatus, StatusSource};
use crate::status::map_job_status;

/// Errors from job submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The request failed local validation; no provider call was made.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The single submission attempt failed. Whether the provider created
    /// a job before failing is unknown.
    #[error(transparent)]
    Provider(#[from] ProviderApiError),
}

impl From<CoreError> for SubmitError {
    fn from(error: CoreError) -> Self {
        SubmitError::Validation(error.to_string())
    }
}

/// Submits generation and training jobs to the provider.
pub struct JobSubmitter {
    api: Arc<ProviderApi>,
    training_table: TrainingTable,
}

impl JobSubmitter {
    pub fn new(api: Arc<ProviderApi>) -> Self {
        Self {
            api,
            training_table: TrainingTable::tuned(),
        }
    }

    /// Replace the category-conditional hyperparameter table.
    pub fn with_training_table(mut self, table: TrainingTable) -> Self {
        self.training_table = table;
        self
    }

    /// Submit an image generation job. One provider call, no retries.
    ///
    /// The prompt is composed from the scene text and the optional primary
    /// asset's trigger word; the returned job starts in `Submitted` and is
    /// handed to [`crate::poll::poll_job`] for resolution.
    pub async fn submit_generation(&self, request: &GenerationRequest) -> Result<Job, SubmitError> {
        validate_generation_request(request)?;

        let prompt = compose_prompt(&request.scene_text, request.primary_asset.as_ref());
        let element_id = request
            .primary_asset
            .as_ref()
            .and_then(|a| a.provider_asset_id.as_deref());

        tracing::info!(
            prompt_len = prompt.len(),
            element = element_id.unwrap_or("none"),
            "Submitting generation job",
        );

        let generation_id = self
            .api
            .submit_generation(&prompt, request.negative_prompt(), &request.params, element_id)
            .await?;

        tracing::info!(job_id = %generation_id, "Generation job accepted");
        Ok(Job::submitted(generation_id, JobKind::ImageGeneration))
    }

    /// Start training a new element. One provider call, no retries.
    pub async fn submit_training(&self, request: &TrainingRequest) -> Result<Job, SubmitError> {
        validate_training_request(request)?;

        let params = self.training_table.params_for(request.category);
        let description = request
            .description
            .clone()
            .unwrap_or_else(|| format!("{} ({})", request.name, request.category.provider_name()));

        tracing::info!(
            name = %request.name,
            category = request.category.provider_name(),
            epochs = params.num_train_epochs,
            learning_rate = params.learning_rate,
            "Submitting training job",
        );

        let element_id = self
            .api
            .create_element(request, &params, &description)
            .await?;

        tracing::info!(job_id = %element_id, "Training job accepted");
        Ok(Job::submitted(element_id, JobKind::Training))
    }
}

// ---------------------------------------------------------------------------
// REST-backed status sources
// ---------------------------------------------------------------------------

/// Polls `GET /generations/{id}` for generation jobs.
pub struct GenerationStatusSource {
    api: Arc<ProviderApi>,
}

impl GenerationStatusSource {
    pub fn new(api: Arc<ProviderApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl StatusSource for GenerationStatusSource {
    async fn fetch_status(&self, job_id: &str) -> Result<PollStatus, ProviderApiError> {
        let record = self.api.get_generation(job_id).await?;
        Ok(PollStatus {
            state: map_job_status(record.status.as_deref()),
            image_url: record.image_urls.into_iter().next(),
        })
    }
}

/// Polls `GET /elements/{id}` for training jobs.
pub struct TrainingStatusSource {
    api: Arc<ProviderApi>,
}

impl TrainingStatusSource {
    pub fn new(api: Arc<ProviderApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl StatusSource for TrainingStatusSource {
    async fn fetch_status(&self, job_id: &str) -> Result<PollStatus, ProviderApiError> {
        let status = self.api.get_element_status(job_id).await?;
        let state = if status.status == "NOT_FOUND" {
            JobState::NotFound
        } else {
            map_job_status(Some(&status.status))
        };
        Ok(PollStatus { state, image_url: None })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use fable_core::types::AssetCategory;

    use super::*;

    fn submitter() -> JobSubmitter {
        JobSubmitter::new(Arc::new(ProviderApi::new("http://127.0.0.1:9", "test-key")))
    }

    // Validation failures must never reach the network; the unroutable
    // base URL above would error differently if they did.

    #[tokio::test]
    async fn empty_scene_text_fails_validation() {
        let request = GenerationRequest::new("   ");
        let result = submitter().submit_generation(&request).await;
        assert_matches!(result, Err(SubmitError::Validation(_)));
    }

    #[tokio::test]
    async fn training_without_images_fails_validation() {
        let request = TrainingRequest {
            name: "Elara".into(),
            trigger_word: "elara_character".into(),
            category: AssetCategory::Character,
            dataset_id: "ds-1".into(),
            image_ids: Vec::new(),
            description: None,
        };
        let result = submitter().submit_training(&request).await;
        assert_matches!(result, Err(SubmitError::Validation(_)));
    }

    #[tokio::test]
    async fn training_with_blank_trigger_word_fails_validation() {
        let request = TrainingRequest {
            name: "Elara".into(),
            trigger_word: "  ".into(),
            category: AssetCategory::Character,
            dataset_id: "ds-1".into(),
            image_ids: vec!["img-1".into()],
            description: None,
        };
        let result = submitter().submit_training(&request).await;
        assert_matches!(result, Err(SubmitError::Validation(_)));
    }
}
