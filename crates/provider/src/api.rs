//! REST API client for the generation provider's HTTP endpoints.
//!
//! Wraps the provider's REST API (generation submission, element training,
//! status retrieval, dataset management) using [`reqwest`]. Response shapes
//! follow the provider's wire format; everything is converted to domain
//! types at this boundary.

use serde::Deserialize;

use fable_core::normalize::RawElement;
use fable_core::prompt::GenerationParams;
use fable_core::training::{Hyperparameters, TrainingRequest, SD_VERSION};

/// HTTP client for the generation provider.
pub struct ProviderApi {
    pub(crate) client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// Errors from the provider REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ProviderApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider returned a non-2xx status code.
    #[error("Provider API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response was missing an expected field.
    #[error("Unexpected provider response shape: {0}")]
    Shape(String),
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A provider id may arrive as a JSON number or string; render both as the
/// opaque string the domain uses.
fn id_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SubmitGenerationResponse {
    #[serde(rename = "sdGenerationJob")]
    job: Option<SdGenerationJob>,
}

#[derive(Debug, Deserialize)]
struct SdGenerationJob {
    #[serde(rename = "generationId")]
    generation_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SubmitTrainingResponse {
    #[serde(rename = "sdTrainingJob")]
    job: Option<SdTrainingJob>,
}

#[derive(Debug, Deserialize)]
struct SdTrainingJob {
    #[serde(rename = "userLoraId")]
    user_lora_id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GetGenerationResponse {
    generations_by_pk: Option<GenerationByPk>,
}

#[derive(Debug, Deserialize)]
struct GenerationByPk {
    status: Option<String>,
    #[serde(default)]
    generated_images: Vec<GeneratedImage>,
}

#[derive(Debug, Deserialize)]
struct GeneratedImage {
    url: String,
}

/// Status record for one generation job.
#[derive(Debug, Clone, Default)]
pub struct GenerationRecord {
    pub status: Option<String>,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(default)]
    user_details: Vec<UserDetail>,
}

#[derive(Debug, Deserialize)]
struct UserDetail {
    user: Option<UserRef>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ListElementsResponse {
    #[serde(default)]
    user_loras: Vec<ElementPayload>,
}

#[derive(Debug, Deserialize)]
struct GetElementResponse {
    #[serde(default)]
    user_elements: Vec<ElementPayload>,
}

/// One element as the provider serializes it.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementPayload {
    pub id: serde_json::Value,
    pub name: Option<String>,
    #[serde(rename = "instancePrompt")]
    pub instance_prompt: Option<String>,
    pub focus: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "datasetId")]
    pub dataset_id: Option<serde_json::Value>,
}

impl ElementPayload {
    /// Convert to the domain's pre-normalization shape.
    pub fn into_raw_element(self) -> RawElement {
        RawElement {
            id: id_string(&self.id).unwrap_or_default(),
            name: self.name,
            trigger_word: self.instance_prompt,
            category: self.focus,
            status: self.status,
            thumbnail_url: self.thumbnail_url,
            dataset_image_urls: Vec::new(),
        }
    }

    /// The element's dataset id, when present.
    pub fn dataset_id(&self) -> Option<String> {
        self.dataset_id.as_ref().and_then(id_string)
    }
}

/// Current provider-side status of an element, as returned by
/// [`ProviderApi::get_element_status`].
#[derive(Debug, Clone)]
pub struct ElementStatus {
    pub id: String,
    /// Raw provider status string. `"PROCESSING"` when the element exists
    /// but has not materialized yet; `"NOT_FOUND"` when the provider
    /// returned 404.
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct CreateDatasetResponse {
    insert_datasets_one: Option<DatasetRef>,
}

#[derive(Debug, Deserialize)]
struct DatasetRef {
    id: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GetDatasetResponse {
    datasets_by_pk: Option<DatasetByPk>,
}

#[derive(Debug, Deserialize)]
struct DatasetByPk {
    #[serde(default)]
    dataset_images: Vec<DatasetImage>,
}

#[derive(Debug, Deserialize)]
struct DatasetImage {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InitUploadResponse {
    #[serde(rename = "uploadDatasetImage")]
    upload: Option<UploadDatasetImage>,
}

#[derive(Debug, Deserialize)]
struct UploadDatasetImage {
    id: serde_json::Value,
    url: String,
    /// Presigned form fields, serialized by the provider as a JSON string.
    fields: String,
}

/// A presigned upload target for one training image.
#[derive(Debug, Clone)]
pub struct PresignedUpload {
    pub image_id: String,
    pub url: String,
    pub fields: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct UploadReferenceImageResponse {
    #[serde(rename = "uploadImage")]
    upload: Option<UploadImageRef>,
}

#[derive(Debug, Deserialize)]
struct UploadImageRef {
    id: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl ProviderApi {
    /// Create a new API client.
    ///
    /// * `base_url` - REST base, e.g. `https://cloud.example.ai/api/rest/v1`.
    /// * `api_key`  - bearer token for every request.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.api_key)
    }

    /// Submit a generation job. Exactly one provider job is created per
    /// call; callers own the duplication risk on network failure.
    ///
    /// Returns the provider-issued generation id.
    pub async fn submit_generation(
        &self,
        prompt: &str,
        negative_prompt: &str,
        params: &GenerationParams,
        element_id: Option<&str>,
    ) -> Result<String, ProviderApiError> {
        let mut body = serde_json::json!({
            "prompt": prompt,
            "negative_prompt": negative_prompt,
            "modelId": params.model_id,
            "width": params.width,
            "height": params.height,
            "num_images": params.num_images,
            "guidance_scale": params.guidance_scale,
            "alchemy": params.alchemy,
            "photoReal": params.photo_real,
            "presetStyle": params.preset_style,
        });
        if let Some(id) = element_id {
            body["userElements"] = serde_json::json!([{"userLoraId": id, "weight": 1.0}]);
        }

        let response = self
            .authorized(self.client.post(self.url("/generations")))
            .json(&body)
            .send()
            .await?;

        let parsed: SubmitGenerationResponse = Self::parse_response(response).await?;
        parsed
            .job
            .as_ref()
            .and_then(|j| id_string(&j.generation_id))
            .ok_or_else(|| {
                ProviderApiError::Shape("generation response missing sdGenerationJob.generationId".into())
            })
    }

    /// Retrieve the current status of a generation job.
    ///
    /// An absent record or status field is reported as-is; the poller maps
    /// it to a non-terminal state.
    pub async fn get_generation(&self, generation_id: &str) -> Result<GenerationRecord, ProviderApiError> {
        let response = self
            .authorized(
                self.client
                    .get(self.url(&format!("/generations/{generation_id}"))),
            )
            .send()
            .await?;

        let parsed: GetGenerationResponse = Self::parse_response(response).await?;
        Ok(match parsed.generations_by_pk {
            Some(record) => GenerationRecord {
                status: record.status,
                image_urls: record.generated_images.into_iter().map(|i| i.url).collect(),
            },
            None => GenerationRecord::default(),
        })
    }

    /// Start training a custom element. Exactly one provider training job is
    /// created per call; never wrapped in the generic retry client.
    ///
    /// Returns the provider-issued element id.
    pub async fn create_element(
        &self,
        request: &TrainingRequest,
        params: &Hyperparameters,
        description: &str,
    ) -> Result<String, ProviderApiError> {
        let body = serde_json::json!({
            "name": request.name,
            "description": description,
            "datasetId": request.dataset_id,
            "instance_prompt": request.trigger_word,
            "lora_focus": request.category.provider_name(),
            "train_text_encoder": params.train_text_encoder,
            "resolution": params.resolution,
            "sd_version": SD_VERSION,
            "num_train_epochs": params.num_train_epochs,
            "learning_rate": params.learning_rate,
        });

        let response = self
            .authorized(self.client.post(self.url("/elements")))
            .json(&body)
            .send()
            .await?;

        let parsed: SubmitTrainingResponse = Self::parse_response(response).await?;
        parsed
            .job
            .as_ref()
            .and_then(|j| id_string(&j.user_lora_id))
            .ok_or_else(|| {
                ProviderApiError::Shape("training response missing sdTrainingJob.userLoraId".into())
            })
    }

    /// Fetch the status of one element.
    ///
    /// The provider's quirks are absorbed here: an empty `user_elements`
    /// array means the element is still materializing (`PROCESSING`), and a
    /// 404 means it was deleted or never existed (`NOT_FOUND`). Neither is
    /// an error for the caller.
    pub async fn get_element_status(&self, element_id: &str) -> Result<ElementStatus, ProviderApiError> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/elements/{element_id}"))))
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(ElementStatus {
                id: element_id.to_string(),
                status: "NOT_FOUND".to_string(),
            });
        }

        let parsed: GetElementResponse = Self::parse_response(response).await?;
        let status = parsed
            .user_elements
            .into_iter()
            .next()
            .and_then(|e| e.status)
            .unwrap_or_else(|| "PROCESSING".to_string());
        Ok(ElementStatus {
            id: element_id.to_string(),
            status,
        })
    }

    /// Resolve the account's user id (needed to list elements).
    pub async fn get_user_id(&self) -> Result<String, ProviderApiError> {
        let response = self
            .authorized(self.client.get(self.url("/me")))
            .send()
            .await?;

        let parsed: UserInfoResponse = Self::parse_response(response).await?;
        parsed
            .user_details
            .into_iter()
            .next()
            .and_then(|d| d.user)
            .and_then(|u| id_string(&u.id))
            .ok_or_else(|| ProviderApiError::Shape("user info missing user_details[0].user.id".into()))
    }

    /// List all trained elements for a user.
    pub async fn list_user_elements(&self, user_id: &str) -> Result<Vec<ElementPayload>, ProviderApiError> {
        let response = self
            .authorized(
                self.client
                    .get(self.url(&format!("/elements/user/{user_id}"))),
            )
            .send()
            .await?;

        let parsed: ListElementsResponse = Self::parse_response(response).await?;
        Ok(parsed.user_loras)
    }

    /// Create a training dataset; returns its id.
    pub async fn create_dataset(&self, name: &str, description: &str) -> Result<String, ProviderApiError> {
        let body = serde_json::json!({ "name": name, "description": description });
        let response = self
            .authorized(self.client.post(self.url("/datasets")))
            .json(&body)
            .send()
            .await?;

        let parsed: CreateDatasetResponse = Self::parse_response(response).await?;
        parsed
            .insert_datasets_one
            .as_ref()
            .and_then(|d| id_string(&d.id))
            .ok_or_else(|| ProviderApiError::Shape("dataset response missing insert_datasets_one.id".into()))
    }

    /// Image URLs of a dataset's training images.
    pub async fn get_dataset_images(&self, dataset_id: &str) -> Result<Vec<String>, ProviderApiError> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/datasets/{dataset_id}"))))
            .send()
            .await?;

        let parsed: GetDatasetResponse = Self::parse_response(response).await?;
        Ok(parsed
            .datasets_by_pk
            .map(|d| d.dataset_images.into_iter().filter_map(|i| i.url).collect())
            .unwrap_or_default())
    }

    /// Phase one of a training-image upload: obtain a presigned target.
    pub async fn init_dataset_upload(
        &self,
        dataset_id: &str,
        extension: &str,
    ) -> Result<PresignedUpload, ProviderApiError> {
        let body = serde_json::json!({ "extension": extension });
        let response = self
            .authorized(
                self.client
                    .post(self.url(&format!("/datasets/{dataset_id}/upload"))),
            )
            .json(&body)
            .send()
            .await?;

        let parsed: InitUploadResponse = Self::parse_response(response).await?;
        let upload = parsed
            .upload
            .ok_or_else(|| ProviderApiError::Shape("upload response missing uploadDatasetImage".into()))?;
        let image_id = id_string(&upload.id)
            .ok_or_else(|| ProviderApiError::Shape("upload response missing image id".into()))?;
        let fields: std::collections::HashMap<String, String> = serde_json::from_str(&upload.fields)
            .map_err(|e| ProviderApiError::Shape(format!("presigned fields are not a JSON object: {e}")))?;

        Ok(PresignedUpload {
            image_id,
            url: upload.url,
            fields,
        })
    }

    /// Upload a reference image by URL; returns the provider image id.
    pub async fn upload_reference_image(&self, image_url: &str) -> Result<String, ProviderApiError> {
        let body = serde_json::json!({ "url": image_url });
        let response = self
            .authorized(self.client.post(self.url("/images")))
            .json(&body)
            .send()
            .await?;

        let parsed: UploadReferenceImageResponse = Self::parse_response(response).await?;
        parsed
            .upload
            .as_ref()
            .and_then(|u| id_string(&u.id))
            .ok_or_else(|| ProviderApiError::Shape("image upload response missing uploadImage.id".into()))
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`ProviderApiError::Api`] containing the
    /// status and body text on failure.
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProviderApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ProviderApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ProviderApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_string_accepts_numbers_and_strings() {
        assert_eq!(id_string(&serde_json::json!("el-1")).as_deref(), Some("el-1"));
        assert_eq!(id_string(&serde_json::json!(42)).as_deref(), Some("42"));
        assert_eq!(id_string(&serde_json::json!(null)), None);
    }

    #[test]
    fn element_payload_converts_to_raw_element() {
        let payload: ElementPayload = serde_json::from_value(serde_json::json!({
            "id": 7,
            "name": "Elara",
            "instancePrompt": "elara_character",
            "focus": "Character",
            "status": "COMPLETE",
            "thumbnailUrl": "https://cdn.example/t.png",
            "datasetId": "ds-1",
        }))
        .unwrap();

        assert_eq!(payload.dataset_id().as_deref(), Some("ds-1"));
        let raw = payload.into_raw_element();
        assert_eq!(raw.id, "7");
        assert_eq!(raw.trigger_word.as_deref(), Some("elara_character"));
        assert_eq!(raw.category.as_deref(), Some("Character"));
    }

    #[test]
    fn element_payload_tolerates_sparse_records() {
        let payload: ElementPayload =
            serde_json::from_value(serde_json::json!({ "id": "el-9" })).unwrap();
        let raw = payload.into_raw_element();
        assert_eq!(raw.id, "el-9");
        assert!(raw.name.is_none());
        assert!(raw.status.is_none());
    }
}
