use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use fable_core::training::TrainingRequest;
use fable_core::types::{AssetCategory, Job};
use fable_events::{PlatformEvent, EVENT_ASSET_TRAINING_STARTED};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Deserialize)]
struct CreateDatasetRequest {
    name: String,
    description: Option<String>,
}

#[derive(Serialize)]
struct CreateDatasetResponse {
    dataset_id: String,
}

/// POST /training/datasets -- create an empty training dataset.
async fn create_dataset(
    State(state): State<AppState>,
    Json(request): Json<CreateDatasetRequest>,
) -> AppResult<Json<DataResponse<CreateDatasetResponse>>> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("Dataset name must not be empty".into()));
    }
    let description = request
        .description
        .unwrap_or_else(|| format!("Training dataset for {}", request.name));

    let dataset_id = state.provider.create_dataset(&request.name, &description).await?;
    tracing::info!(dataset_id = %dataset_id, name = %request.name, "Dataset created");
    Ok(Json(DataResponse {
        data: CreateDatasetResponse { dataset_id },
    }))
}

#[derive(Serialize)]
struct UploadImageResponse {
    image_id: String,
}

/// POST /training/datasets/{id}/images -- upload one training image.
///
/// Expects a multipart form with a single `file` part carrying the image.
async fn upload_training_image(
    State(state): State<AppState>,
    Path(dataset_id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<UploadImageResponse>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .ok_or_else(|| AppError::BadRequest("Image part must have a filename".into()))?
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Could not read image bytes: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::BadRequest("Image file is empty".into()));
        }

        let image_id = state
            .uploader
            .upload_training_image(&dataset_id, &filename, bytes.to_vec())
            .await?;
        return Ok(Json(DataResponse {
            data: UploadImageResponse { image_id },
        }));
    }

    Err(AppError::BadRequest("Multipart body must contain a `file` part".into()))
}

#[derive(Deserialize)]
struct StartTrainingRequest {
    name: String,
    trigger_word: String,
    #[serde(default)]
    category: AssetCategory,
    dataset_id: String,
    #[serde(default)]
    image_ids: Vec<String>,
    description: Option<String>,
}

/// POST /training/elements -- start training a new element.
///
/// When no description is supplied, the LLM writes a one-liner; a failure
/// there falls back to a plain default rather than blocking training.
/// Responds 202: training runs for minutes and completion is observed via
/// asset refreshes, not this request.
async fn start_training(
    State(state): State<AppState>,
    Json(request): Json<StartTrainingRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Job>>)> {
    let description = match request.description {
        Some(description) => Some(description),
        None => {
            match fable_llm::describe_asset(
                &state.llm,
                &request.name,
                request.category.provider_name(),
            )
            .await
            {
                Ok(description) => Some(description),
                Err(error) => {
                    tracing::warn!(error = %error, "Asset description generation failed; using default");
                    None
                }
            }
        }
    };

    let training = TrainingRequest {
        name: request.name,
        trigger_word: request.trigger_word,
        category: request.category,
        dataset_id: request.dataset_id,
        image_ids: request.image_ids,
        description,
    };
    let job = state.submitter.submit_training(&training).await?;

    state.event_bus.publish(
        PlatformEvent::new(EVENT_ASSET_TRAINING_STARTED)
            .with_source("asset", job.id.clone())
            .with_payload(serde_json::json!({
                "name": training.name,
                "trigger_word": training.trigger_word,
            })),
    );

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/training/datasets", post(create_dataset))
        .route("/training/datasets/{id}/images", post(upload_training_image))
        .route("/training/elements", post(start_training))
}
