use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use fable_core::prompt::{compose_prompt, GenerationRequest};
use fable_core::types::{AssetReference, AssetStatus};
use fable_events::{PlatformEvent, EVENT_GENERATION_COMPLETED, EVENT_GENERATION_FAILED};
use fable_provider::{poll_job, GenerationStatusSource, PollError};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Deserialize)]
struct GenerateRequest {
    scene_text: String,
    /// Asset whose trigger word leads the prompt. Must be `Complete`.
    asset_id: Option<String>,
    /// When set, the finished image and prompt are written back into this
    /// scene of the current story.
    scene_index: Option<usize>,
}

#[derive(Serialize)]
struct GenerateResponse {
    job_id: String,
    image_url: String,
    prompt: String,
}

/// POST /generations -- submit a generation job and poll it to completion.
///
/// Blocks for up to the poll budget (about three minutes by default). When
/// the budget runs out the job may still finish provider-side, so the
/// response is 202 `STILL_PROCESSING` with the job id rather than an error.
async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<Json<DataResponse<GenerateResponse>>> {
    let primary_asset = match &request.asset_id {
        Some(asset_id) => Some(resolve_asset(&state, asset_id).await?),
        None => None,
    };

    let mut generation = GenerationRequest::new(request.scene_text.clone());
    if let Some(asset) = primary_asset.clone() {
        generation = generation.with_asset(asset);
    }
    let prompt = compose_prompt(&request.scene_text, primary_asset.as_ref());

    let mut job = state.submitter.submit_generation(&generation).await?;

    let source = GenerationStatusSource::new(state.provider.clone());
    let outcome = poll_job(
        &source,
        &mut job,
        &state.config.generation_poll,
        &state.shutdown,
    )
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(error) => {
            if let PollError::Failed { job_id, .. } = &error {
                state.event_bus.publish(
                    PlatformEvent::new(EVENT_GENERATION_FAILED).with_source("job", job_id.clone()),
                );
            }
            return Err(AppError::Poll(error));
        }
    };
    let image_url = result
        .image_url
        .ok_or_else(|| AppError::InternalError("completed generation lost its image URL".into()))?;

    state.event_bus.publish(
        PlatformEvent::new(EVENT_GENERATION_COMPLETED)
            .with_source("job", job.id.clone())
            .with_payload(serde_json::json!({ "image_url": image_url })),
    );

    if let Some(index) = request.scene_index {
        attach_to_scene(&state, index, &image_url, &prompt, primary_asset).await;
    }

    Ok(Json(DataResponse {
        data: GenerateResponse {
            job_id: job.id,
            image_url,
            prompt,
        },
    }))
}

/// Look up a completed asset from the snapshot and turn it into a prompt
/// reference.
async fn resolve_asset(state: &AppState, asset_id: &str) -> AppResult<AssetReference> {
    let snapshot = state.snapshot.read().await;
    let asset = snapshot.get(asset_id).ok_or(fable_core::error::CoreError::NotFound {
        entity: "asset",
        id: asset_id.to_string(),
    })?;
    if asset.status != AssetStatus::Complete {
        return Err(AppError::BadRequest(format!(
            "Asset {:?} is not trained yet (status: {})",
            asset.name,
            asset.status.as_str(),
        )));
    }
    Ok(AssetReference::from(asset))
}

/// Write a finished generation back into the stored story, if the target
/// scene still exists.
async fn attach_to_scene(
    state: &AppState,
    index: usize,
    image_url: &str,
    prompt: &str,
    primary_asset: Option<AssetReference>,
) {
    // Resolve the full asset before touching the story lock; the snapshot
    // and story locks are always taken in snapshot-then-story order.
    let referenced = match primary_asset.as_ref().and_then(|a| a.provider_asset_id.as_deref()) {
        Some(id) => state.snapshot.read().await.get(id).cloned(),
        None => None,
    };

    let mut story = state.story.write().await;
    match story.scenes.get_mut(index) {
        Some(scene) => {
            scene.image_url = Some(image_url.to_string());
            scene.prompt = Some(prompt.to_string());
            if let Some(full) = referenced {
                if !scene.referenced_assets.iter().any(|a| a.id == full.id) {
                    scene.referenced_assets.push(full);
                }
            }
        }
        None => {
            tracing::warn!(scene_index = index, "Scene vanished before the image arrived");
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/generations", post(generate))
}
