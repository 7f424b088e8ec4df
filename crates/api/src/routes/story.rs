use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use fable_core::scene::recompute_scenes;
use fable_core::types::Scene;

use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Serialize)]
struct StoryResponse {
    text: String,
    scenes: Vec<Scene>,
}

/// GET /story -- the current story text and its scenes.
async fn get_story(State(state): State<AppState>) -> Json<DataResponse<StoryResponse>> {
    let story = state.story.read().await;
    Json(DataResponse {
        data: StoryResponse {
            text: story.text.clone(),
            scenes: story.scenes.clone(),
        },
    })
}

#[derive(Deserialize)]
struct PutStoryRequest {
    text: String,
}

/// PUT /story -- replace the story text and recompute its scenes.
///
/// Scenes whose content hash is unchanged keep their generated image,
/// prompt, and referenced assets; edited scenes are reset and re-matched
/// against the completed assets in the snapshot.
///
/// Recomputation is cheap but clients should still debounce keystrokes
/// (300-500 ms) rather than calling this on every edit.
async fn put_story(
    State(state): State<AppState>,
    Json(request): Json<PutStoryRequest>,
) -> Json<DataResponse<StoryResponse>> {
    // Snapshot lock first, story lock second, same order as everywhere else.
    let known_assets = state.snapshot.read().await.completed();

    let mut story = state.story.write().await;
    let scenes = recompute_scenes(&request.text, &story.scenes, &known_assets);
    story.text = request.text;
    story.scenes = scenes;

    tracing::debug!(scene_count = story.scenes.len(), "Story recomputed");
    Json(DataResponse {
        data: StoryResponse {
            text: story.text.clone(),
            scenes: story.scenes.clone(),
        },
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/story", get(get_story).put(put_story))
}
