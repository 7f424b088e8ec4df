pub mod assets;
pub mod generation;
pub mod health;
pub mod prompts;
pub mod story;
pub mod training;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /assets                          list current snapshot (GET)
/// /assets/refresh                  reconcile against the provider (POST)
/// /assets/{id}/favorite            set the favorite flag (PATCH)
///
/// /training/datasets               create a dataset (POST)
/// /training/datasets/{id}/images   upload a training image (POST, multipart)
/// /training/elements               start training an element (POST)
///
/// /generations                     submit + poll a generation (POST)
///
/// /prompts/enhance                 LLM scene prompt enhancement (POST)
/// /prompts/translate               LLM translation to English (POST)
/// /prompts/caption                 LLM image caption (POST, multipart)
///
/// /story                           current story text and scenes (GET)
/// /story                           replace story text, recompute scenes (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(assets::router())
        .merge(training::router())
        .merge(generation::router())
        .merge(prompts::router())
        .merge(story::router())
}
