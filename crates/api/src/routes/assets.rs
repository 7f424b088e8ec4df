use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use fable_core::error::CoreError;
use fable_core::reconcile::ReconcileOptions;
use fable_core::types::Asset;
use fable_events::{PlatformEvent, EVENT_ASSET_TRAINING_COMPLETED};

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /assets -- the last applied snapshot, in provider fetch order.
async fn list_assets(State(state): State<AppState>) -> Json<DataResponse<Vec<Asset>>> {
    let snapshot = state.snapshot.read().await;
    Json(DataResponse {
        data: snapshot.assets.clone(),
    })
}

#[derive(Serialize)]
struct RefreshResponse {
    assets: Vec<Asset>,
    /// Assets that newly reached `Complete` during this refresh.
    completed: Vec<Asset>,
}

/// POST /assets/refresh -- reconcile the snapshot against the provider.
///
/// Passes are serialized through `reconcile_lock`; a refresh that fails
/// leaves the previous snapshot in place. Each asset that transitioned to
/// `Complete` is published on the event bus exactly once.
async fn refresh_assets(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<RefreshResponse>>> {
    let _guard = state.reconcile_lock.lock().await;

    let previous = state.snapshot.read().await.clone();
    let mut outcome = state
        .reconciler
        .reconcile(&previous, ReconcileOptions::default())
        .await?;

    {
        // The diff ran against the pre-fetch clone, so a favorite toggled
        // while the provider fetch was in flight exists only in the live
        // snapshot. Re-apply flags from it under the write lock, then swap.
        let mut snapshot = state.snapshot.write().await;
        for asset in &mut outcome.snapshot.assets {
            if let Some(live) = snapshot.get(&asset.id) {
                asset.is_favorite = live.is_favorite;
            }
        }
        *snapshot = outcome.snapshot.clone();
    }

    for asset in &outcome.completed {
        state.event_bus.publish(
            PlatformEvent::new(EVENT_ASSET_TRAINING_COMPLETED)
                .with_source("asset", asset.id.clone())
                .with_payload(serde_json::json!({
                    "name": asset.name,
                    "trigger_word": asset.trigger_word,
                })),
        );
    }

    Ok(Json(DataResponse {
        data: RefreshResponse {
            assets: outcome.snapshot.assets,
            completed: outcome.completed,
        },
    }))
}

#[derive(Deserialize)]
struct FavoriteRequest {
    is_favorite: bool,
}

/// PATCH /assets/{id}/favorite -- set the client-scoped favorite flag.
///
/// Favorites never leave this service; reconciliation carries them across
/// snapshot refreshes.
async fn set_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<FavoriteRequest>,
) -> AppResult<Json<DataResponse<Asset>>> {
    let mut snapshot = state.snapshot.write().await;
    let asset = snapshot
        .assets
        .iter_mut()
        .find(|a| a.id == id)
        .ok_or(CoreError::NotFound {
            entity: "asset",
            id: id.clone(),
        })?;

    asset.is_favorite = request.is_favorite;
    tracing::debug!(asset_id = %id, is_favorite = request.is_favorite, "Favorite flag updated");
    Ok(Json(DataResponse {
        data: asset.clone(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/assets", get(list_assets))
        .route("/assets/refresh", post(refresh_assets))
        .route("/assets/{id}/favorite", patch(set_favorite))
}
