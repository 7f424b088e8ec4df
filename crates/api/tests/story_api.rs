//! Integration tests for story editing and scene recomputation.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, build_test_app, get, send_json};

use fable_core::reconcile::AssetSnapshot;
use fable_core::types::{Asset, AssetCategory, AssetStatus};

const NO_UPSTREAM: &str = "http://127.0.0.1:9";

fn completed_asset(name: &str) -> Asset {
    Asset {
        id: format!("el-{name}"),
        name: name.to_string(),
        trigger_word: format!("{}_character", name.to_lowercase()),
        category: AssetCategory::Character,
        status: AssetStatus::Complete,
        image_url: None,
        is_favorite: false,
    }
}

#[tokio::test]
async fn put_story_splits_on_delimiter_lines() {
    let (app, _state) = build_test_app(NO_UPSTREAM, NO_UPSTREAM);

    let response = send_json(
        app,
        Method::PUT,
        "/api/v1/story",
        serde_json::json!({ "text": "Elara wakes up.\n---\nShe walks into the forest.\n---\n\n" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let scenes = json["data"]["scenes"].as_array().unwrap();
    assert_eq!(scenes.len(), 2, "trailing empty segment is discarded");
    assert_eq!(scenes[0]["description"], "Elara wakes up.");
    assert!(scenes[0]["content_hash"].as_str().unwrap().len() == 64);
    assert!(scenes[0]["image_url"].is_null());
}

#[tokio::test]
async fn unchanged_scenes_keep_their_images_across_edits() {
    let (app, state) = build_test_app(NO_UPSTREAM, NO_UPSTREAM);

    let first = send_json(
        app.clone(),
        Method::PUT,
        "/api/v1/story",
        serde_json::json!({ "text": "Scene one.\n---\nScene two." }),
    )
    .await;
    assert_eq!(first.status(), StatusCode::OK);

    // Simulate a finished generation for scene one.
    {
        let mut story = state.story.write().await;
        story.scenes[0].image_url = Some("https://cdn.example/one.png".into());
        story.scenes[0].prompt = Some("scene one prompt".into());
    }

    // Edit only scene two.
    let second = send_json(
        app.clone(),
        Method::PUT,
        "/api/v1/story",
        serde_json::json!({ "text": "Scene one.\n---\nScene two, now different." }),
    )
    .await;
    let json = body_json(second).await;
    let scenes = json["data"]["scenes"].as_array().unwrap();

    assert_eq!(scenes[0]["image_url"], "https://cdn.example/one.png");
    assert_eq!(scenes[0]["prompt"], "scene one prompt");
    assert!(scenes[1]["image_url"].is_null(), "edited scene must reset");

    // GET /story agrees with the PUT response.
    let fetched = body_json(get(app, "/api/v1/story").await).await;
    assert_eq!(fetched["data"]["scenes"][0]["image_url"], "https://cdn.example/one.png");
}

#[tokio::test]
async fn scenes_reference_completed_assets_by_name() {
    let (app, state) = build_test_app(NO_UPSTREAM, NO_UPSTREAM);

    let mut training = completed_asset("Brom");
    training.status = AssetStatus::Training;
    *state.snapshot.write().await =
        AssetSnapshot::new(vec![completed_asset("Elara"), training]);

    let response = send_json(
        app,
        Method::PUT,
        "/api/v1/story",
        serde_json::json!({ "text": "elara and Brom cross the bridge." }),
    )
    .await;
    let json = body_json(response).await;
    let referenced = json["data"]["scenes"][0]["referenced_assets"].as_array().unwrap();

    // Matching is case-insensitive, but only completed assets qualify.
    assert_eq!(referenced.len(), 1);
    assert_eq!(referenced[0]["name"], "Elara");
}
