//! Scene parsing and asset matching.
//!
//! The story text is split into scenes on a delimiter line, each scene gets a
//! stable content hash, and completed assets are matched into each scene by
//! case-insensitive substring on the asset name. Recomputation carries
//! previously generated images forward for scenes whose text has not
//! changed, so an edit to scene 2 never invalidates scenes 1 and 3.
//!
//! [`recompute_scenes`] is a pure function over explicit state. Debouncing
//! rapid story edits (300-500 ms is plenty) is the caller's concern.

use crate::hashing::sha256_hex;
use crate::types::{Asset, AssetStatus, Scene};

/// A line consisting of exactly this token (after trimming) separates scenes.
pub const SCENE_DELIMITER: &str = "---";

/// Split story text into trimmed scene descriptions, discarding empty
/// segments.
pub fn split_scenes(story_text: &str) -> Vec<String> {
    let mut scenes = Vec::new();
    let mut current = String::new();

    for line in story_text.lines() {
        if line.trim() == SCENE_DELIMITER {
            push_scene(&mut scenes, &mut current);
        } else {
            current.push_str(line);
            current.push('\n');
        }
    }
    push_scene(&mut scenes, &mut current);
    scenes
}

fn push_scene(scenes: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        scenes.push(trimmed.to_string());
    }
    current.clear();
}

/// Stable change-detection hash of a scene description.
///
/// Trim and lowercase first so whitespace-only and case-only edits do not
/// invalidate a generated image.
pub fn scene_hash(description: &str) -> String {
    sha256_hex(description.trim().to_lowercase().as_bytes())
}

/// The subset of `assets` referenced by the given scene text.
///
/// Only `Complete` assets participate. Matching is a literal,
/// case-insensitive substring check on the asset name; input order is
/// preserved.
pub fn match_assets(scene_text: &str, assets: &[Asset]) -> Vec<Asset> {
    let haystack = scene_text.to_lowercase();
    assets
        .iter()
        .filter(|a| a.status == AssetStatus::Complete)
        .filter(|a| !a.name.trim().is_empty())
        .filter(|a| haystack.contains(&a.name.to_lowercase()))
        .cloned()
        .collect()
}

/// Recompute the scene list from the current story text.
///
/// Scenes are index-aligned with their position in the text and compared to
/// `previous` by position. A scene whose content hash is unchanged keeps its
/// prior `image_url`, `prompt`, and `referenced_assets`; a changed or new
/// scene starts with no image and freshly matched assets.
pub fn recompute_scenes(story_text: &str, previous: &[Scene], known_assets: &[Asset]) -> Vec<Scene> {
    split_scenes(story_text)
        .into_iter()
        .enumerate()
        .map(|(index, description)| {
            let content_hash = scene_hash(&description);
            if let Some(prev) = previous.get(index).filter(|p| p.content_hash == content_hash) {
                return Scene {
                    description,
                    image_url: prev.image_url.clone(),
                    prompt: prev.prompt.clone(),
                    referenced_assets: prev.referenced_assets.clone(),
                    content_hash,
                };
            }
            Scene {
                referenced_assets: match_assets(&description, known_assets),
                image_url: None,
                prompt: None,
                description,
                content_hash,
            }
        })
        .collect()
}
