//! Normalization boundary for provider element records.
//!
//! The provider's element payloads are dynamically shaped: category strings
//! vary in casing across API revisions, statuses can be absent while an
//! element is still materializing, and the thumbnail may live in any of
//! several optional fields. Everything crossing into the domain goes through
//! one explicit mapping per field, each with a defined default, so call sites
//! never branch on raw provider values.

use crate::types::{Asset, AssetCategory, AssetStatus};

/// Base URL for generated placeholder thumbnails.
const PLACEHOLDER_BASE: &str = "https://placehold.co/400x300/374151/9CA3AF";

/// A provider element as fetched, before normalization.
///
/// Field names follow the domain, not the wire: the provider crate maps its
/// deserialized payloads into this shape first.
#[derive(Debug, Clone, Default)]
pub struct RawElement {
    pub id: String,
    pub name: Option<String>,
    /// The provider calls this `instancePrompt`.
    pub trigger_word: Option<String>,
    /// The provider calls this `focus`.
    pub category: Option<String>,
    pub status: Option<String>,
    pub thumbnail_url: Option<String>,
    /// URLs of the element's training-dataset images, when known.
    pub dataset_image_urls: Vec<String>,
}

/// Map a provider category string to the internal fixed set.
///
/// Matching is case-insensitive; anything unrecognized (or absent) folds to
/// [`AssetCategory::General`], the provider's own default focus.
pub fn normalize_category(raw: Option<&str>) -> AssetCategory {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("character") => AssetCategory::Character,
        Some("object") => AssetCategory::Object,
        Some("style") => AssetCategory::Style,
        Some("product") => AssetCategory::Product,
        Some("face") => AssetCategory::Face,
        _ => AssetCategory::General,
    }
}

/// Map a provider status string to [`AssetStatus`].
///
/// Missing or unrecognized statuses map to the [`AssetStatus::Unknown`]
/// sentinel, never to a terminal state, so a transiently omitted field cannot
/// fake a completion or a failure.
pub fn normalize_status(raw: Option<&str>) -> AssetStatus {
    match raw.map(str::to_ascii_uppercase).as_deref() {
        Some("PENDING") => AssetStatus::Pending,
        Some("TRAINING") => AssetStatus::Training,
        Some("PROCESSING") => AssetStatus::Processing,
        Some("COMPLETE") => AssetStatus::Complete,
        Some("FAILED") => AssetStatus::Failed,
        _ => AssetStatus::Unknown,
    }
}

/// Select a thumbnail via the prioritized fallback chain:
/// explicit thumbnail field, then the first training-dataset image, then a
/// generated placeholder keyed by the asset name.
pub fn select_thumbnail(
    thumbnail_url: Option<&str>,
    dataset_image_urls: &[String],
    name: &str,
) -> String {
    if let Some(url) = thumbnail_url.filter(|u| !u.trim().is_empty()) {
        return url.to_string();
    }
    if let Some(url) = dataset_image_urls.first().filter(|u| !u.trim().is_empty()) {
        return url.to_string();
    }
    placeholder_url(name)
}

/// Placeholder image URL keyed by the asset name.
fn placeholder_url(name: &str) -> String {
    let label = if name.trim().is_empty() {
        "No+Image".to_string()
    } else {
        name.trim().replace(' ', "+")
    };
    format!("{PLACEHOLDER_BASE}?text={label}")
}

/// Normalize one raw provider element into the internal [`Asset`] shape.
///
/// `is_favorite` always starts `false`; the reconciler carries the previous
/// snapshot's flag forward afterwards.
pub fn normalize_element(raw: RawElement) -> Asset {
    let name = raw.name.unwrap_or_default();
    let image_url = Some(select_thumbnail(
        raw.thumbnail_url.as_deref(),
        &raw.dataset_image_urls,
        &name,
    ));
    Asset {
        id: raw.id,
        trigger_word: raw.trigger_word.unwrap_or_default(),
        category: normalize_category(raw.category.as_deref()),
        status: normalize_status(raw.status.as_deref()),
        image_url,
        is_favorite: false,
        name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- Category mapping --

    #[test]
    fn category_known_values() {
        assert_eq!(
            normalize_category(Some("Character")),
            AssetCategory::Character
        );
        assert_eq!(normalize_category(Some("Object")), AssetCategory::Object);
        assert_eq!(normalize_category(Some("Style")), AssetCategory::Style);
        assert_eq!(normalize_category(Some("Product")), AssetCategory::Product);
        assert_eq!(normalize_category(Some("Face")), AssetCategory::Face);
        assert_eq!(normalize_category(Some("General")), AssetCategory::General);
    }

    #[test]
    fn category_is_case_insensitive() {
        assert_eq!(
            normalize_category(Some("CHARACTER")),
            AssetCategory::Character
        );
        assert_eq!(normalize_category(Some("style")), AssetCategory::Style);
    }

    #[test]
    fn category_unknown_defaults_to_general() {
        assert_eq!(normalize_category(Some("Landscape")), AssetCategory::General);
        assert_eq!(normalize_category(None), AssetCategory::General);
    }

    // -- Status mapping --

    #[test]
    fn status_known_values() {
        assert_eq!(normalize_status(Some("COMPLETE")), AssetStatus::Complete);
        assert_eq!(normalize_status(Some("TRAINING")), AssetStatus::Training);
        assert_eq!(normalize_status(Some("PENDING")), AssetStatus::Pending);
        assert_eq!(normalize_status(Some("PROCESSING")), AssetStatus::Processing);
        assert_eq!(normalize_status(Some("FAILED")), AssetStatus::Failed);
    }

    #[test]
    fn status_missing_is_unknown_not_terminal() {
        assert_eq!(normalize_status(None), AssetStatus::Unknown);
        assert_eq!(normalize_status(Some("EXPLODED")), AssetStatus::Unknown);
    }

    #[test]
    fn status_mixed_case_still_maps() {
        assert_eq!(normalize_status(Some("complete")), AssetStatus::Complete);
    }

    // -- Thumbnail fallback chain --

    #[test]
    fn thumbnail_prefers_explicit_field() {
        let url = select_thumbnail(
            Some("https://cdn.example/thumb.png"),
            &["https://cdn.example/ds1.png".into()],
            "Elara",
        );
        assert_eq!(url, "https://cdn.example/thumb.png");
    }

    #[test]
    fn thumbnail_falls_back_to_first_dataset_image() {
        let url = select_thumbnail(
            None,
            &[
                "https://cdn.example/ds1.png".into(),
                "https://cdn.example/ds2.png".into(),
            ],
            "Elara",
        );
        assert_eq!(url, "https://cdn.example/ds1.png");
    }

    #[test]
    fn thumbnail_empty_string_counts_as_missing() {
        let url = select_thumbnail(Some("  "), &[], "Elara");
        assert!(url.starts_with(PLACEHOLDER_BASE));
    }

    #[test]
    fn thumbnail_placeholder_is_keyed_by_name() {
        let url = select_thumbnail(None, &[], "Night Market");
        assert!(url.ends_with("text=Night+Market"));
    }

    // -- Full element normalization --

    #[test]
    fn element_normalizes_all_fields() {
        let asset = normalize_element(RawElement {
            id: "el-7".into(),
            name: Some("Elara".into()),
            trigger_word: Some("elara_character".into()),
            category: Some("Character".into()),
            status: Some("COMPLETE".into()),
            thumbnail_url: Some("https://cdn.example/elara.png".into()),
            dataset_image_urls: vec![],
        });
        assert_eq!(asset.id, "el-7");
        assert_eq!(asset.name, "Elara");
        assert_eq!(asset.trigger_word, "elara_character");
        assert_eq!(asset.category, AssetCategory::Character);
        assert_eq!(asset.status, AssetStatus::Complete);
        assert_eq!(asset.image_url.as_deref(), Some("https://cdn.example/elara.png"));
        assert!(!asset.is_favorite);
    }

    #[test]
    fn element_with_everything_missing_gets_defaults() {
        let asset = normalize_element(RawElement {
            id: "el-8".into(),
            ..Default::default()
        });
        assert_eq!(asset.name, "");
        assert_eq!(asset.category, AssetCategory::General);
        assert_eq!(asset.status, AssetStatus::Unknown);
        assert!(asset.image_url.unwrap().starts_with(PLACEHOLDER_BASE));
    }
}
