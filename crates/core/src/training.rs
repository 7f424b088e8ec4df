//! Training request validation and table-driven hyperparameter defaults.
//!
//! Which category uses which epoch count and learning rate is tuning data,
//! not logic: the mapping lives in one overridable table rather than in
//! conditionals scattered through the submission path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::AssetCategory;

// ---------------------------------------------------------------------------
// Hyperparameters
// ---------------------------------------------------------------------------

/// Provider training hyperparameters for one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    pub resolution: u32,
    pub num_train_epochs: u32,
    pub learning_rate: f64,
    /// Whether to also train the text encoder.
    pub train_text_encoder: bool,
}

/// Base model version submitted with every training job.
pub const SD_VERSION: &str = "SDXL_1_0";

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            resolution: 1024,
            num_train_epochs: 100,
            learning_rate: 1e-6,
            train_text_encoder: true,
        }
    }
}

/// Category-to-hyperparameter mapping.
///
/// The defaults reflect the tuned values for animation-style assets:
/// characters train longer at a lower rate than the general baseline, styles
/// longer still. Override any category via [`with_override`](Self::with_override)
/// instead of editing the table.
#[derive(Debug, Clone, Default)]
pub struct TrainingTable {
    overrides: HashMap<AssetCategory, Hyperparameters>,
}

impl TrainingTable {
    /// The tuned per-category defaults.
    pub fn tuned() -> Self {
        let base = Hyperparameters::default();
        Self::default()
            .with_override(
                AssetCategory::Character,
                Hyperparameters {
                    num_train_epochs: 120,
                    learning_rate: 8e-7,
                    ..base
                },
            )
            .with_override(
                AssetCategory::Style,
                Hyperparameters {
                    num_train_epochs: 150,
                    learning_rate: 5e-7,
                    ..base
                },
            )
    }

    /// Replace the hyperparameters for one category.
    pub fn with_override(mut self, category: AssetCategory, params: Hyperparameters) -> Self {
        self.overrides.insert(category, params);
        self
    }

    /// Hyperparameters for a category, falling back to the baseline.
    pub fn params_for(&self, category: AssetCategory) -> Hyperparameters {
        self.overrides
            .get(&category)
            .copied()
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Training request
// ---------------------------------------------------------------------------

/// A domain-level request to train a new asset.
///
/// The dataset must already exist and its reference images must already be
/// uploaded; `image_ids` are the provider ids returned by those uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub name: String,
    pub trigger_word: String,
    pub category: AssetCategory,
    pub dataset_id: String,
    pub image_ids: Vec<String>,
    /// One-sentence description for the provider; generated by the LLM when
    /// absent.
    pub description: Option<String>,
}

/// Validate a training request before submission.
pub fn validate_training_request(request: &TrainingRequest) -> Result<(), CoreError> {
    if request.name.trim().is_empty() {
        return Err(CoreError::Validation("Asset name must not be empty".into()));
    }
    if request.trigger_word.trim().is_empty() {
        return Err(CoreError::Validation(
            "Trigger word must not be empty".into(),
        ));
    }
    if request.dataset_id.trim().is_empty() {
        return Err(CoreError::Validation("Dataset id must not be empty".into()));
    }
    if request.image_ids.is_empty() {
        return Err(CoreError::Validation(
            "At least one reference image is required for training".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TrainingRequest {
        TrainingRequest {
            name: "Elara".into(),
            trigger_word: "elara_character".into(),
            category: AssetCategory::Character,
            dataset_id: "ds-1".into(),
            image_ids: vec!["img-1".into()],
            description: None,
        }
    }

    // -- Hyperparameter table --

    #[test]
    fn tuned_character_params() {
        let table = TrainingTable::tuned();
        let p = table.params_for(AssetCategory::Character);
        assert_eq!(p.num_train_epochs, 120);
        assert_eq!(p.learning_rate, 8e-7);
        assert_eq!(p.resolution, 1024);
        assert!(p.train_text_encoder);
    }

    #[test]
    fn tuned_style_params() {
        let p = TrainingTable::tuned().params_for(AssetCategory::Style);
        assert_eq!(p.num_train_epochs, 150);
        assert_eq!(p.learning_rate, 5e-7);
    }

    #[test]
    fn unlisted_categories_use_baseline() {
        let table = TrainingTable::tuned();
        for category in [
            AssetCategory::Object,
            AssetCategory::Product,
            AssetCategory::Face,
            AssetCategory::General,
        ] {
            assert_eq!(table.params_for(category), Hyperparameters::default());
        }
    }

    #[test]
    fn overrides_replace_table_entries() {
        let table = TrainingTable::tuned().with_override(
            AssetCategory::Character,
            Hyperparameters {
                num_train_epochs: 42,
                ..Hyperparameters::default()
            },
        );
        assert_eq!(table.params_for(AssetCategory::Character).num_train_epochs, 42);
    }

    // -- Validation --

    #[test]
    fn valid_request_passes() {
        assert!(validate_training_request(&request()).is_ok());
    }

    #[test]
    fn empty_name_rejected() {
        let mut r = request();
        r.name = "  ".into();
        assert!(validate_training_request(&r).is_err());
    }

    #[test]
    fn empty_trigger_word_rejected() {
        let mut r = request();
        r.trigger_word = String::new();
        assert!(validate_training_request(&r).is_err());
    }

    #[test]
    fn no_reference_images_rejected() {
        let mut r = request();
        r.image_ids.clear();
        let err = validate_training_request(&r).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}
