//! Core domain types: jobs, assets, scenes.

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// The kind of work a job represents on the provider side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Custom element (LoRA) training.
    Training,
    /// Single-image generation for a scene.
    ImageGeneration,
}

impl JobKind {
    /// String representation for logging and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Training => "training",
            JobKind::ImageGeneration => "image_generation",
        }
    }

    /// Whether a completed job of this kind must carry an image URL.
    pub fn needs_image(&self) -> bool {
        matches!(self, JobKind::ImageGeneration)
    }
}

/// Lifecycle state of a submitted job.
///
/// Transitions are monotonic: once a terminal state is reached the poller
/// never issues another request for the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted by the provider; not yet observed running.
    Submitted,
    /// Observed in progress (also the default for unknown provider statuses).
    Processing,
    /// Finished successfully.
    Complete,
    /// Finished with a provider-reported failure.
    Failed,
    /// The poller exhausted its attempt budget. The provider-side job may
    /// still complete later; this is a poller-local verdict.
    TimedOut,
    /// The provider no longer knows the job id.
    NotFound,
}

impl JobState {
    /// Whether the poller should stop once this state is observed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Complete | JobState::Failed | JobState::TimedOut | JobState::NotFound
        )
    }

    /// String representation for logging and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Submitted => "submitted",
            JobState::Processing => "processing",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
            JobState::TimedOut => "timed_out",
            JobState::NotFound => "not_found",
        }
    }
}

/// Terminal payload of a successful job.
///
/// Generation jobs carry the first generated image URL; training jobs carry
/// nothing beyond the state (completion is observed later through asset
/// reconciliation).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub image_url: Option<String>,
}

/// One outstanding unit of asynchronous work submitted to the provider.
///
/// Created at submission, mutated only by the poller, and discarded once the
/// caller has consumed the terminal result. A `Job` is owned by the single
/// polling invocation tracking it; it is never shared across pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Opaque provider-issued identifier.
    pub id: String,
    pub kind: JobKind,
    pub state: JobState,
    pub submitted_at: Timestamp,
    pub result: Option<JobResult>,
}

impl Job {
    /// A freshly submitted job with the provider-issued id.
    pub fn submitted(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind,
            state: JobState::Submitted,
            submitted_at: chrono::Utc::now(),
            result: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

/// Normalized category of a trained asset.
///
/// The provider's vocabulary (its `focus` field) is folded into this fixed
/// set by [`crate::normalize::normalize_category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Character,
    Object,
    Style,
    Product,
    Face,
    #[default]
    General,
}

impl AssetCategory {
    /// The provider-side spelling used when submitting training jobs.
    pub fn provider_name(&self) -> &'static str {
        match self {
            AssetCategory::Character => "Character",
            AssetCategory::Object => "Object",
            AssetCategory::Style => "Style",
            AssetCategory::Product => "Product",
            AssetCategory::Face => "Face",
            AssetCategory::General => "General",
        }
    }
}

/// Training status of an asset as last observed from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Training,
    Processing,
    Complete,
    Failed,
    /// The provider returned no status (or an unrecognized one). Distinct
    /// from every known state so reconciliation never mistakes a missing
    /// field for a real transition.
    Unknown,
}

impl AssetStatus {
    /// Whether training is still underway.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            AssetStatus::Pending | AssetStatus::Training | AssetStatus::Processing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Training => "training",
            AssetStatus::Processing => "processing",
            AssetStatus::Complete => "complete",
            AssetStatus::Failed => "failed",
            AssetStatus::Unknown => "unknown",
        }
    }
}

/// A trained visual element (character, object, or style).
///
/// Mirrored from the provider's element list by the reconciler; `is_favorite`
/// is client-scoped and survives snapshot refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Provider-issued identifier, unique across the account.
    pub id: String,
    /// Display name; also the substring-match key against scene text.
    pub name: String,
    /// The token that activates this asset in a generation prompt.
    pub trigger_word: String,
    pub category: AssetCategory,
    pub status: AssetStatus,
    /// Thumbnail or reference image, with fallbacks applied at normalization.
    pub image_url: Option<String>,
    /// Client-scoped flag, independent of provider state.
    pub is_favorite: bool,
}

/// The subset of an [`Asset`] needed to steer a generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    pub name: String,
    pub trigger_word: String,
    /// Provider element id, when the generation call should attach the
    /// trained weights rather than rely on the trigger word alone.
    pub provider_asset_id: Option<String>,
}

impl From<&Asset> for AssetReference {
    fn from(asset: &Asset) -> Self {
        Self {
            name: asset.name.clone(),
            trigger_word: asset.trigger_word.clone(),
            provider_asset_id: Some(asset.id.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// One delimited segment of the authored story, mapped 1:1 to a generated
/// image.
///
/// Derived state: recomputed from the story text on every edit, with
/// `content_hash` deciding whether the previously generated image survives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// Raw trimmed text of the segment.
    pub description: String,
    /// Generated illustration, if any. Reset to `None` when the text changes.
    pub image_url: Option<String>,
    /// The enhanced prompt the image was generated with, if any.
    pub prompt: Option<String>,
    /// Completed assets whose name appears in `description`.
    pub referenced_assets: Vec<Asset>,
    /// Stable change-detection hash of the trimmed, lowercased text.
    pub content_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(JobState::Complete.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::TimedOut.is_terminal());
        assert!(JobState::NotFound.is_terminal());
        assert!(!JobState::Submitted.is_terminal());
        assert!(!JobState::Processing.is_terminal());
    }

    #[test]
    fn in_progress_statuses() {
        assert!(AssetStatus::Pending.is_in_progress());
        assert!(AssetStatus::Training.is_in_progress());
        assert!(AssetStatus::Processing.is_in_progress());
        assert!(!AssetStatus::Complete.is_in_progress());
        assert!(!AssetStatus::Failed.is_in_progress());
        assert!(!AssetStatus::Unknown.is_in_progress());
    }

    #[test]
    fn submitted_job_starts_clean() {
        let job = Job::submitted("gen-123", JobKind::ImageGeneration);
        assert_eq!(job.id, "gen-123");
        assert_eq!(job.state, JobState::Submitted);
        assert!(job.result.is_none());
    }

    #[test]
    fn asset_reference_from_asset() {
        let asset = Asset {
            id: "el-1".into(),
            name: "Elara".into(),
            trigger_word: "elara_character".into(),
            category: AssetCategory::Character,
            status: AssetStatus::Complete,
            image_url: None,
            is_favorite: false,
        };
        let r = AssetReference::from(&asset);
        assert_eq!(r.name, "Elara");
        assert_eq!(r.provider_asset_id.as_deref(), Some("el-1"));
    }
}
