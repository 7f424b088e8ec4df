//! Generation prompt composition and default generation parameters.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::AssetReference;

/// Negative prompt applied to every generation.
pub const NEGATIVE_PROMPT: &str =
    "blurry, deformed, ugly, bad anatomy, extra limbs, watermark, text, signature";

/// Style tags appended to every composed prompt.
pub const STYLE_SUFFIX: &str =
    "cinematic lighting, masterpiece, best quality, 3D Animation Style";

/// Default base model used for scene illustrations.
pub const DEFAULT_MODEL_ID: &str = "d69c8273-6b17-4a30-a13e-d6637ae1c644";

/// Provider parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model_id: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
    pub guidance_scale: u32,
    pub alchemy: bool,
    pub photo_real: bool,
    pub preset_style: String,
}

impl Default for GenerationParams {
    /// Portrait-format defaults tuned for storyboard frames.
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            width: 576,
            height: 1024,
            num_images: 1,
            guidance_scale: 8,
            alchemy: true,
            photo_real: false,
            preset_style: "ANIME".to_string(),
        }
    }
}

/// A domain-level request to illustrate one scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The scene text (or an LLM-enhanced prompt derived from it).
    pub scene_text: String,
    /// The primary asset referenced by the scene, if any.
    pub primary_asset: Option<AssetReference>,
    /// Overrides the fixed template when set.
    pub negative_prompt: Option<String>,
    #[serde(default)]
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(scene_text: impl Into<String>) -> Self {
        Self {
            scene_text: scene_text.into(),
            primary_asset: None,
            negative_prompt: None,
            params: GenerationParams::default(),
        }
    }

    pub fn with_asset(mut self, asset: AssetReference) -> Self {
        self.primary_asset = Some(asset);
        self
    }

    /// The negative prompt to submit: the override, or the fixed template.
    pub fn negative_prompt(&self) -> &str {
        self.negative_prompt.as_deref().unwrap_or(NEGATIVE_PROMPT)
    }
}

/// Validate a generation request before submission.
pub fn validate_generation_request(request: &GenerationRequest) -> Result<(), CoreError> {
    if request.scene_text.trim().is_empty() {
        return Err(CoreError::Validation("Scene text must not be empty".into()));
    }
    Ok(())
}

/// Compose the final generation prompt.
///
/// With a primary asset the trigger word and name lead the prompt so the
/// trained weights bind to the subject; the style suffix always closes it.
pub fn compose_prompt(scene_text: &str, primary_asset: Option<&AssetReference>) -> String {
    match primary_asset {
        Some(asset) => format!(
            "{}, {}, {}, {STYLE_SUFFIX}",
            asset.trigger_word,
            asset.name,
            scene_text.trim(),
        ),
        None => format!("{}, {STYLE_SUFFIX}", scene_text.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elara() -> AssetReference {
        AssetReference {
            name: "Elara".into(),
            trigger_word: "elara_character".into(),
            provider_asset_id: Some("el-1".into()),
        }
    }

    #[test]
    fn prompt_without_asset() {
        let prompt = compose_prompt("A hero stands on a rooftop.", None);
        assert_eq!(
            prompt,
            "A hero stands on a rooftop., cinematic lighting, masterpiece, best quality, 3D Animation Style"
        );
    }

    #[test]
    fn prompt_with_asset_leads_with_trigger() {
        let prompt = compose_prompt("Elara enters the alley.", Some(&elara()));
        assert!(prompt.starts_with("elara_character, Elara, "));
        assert!(prompt.ends_with(STYLE_SUFFIX));
    }

    #[test]
    fn default_negative_prompt_applies() {
        let request = GenerationRequest::new("scene");
        assert_eq!(request.negative_prompt(), NEGATIVE_PROMPT);
    }

    #[test]
    fn negative_prompt_can_be_overridden() {
        let mut request = GenerationRequest::new("scene");
        request.negative_prompt = Some("low-res".into());
        assert_eq!(request.negative_prompt(), "low-res");
    }

    #[test]
    fn empty_scene_text_rejected() {
        let request = GenerationRequest::new("   ");
        assert!(validate_generation_request(&request).is_err());
    }

    #[test]
    fn default_params_are_portrait() {
        let params = GenerationParams::default();
        assert_eq!(params.width, 576);
        assert_eq!(params.height, 1024);
        assert_eq!(params.num_images, 1);
        assert_eq!(params.preset_style, "ANIME");
    }
}
