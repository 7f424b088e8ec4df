//! Story-authoring language tasks.
//!
//! Each task is a thin prompt over [`LlmClient`]: enhancing a scene
//! description into a generation prompt, translating non-English scene text,
//! captioning training images, and writing one-line asset descriptions.

use serde::Deserialize;

use crate::client::{ChatRequest, LlmClient, LlmError};

/// Character context for prompt enhancement.
#[derive(Debug, Clone)]
pub struct CharacterContext {
    pub name: String,
    pub description: String,
    /// Hosted reference image; when present it is analyzed first and the
    /// visual traits are folded into the enhancement prompt.
    pub reference_image_url: Option<String>,
}

/// The JSON object the enhancement task asks the model for.
#[derive(Debug, Clone, Deserialize)]
pub struct EnhancedPrompt {
    pub prompt: String,
    pub negative_prompt: Option<String>,
}

/// Analyze a character reference image into a short visual description.
async fn analyze_character_image(client: &LlmClient, image_url: &str) -> Result<String, LlmError> {
    let request = ChatRequest::text(
        "Analyze this character's appearance, outfit, and distinguishing features \
         in detail. Describe them in a Japanese animation style.",
    )
    .with_image_url(image_url)
    .with_max_tokens(300);
    client.complete(request).await
}

/// Expand a plain scene description into a rich generation prompt.
///
/// Returns the model's `{ "prompt", "negative_prompt" }` object. When the
/// character has a reference image, one extra vision call runs first to
/// extract its visual traits.
pub async fn enhance_scene_prompt(
    client: &LlmClient,
    scene_description: &str,
    character: Option<&CharacterContext>,
) -> Result<EnhancedPrompt, LlmError> {
    let character_line = match character {
        Some(character) => {
            let analysis = match &character.reference_image_url {
                Some(url) => analyze_character_image(client, url).await?,
                None => String::new(),
            };
            format!("- {}: {} {}", character.name, character.description, analysis)
        }
        None => "No specific character for this scene.".to_string(),
    };

    let prompt = format!(
        r#"You are a master prompt engineer for an AI image generator specializing in 3D animation and anime styles. Your task is to expand a simple scene description into a rich, detailed, and artistic prompt.

**Style Guidelines:**
- Style: 3D Animation Style, cinematic, epic, vibrant colors, dynamic lighting, high detail, masterpiece.
- Artist/Studio Influence: Inspired by the styles of Studio Ghibli and Makoto Shinkai.
- Negative Prompt: blurry, deformed, ugly, bad anatomy, extra limbs, watermark, text, signature.

**Character for this scene:**
{character_line}

**Scene Description to enhance:**
"{scene_description}"

**Your Task:**
1. Analyze the "Scene Description".
2. If a character is listed above, you MUST incorporate their name and key visual traits into the final prompt.
3. Generate a JSON object with "prompt" and "negative_prompt" keys. The "prompt" should be a detailed, comma-separated list of tags combining characters, actions, environment, and style. Keep the prompt concise and under 1000 characters."#
    );

    tracing::debug!(
        scene_len = scene_description.len(),
        has_character = character.is_some(),
        "Enhancing scene prompt",
    );
    client.complete_json(ChatRequest::text(prompt)).await
}

/// Translate scene text to English for prompt consistency.
///
/// Character names are kept as-is so trigger words survive translation.
pub async fn translate_to_english(client: &LlmClient, text: &str) -> Result<String, LlmError> {
    let prompt = format!(
        r#"Translate the following text to English for use in an AI image generation prompt. Focus on visual descriptions and maintain the scene's atmosphere. Keep character names as they are.

Text: "{text}"

Provide only the English translation without any additional explanation."#
    );
    client
        .complete(ChatRequest::text(prompt).with_max_tokens(200))
        .await
}

/// Caption a training image in one sentence that includes the asset's
/// trigger token. The captions become per-image training labels.
pub async fn caption_reference_image(
    client: &LlmClient,
    image_bytes: &[u8],
    mime_type: &str,
    asset_name: &str,
) -> Result<String, LlmError> {
    let prompt = format!(
        r#"Describe this image in one sentence.
- Always include the character/object name: <{asset_name}>.
- Clearly state the pose, facial expression, emotion, scene mood, and style (e.g., flat color, thick outline).
- Example: "<{asset_name}> is standing with arms raised, smiling joyfully. The emotion is happiness. The scene is simple. Style: flat color, thick outline."
- Write in English."#
    );
    client
        .complete(
            ChatRequest::text(prompt)
                .with_image_bytes(mime_type, image_bytes)
                .with_max_tokens(100),
        )
        .await
}

/// Write a one-sentence description of an asset for the provider's
/// training metadata.
pub async fn describe_asset(
    client: &LlmClient,
    name: &str,
    category: &str,
) -> Result<String, LlmError> {
    let prompt = format!(
        "Write one concise sentence describing the visual appearance of \"{name}\" \
         (a {category} asset) for an AI image training dataset. \
         Provide only the sentence, no preamble."
    );
    client
        .complete(ChatRequest::text(prompt).with_max_tokens(60))
        .await
}
