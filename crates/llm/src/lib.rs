//! Chat-completions client and the story-authoring language tasks built on
//! top of it: scene prompt enhancement, translation, vision captioning, and
//! asset description generation.

pub mod client;
pub mod tasks;

pub use client::{ChatRequest, LlmClient, LlmError};
pub use tasks::{
    caption_reference_image, describe_asset, enhance_scene_prompt, translate_to_english,
    CharacterContext, EnhancedPrompt,
};
