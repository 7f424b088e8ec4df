use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use fable_llm::{caption_reference_image, enhance_scene_prompt, translate_to_english, CharacterContext, EnhancedPrompt};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Deserialize)]
struct EnhanceRequest {
    scene_text: String,
    character: Option<EnhanceCharacter>,
}

#[derive(Deserialize)]
struct EnhanceCharacter {
    name: String,
    #[serde(default)]
    description: String,
    reference_image_url: Option<String>,
}

/// POST /prompts/enhance -- expand a scene description into a rich
/// generation prompt via the LLM.
async fn enhance(
    State(state): State<AppState>,
    Json(request): Json<EnhanceRequest>,
) -> AppResult<Json<DataResponse<EnhancedPromptBody>>> {
    if request.scene_text.trim().is_empty() {
        return Err(AppError::BadRequest("Scene text must not be empty".into()));
    }

    let character = request.character.map(|c| CharacterContext {
        name: c.name,
        description: c.description,
        reference_image_url: c.reference_image_url,
    });
    let enhanced = enhance_scene_prompt(&state.llm, &request.scene_text, character.as_ref()).await?;
    Ok(Json(DataResponse {
        data: EnhancedPromptBody::from(enhanced),
    }))
}

#[derive(Serialize)]
struct EnhancedPromptBody {
    prompt: String,
    negative_prompt: Option<String>,
}

impl From<EnhancedPrompt> for EnhancedPromptBody {
    fn from(enhanced: EnhancedPrompt) -> Self {
        Self {
            prompt: enhanced.prompt,
            negative_prompt: enhanced.negative_prompt,
        }
    }
}

#[derive(Deserialize)]
struct TranslateRequest {
    text: String,
}

#[derive(Serialize)]
struct TranslateResponse {
    text: String,
}

/// POST /prompts/translate -- translate scene text to English, preserving
/// character names.
async fn translate(
    State(state): State<AppState>,
    Json(request): Json<TranslateRequest>,
) -> AppResult<Json<DataResponse<TranslateResponse>>> {
    if request.text.trim().is_empty() {
        return Err(AppError::BadRequest("Text must not be empty".into()));
    }
    let text = translate_to_english(&state.llm, &request.text).await?;
    Ok(Json(DataResponse {
        data: TranslateResponse { text },
    }))
}

#[derive(Serialize)]
struct CaptionResponse {
    caption: String,
}

/// POST /prompts/caption -- caption a training image in one sentence.
///
/// Multipart form: a `file` part with the image and a `name` text part with
/// the asset's trigger token, which the caption must contain.
async fn caption(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<CaptionResponse>>> {
    let mut image: Option<(String, Vec<u8>)> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let mime_type = field
                    .content_type()
                    .unwrap_or("image/png")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Could not read image bytes: {e}")))?;
                image = Some((mime_type, bytes.to_vec()));
            }
            Some("name") => {
                name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Could not read name: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let (mime_type, bytes) =
        image.ok_or_else(|| AppError::BadRequest("Multipart body must contain a `file` part".into()))?;
    let name = name.ok_or_else(|| AppError::BadRequest("Multipart body must contain a `name` part".into()))?;

    let caption = caption_reference_image(&state.llm, &bytes, &mime_type, &name).await?;
    Ok(Json(DataResponse {
        data: CaptionResponse { caption },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/prompts/enhance", post(enhance))
        .route("/prompts/translate", post(translate))
        .route("/prompts/caption", post(caption))
}
