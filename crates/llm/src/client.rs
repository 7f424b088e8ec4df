//! Minimal chat-completions HTTP client.
//!
//! Speaks the OpenAI-compatible `/chat/completions` wire format: a single
//! user message whose content is either plain text or text plus an image
//! part, optionally with a forced JSON response format.

use base64::Engine;
use serde::Deserialize;

/// Default chat model.
const DEFAULT_MODEL: &str = "gpt-4o";

/// Errors from the chat-completions layer.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The HTTP request itself failed.
    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code.
    #[error("LLM API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A 2xx response had no usable completion, or a JSON-mode completion
    /// did not parse.
    #[error("Unexpected LLM response: {0}")]
    Shape(String),
}

/// One chat-completions call under construction.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    content: Vec<serde_json::Value>,
    max_tokens: Option<u32>,
    json_response: bool,
}

impl ChatRequest {
    /// A plain text prompt.
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            content: vec![serde_json::json!({ "type": "text", "text": prompt.into() })],
            max_tokens: None,
            json_response: false,
        }
    }

    /// Attach a hosted image by URL (vision input).
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.content.push(serde_json::json!({
            "type": "image_url",
            "image_url": { "url": url.into() },
        }));
        self
    }

    /// Attach raw image bytes as a base64 data URL (vision input).
    pub fn with_image_bytes(self, mime_type: &str, bytes: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        self.with_image_url(format!("data:{mime_type};base64,{encoded}"))
    }

    /// Cap the completion length.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Force `response_format: json_object`. The prompt must still ask for
    /// JSON explicitly or the API rejects the request.
    pub fn expect_json(mut self) -> Self {
        self.json_response = true;
        self
    }

    /// The request body in wire format.
    pub(crate) fn into_body(self, model: &str) -> serde_json::Value {
        // A single text part is sent as a bare string; the array form is
        // only needed once image parts are involved.
        let content = if self.content.len() == 1 && self.content[0]["type"] == "text" {
            self.content[0]["text"].clone()
        } else {
            serde_json::Value::Array(self.content)
        };
        let mut body = serde_json::json!({
            "model": model,
            "messages": [{ "role": "user", "content": content }],
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = max_tokens.into();
        }
        if self.json_response {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions API client.
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Override the chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Run one completion and return the trimmed message content.
    pub async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let body = request.into_body(&self.model);
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LlmError::Shape("completion has no message content".into()))
    }

    /// Run a JSON-mode completion and deserialize the content.
    pub async fn complete_json<T: serde::de::DeserializeOwned>(
        &self,
        request: ChatRequest,
    ) -> Result<T, LlmError> {
        let content = self.complete(request.expect_json()).await?;
        serde_json::from_str(&content)
            .map_err(|e| LlmError::Shape(format!("completion is not the expected JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_content_stays_a_string() {
        let body = ChatRequest::text("hello").into_body("gpt-4o");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["model"], "gpt-4o");
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn image_parts_switch_content_to_an_array() {
        let body = ChatRequest::text("describe this")
            .with_image_url("https://cdn.example/ref.png")
            .with_max_tokens(100)
            .into_body("gpt-4o");

        let content = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["image_url"]["url"], "https://cdn.example/ref.png");
        assert_eq!(body["max_tokens"], 100);
    }

    #[test]
    fn image_bytes_become_a_data_url() {
        let body = ChatRequest::text("caption")
            .with_image_bytes("image/png", &[1, 2, 3])
            .into_body("gpt-4o");

        let url = body["messages"][0]["content"][1]["image_url"]["url"]
            .as_str()
            .unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn json_mode_sets_the_response_format() {
        let body = ChatRequest::text("answer in JSON").expect_json().into_body("gpt-4o");
        assert_eq!(body["response_format"]["type"], "json_object");
    }
}
