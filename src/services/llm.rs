use crate::config::{ApiStyle, LlmConfig};
use crate::error::GenerationError;
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::time::Instant;

/// The one boundary between this crate and a text-generation backend.
///
/// Implementations take a complete prompt and return the model's raw text.
/// Callers never retry and never post-process the result.
pub trait TextGenerator: Send + Sync {
    fn generate_text(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

pub struct LLMClient {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
    style: ApiStyle,
    temperature: f32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl LLMClient {
    pub fn new(config: &LlmConfig) -> Self {
        LLMClient {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            style: config.style,
            temperature: config.temperature,
        }
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        match self.style {
            ApiStyle::Ollama => json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": {
                    "temperature": self.temperature
                }
            }),
            ApiStyle::OpenAi => json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": self.temperature
            }),
        }
    }
}

impl TextGenerator for LLMClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        let started = Instant::now();

        let mut request_builder = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&self.request_body(prompt));

        if let Some(api_key) = &self.api_key {
            request_builder = request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: response_text,
            });
        }

        let text = parse_response(self.style, &response_text)?;
        tracing::info!(
            "generated {} chars from a {} char prompt in {:?}",
            text.chars().count(),
            prompt.chars().count(),
            started.elapsed()
        );
        Ok(text)
    }
}

/// Pulls the generated text out of a backend response body.
fn parse_response(style: ApiStyle, body: &str) -> Result<String, GenerationError> {
    let malformed = |e: serde_json::Error| GenerationError::MalformedResponse(e.to_string());
    match style {
        ApiStyle::Ollama => {
            let parsed: OllamaResponse = serde_json::from_str(body).map_err(malformed)?;
            Ok(parsed.response)
        }
        ApiStyle::OpenAi => {
            let parsed: ChatCompletion = serde_json::from_str(body).map_err(malformed)?;
            parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| GenerationError::MalformedResponse("no choices returned".to_string()))
        }
    }
}
