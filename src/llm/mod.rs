pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_output_tokens: 600,
        }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API key (set GOOGLE_API_KEY)")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Google (Gemini) error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("model returned no text")]
    EmptyReply,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str, config: GenerationConfig) -> Result<String, LlmError>;
}
