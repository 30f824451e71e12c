pub mod openai;

use crate::domain::error::Result;
use async_trait::async_trait;

pub use openai::OpenAiClient;

/// One user turn: plain text, or a prompt paired with a base64 image payload
/// for vision-capable models.
#[derive(Debug, Clone)]
pub enum UserContent {
    Text(String),
    Image { prompt: String, payload: String },
}

/// The single request/response contract every model provider is invoked
/// through. Tests substitute scripted fakes at this seam.
#[async_trait]
pub trait LLMClient {
    async fn generate(&self, system: &str, user: &UserContent) -> Result<String>;
}
