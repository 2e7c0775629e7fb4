use async_trait::async_trait;
use serde_json::Value;

pub mod image;
pub mod moderation;
pub mod openrouter;
pub mod tags;

pub use openrouter::{GatewayError, OpenRouterClient};

/// Normalized image payload, whatever shape the provider answered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub base64: String,
}

impl GeneratedImage {
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// A structured chat-completion request: system instruction, user message and
/// a strict JSON schema the model must answer in.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub schema_name: &'static str,
    pub schema: Value,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Seam over the external model endpoints so services and tests can swap the
/// HTTP client out, mirroring how storage backends are seamed elsewhere.
#[async_trait]
pub trait ModelGateway: Send + Sync + 'static {
    /// Structured text completion; returns the parsed JSON content.
    async fn chat_json(&self, request: ChatRequest) -> Result<Value, GatewayError>;

    /// Image generation; returns the normalized image payload.
    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GatewayError>;
}
