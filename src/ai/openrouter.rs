use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use super::{ChatRequest, GeneratedImage, ModelGateway};

pub const TEXT_MODEL: &str = "openai/gpt-4o-mini";
pub const IMAGE_MODEL: &str = "bytedance-seed/seedream-4.5";

const TEXT_TIMEOUT: Duration = Duration::from_secs(15);
const IMAGE_TIMEOUT: Duration = Duration::from_secs(90);

/// Errors from the model provider, split so callers can map timeouts and
/// upstream failures to distinct API error codes.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model request timed out")]
    Timeout,
    #[error("model endpoint returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("model response carried no content")]
    MissingContent,
    #[error("model returned text instead of an image")]
    TextInsteadOfImage,
    #[error("could not parse model response: {0}")]
    Parse(String),
    #[error("model request failed: {0}")]
    Transport(String),
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// HTTP client for the OpenRouter chat-completions endpoint, used for both
/// structured text completions and image generation.
pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    referer: String,
}

impl OpenRouterClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, referer: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            referer: referer.into(),
        }
    }

    async fn post_completions(&self, body: Value, timeout: Duration) -> Result<Value, GatewayError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", "Malowanko")
            .timeout(timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|err| GatewayError::Parse(err.to_string()))?;
        Ok(value)
    }
}

#[async_trait]
impl ModelGateway for OpenRouterClient {
    async fn chat_json(&self, request: ChatRequest) -> Result<Value, GatewayError> {
        let body = json!({
            "model": TEXT_MODEL,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": request.user},
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "strict": true,
                    "schema": request.schema,
                },
            },
        });

        let response = self.post_completions(body, TEXT_TIMEOUT).await?;
        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(GatewayError::MissingContent)?;
        serde_json::from_str(content).map_err(|err| GatewayError::Parse(err.to_string()))
    }

    async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, GatewayError> {
        let body = json!({
            "model": IMAGE_MODEL,
            "messages": [{"role": "user", "content": prompt}],
            "modalities": ["image"],
        });

        let response = self.post_completions(body, IMAGE_TIMEOUT).await?;
        let message = response["choices"][0]
            .get("message")
            .ok_or(GatewayError::MissingContent)?;
        extract_image(message)
    }
}

/// Pulls an image out of a completion message, probing the response shapes
/// providers actually answer with, in order of how common they are.
pub fn extract_image(message: &Value) -> Result<GeneratedImage, GatewayError> {
    if let Some(images) = message.get("images").and_then(Value::as_array) {
        for entry in images {
            if let Some(image) = extract_from_images_entry(entry) {
                return Ok(image);
            }
        }
    }

    if let Some(image) = extract_from_content(&message["content"]) {
        return Ok(image);
    }

    if let Some(text) = message["content"].as_str() {
        if !text.trim().is_empty() {
            return Err(GatewayError::TextInsteadOfImage);
        }
    }

    Err(GatewayError::MissingContent)
}

/// One entry of a message-level `images` array. Seen in the wild as a bare
/// data URL, a raw base64 string, an `image_url` object, a `b64_json` object
/// or a plain `url` object.
fn extract_from_images_entry(entry: &Value) -> Option<GeneratedImage> {
    if let Some(text) = entry.as_str() {
        if let Some(image) = parse_data_url(text) {
            return Some(image);
        }
        // Long bare strings are raw base64 without a data-URL wrapper.
        if text.len() > 100 && !text.contains(' ') {
            return Some(GeneratedImage {
                mime_type: "image/png".to_string(),
                base64: text.to_string(),
            });
        }
        return None;
    }

    if let Some(url) = entry["image_url"]["url"].as_str() {
        return parse_data_url(url);
    }
    if let Some(b64) = entry["b64_json"].as_str() {
        return Some(GeneratedImage {
            mime_type: "image/png".to_string(),
            base64: b64.to_string(),
        });
    }
    if let Some(url) = entry["url"].as_str() {
        return parse_data_url(url);
    }
    None
}

/// Multimodal `content` array with typed parts.
fn extract_from_content(content: &Value) -> Option<GeneratedImage> {
    let parts = content.as_array()?;
    for part in parts {
        match part["type"].as_str() {
            Some("image_url") | Some("image") => {
                if let Some(url) = part["image_url"]["url"].as_str() {
                    if let Some(image) = parse_data_url(url) {
                        return Some(image);
                    }
                }
                if let Some(data) = part["inline_data"]["data"].as_str() {
                    let mime_type = part["inline_data"]["mime_type"]
                        .as_str()
                        .unwrap_or("image/png")
                        .to_string();
                    return Some(GeneratedImage {
                        mime_type,
                        base64: data.to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a `data:<mime>;base64,<payload>` URL into its parts.
pub fn parse_data_url(url: &str) -> Option<GeneratedImage> {
    let rest = url.strip_prefix("data:")?;
    let (mime_type, base64) = rest.split_once(";base64,")?;
    if mime_type.is_empty() || base64.is_empty() {
        return None;
    }
    Some(GeneratedImage {
        mime_type: mime_type.to_string(),
        base64: base64.to_string(),
    })
}
