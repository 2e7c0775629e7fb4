use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{ChatRequest, ModelGateway};

const TAG_PROMPT: &str =
    "Wygeneruj 3-5 tagów po polsku dla kolorowanki. Tagi to pojedyncze słowa, małe litery.";

/// Fallback tags when generation fails or the model answers garbage.
pub const DEFAULT_TAGS: [&str; 2] = ["kolorowanka", "dla dzieci"];

const MAX_TAGS: usize = 5;

/// Generates Polish search tags for a coloring page.
///
/// Fails soft. Tags only feed search and filtering, so any error falls back
/// to [`DEFAULT_TAGS`] instead of failing the surrounding generation.
pub async fn synthesize_tags(gateway: &dyn ModelGateway, prompt: &str) -> Vec<String> {
    let request = ChatRequest {
        system: TAG_PROMPT.to_string(),
        user: prompt.to_string(),
        schema_name: "tags",
        schema: json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
            },
            "required": ["tags"],
            "additionalProperties": false,
        }),
        temperature: 0.3,
        max_tokens: 100,
    };

    match gateway.chat_json(request).await {
        Ok(value) => match sanitize_tags(&value) {
            Some(tags) => {
                debug!(prompt_length = prompt.len(), count = tags.len(), "tags generated");
                tags
            }
            None => {
                warn!(prompt_length = prompt.len(), "unusable tags response, using defaults");
                default_tags()
            }
        },
        Err(err) => {
            warn!(error = %err, "tag generation failed, using defaults");
            default_tags()
        }
    }
}

pub fn default_tags() -> Vec<String> {
    DEFAULT_TAGS.iter().map(|tag| tag.to_string()).collect()
}

/// Normalizes a `{"tags": [...]}` payload: keeps non-empty strings,
/// lowercases and trims them, caps the count. `None` when nothing survives.
fn sanitize_tags(value: &Value) -> Option<Vec<String>> {
    let raw = value.get("tags")?.as_array()?;
    let tags: Vec<String> = raw
        .iter()
        .filter_map(Value::as_str)
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .take(MAX_TAGS)
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}
