use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{ChatRequest, ModelGateway};

/// Denylist checked before any model call is made. Bilingual because prompts
/// arrive in Polish and English alike.
const BLOCKED_KEYWORDS: [&str; 30] = [
    "przemoc",
    "violence",
    "krew",
    "blood",
    "śmierć",
    "death",
    "zabić",
    "kill",
    "broń",
    "weapon",
    "nóż",
    "knife",
    "pistolet",
    "gun",
    "strach",
    "horror",
    "zombie",
    "demon",
    "diabeł",
    "devil",
    "narkotyki",
    "drugs",
    "alkohol",
    "alcohol",
    "papieros",
    "cigarette",
    "seks",
    "sex",
    "nago",
    "naked",
];

const MODERATION_SYSTEM_PROMPT: &str = "Jesteś moderatorem treści dla aplikacji kolorowanek dla dzieci 0-12 lat.
Oceń czy prompt jest BEZPIECZNY.

ODRZUĆ: przemoc, treści dla dorosłych, horror, narkotyki, dyskryminację.
AKCEPTUJ: zwierzęta, pojazdy, fantasy, sport, jedzenie, święta.";

#[derive(Debug, Clone, Deserialize)]
pub struct SafetyVerdict {
    pub safe: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SafetyVerdict {
    fn allowed() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }
}

/// Two-stage safety check: keyword denylist first, then a model verdict.
///
/// Fails open. A broken or slow moderation endpoint must not lock legitimate
/// users out, so any gateway error counts as safe.
pub async fn check_prompt_safety(gateway: &dyn ModelGateway, prompt: &str) -> SafetyVerdict {
    if let Some(keyword) = find_blocked_keyword(prompt) {
        warn!(keyword, prompt_length = prompt.len(), "prompt blocked by keyword filter");
        return SafetyVerdict {
            safe: false,
            reason: Some("Niedozwolone słowo".to_string()),
        };
    }

    let request = ChatRequest {
        system: MODERATION_SYSTEM_PROMPT.to_string(),
        user: prompt.to_string(),
        schema_name: "safety_check",
        schema: json!({
            "type": "object",
            "properties": {
                "safe": {"type": "boolean"},
                "reason": {"type": "string"},
            },
            "required": ["safe", "reason"],
            "additionalProperties": false,
        }),
        temperature: 0.0,
        max_tokens: 100,
    };

    match gateway.chat_json(request).await {
        Ok(value) => match serde_json::from_value::<SafetyVerdict>(value) {
            Ok(verdict) => {
                if !verdict.safe {
                    warn!(
                        reason = verdict.reason.as_deref().unwrap_or(""),
                        prompt_length = prompt.len(),
                        "prompt rejected by moderation model"
                    );
                }
                verdict
            }
            Err(err) => {
                warn!(error = %err, "moderation verdict did not match schema, allowing");
                SafetyVerdict::allowed()
            }
        },
        Err(err) => {
            warn!(error = %err, "moderation call failed, allowing");
            SafetyVerdict::allowed()
        }
    }
}

fn find_blocked_keyword(prompt: &str) -> Option<&'static str> {
    let lowered = prompt.to_lowercase();
    BLOCKED_KEYWORDS
        .into_iter()
        .find(|keyword| lowered.contains(keyword))
}
