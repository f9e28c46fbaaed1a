//! Generation and User records, plus the input/output rules applied around
//! a model call: request validation, fallback text, and truncation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::language::Language;

/// Longest prompt accepted, in characters.
pub const MAX_PROMPT_CHARS: usize = 3_000;

/// Longest code body persisted before the truncation marker is appended.
pub const MAX_CODE_CHARS: usize = 200_000;

/// Appended to code cut at [`MAX_CODE_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n/* truncated */";

/// Username of the shared placeholder account used for anonymous traffic.
pub const ANONYMOUS_USERNAME: &str = "demo_user";

/// An application user, keyed by the identity provider's subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A persisted code generation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: String,
    pub user_id: String,
    pub prompt: String,
    pub language: Language,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

/// The fields a caller supplies when creating a [`Generation`]; the store
/// assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGeneration {
    pub user_id: String,
    pub prompt: String,
    pub language: Language,
    pub code: String,
}

/// A validated generate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateInput {
    pub prompt: String,
    pub language: Language,
}

impl GenerateInput {
    /// Validate an arbitrary JSON body. Anything that is not an object is
    /// treated as an empty object, so the first complaint names `prompt`.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, ValidationError> {
        let empty = serde_json::Map::new();
        let fields = body.as_object().unwrap_or(&empty);

        let prompt = match fields.get("prompt") {
            None | Some(serde_json::Value::Null) => {
                return Err(ValidationError::new("prompt", "Required"));
            }
            Some(serde_json::Value::String(s)) => s,
            Some(_) => return Err(ValidationError::new("prompt", "Expected string")),
        };

        let len = prompt.chars().count();
        if len == 0 {
            return Err(ValidationError::new(
                "prompt",
                "must contain at least 1 character",
            ));
        }
        if len > MAX_PROMPT_CHARS {
            return Err(ValidationError::new(
                "prompt",
                format!("must contain at most {MAX_PROMPT_CHARS} characters"),
            ));
        }

        let language = fields
            .get("language")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<Language>().ok())
            .ok_or_else(|| {
                ValidationError::new(
                    "language",
                    format!("must be one of {}", Language::expected_list()),
                )
            })?;

        Ok(Self {
            prompt: prompt.clone(),
            language,
        })
    }
}

/// Placeholder code returned to the user when the model produced nothing.
pub fn fallback_code(prompt: &str) -> String {
    format!(
        "// [ERROR] API failed. Here is a fallback.\n// Prompt: {prompt}\n\n// Check server logs for HTTP errors.\n"
    )
}

/// Cut `code` to [`MAX_CODE_CHARS`] characters and append the marker.
/// Shorter input is returned unchanged.
pub fn truncate_code(code: String) -> String {
    match code.char_indices().nth(MAX_CODE_CHARS) {
        Some((byte_idx, _)) => {
            let mut cut = code;
            cut.truncate(byte_idx);
            cut.push_str(TRUNCATION_MARKER);
            cut
        }
        None => code,
    }
}

/// The value actually persisted for a model result: fallback when empty,
/// then truncated.
pub fn finalize_code(raw: String, prompt: &str) -> String {
    if raw.is_empty() {
        truncate_code(fallback_code(prompt))
    } else {
        truncate_code(raw)
    }
}
