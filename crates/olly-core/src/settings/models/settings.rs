use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MODEL: &str = "llama2";
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant. Be concise and accurate in your responses.";
pub const DEFAULT_HISTORY_LENGTH: usize = 20;

pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Process-wide request settings, persisted on every change
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    /// Trailing messages sent upstream per request
    pub history_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_length: DEFAULT_HISTORY_LENGTH,
        }
    }
}

impl Settings {
    /// Bring every field back into its valid range
    pub fn sanitize(mut self) -> Self {
        self.temperature = if self.temperature.is_finite() {
            self.temperature.clamp(MIN_TEMPERATURE, MAX_TEMPERATURE)
        } else {
            DEFAULT_TEMPERATURE
        };
        if self.max_tokens == 0 {
            self.max_tokens = DEFAULT_MAX_TOKENS;
        }
        if self.history_length == 0 {
            self.history_length = DEFAULT_HISTORY_LENGTH;
        }
        if self.model.trim().is_empty() {
            self.model = DEFAULT_MODEL.to_string();
        }
        self
    }

    /// Merge a stored JSON object over the defaults, field by field.
    ///
    /// Fields that are missing or of the wrong type keep their default, so a
    /// single bad value does not discard the rest of the object. Returns
    /// `None` when `raw` is not a JSON object at all.
    pub fn merge_json(raw: &str) -> Option<Self> {
        let Value::Object(fields) = serde_json::from_str::<Value>(raw).ok()? else {
            return None;
        };

        let mut settings = Self::default();
        if let Some(model) = fields.get("model").and_then(Value::as_str) {
            settings.model = model.to_string();
        }
        if let Some(temperature) = fields.get("temperature").and_then(Value::as_f64) {
            settings.temperature = temperature as f32;
        }
        if let Some(max_tokens) = fields.get("maxTokens").and_then(Value::as_i64) {
            settings.max_tokens = positive(max_tokens).unwrap_or(DEFAULT_MAX_TOKENS);
        }
        if let Some(prompt) = fields.get("systemPrompt").and_then(Value::as_str) {
            settings.system_prompt = prompt.to_string();
        }
        if let Some(history) = fields.get("historyLength").and_then(Value::as_i64) {
            settings.history_length = positive(history).unwrap_or(DEFAULT_HISTORY_LENGTH);
        }

        Some(settings.sanitize())
    }
}

fn positive<T: TryFrom<i64>>(value: i64) -> Option<T> {
    if value > 0 { T::try_from(value).ok() } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model, "llama2");
        assert_eq!(settings.temperature, 1.0);
        assert_eq!(settings.max_tokens, 2048);
        assert_eq!(settings.history_length, 20);
        assert!(settings.system_prompt.starts_with("You are a helpful AI assistant."));
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert!(value.get("maxTokens").is_some());
        assert!(value.get("systemPrompt").is_some());
        assert!(value.get("historyLength").is_some());
    }

    #[test]
    fn test_sanitize_clamps_and_falls_back() {
        let settings = Settings {
            model: "  ".to_string(),
            temperature: 7.5,
            max_tokens: 0,
            history_length: 0,
            ..Settings::default()
        }
        .sanitize();

        assert_eq!(settings.model, "llama2");
        assert_eq!(settings.temperature, 2.0);
        assert_eq!(settings.max_tokens, 2048);
        assert_eq!(settings.history_length, 20);

        let cold = Settings {
            temperature: -1.0,
            ..Settings::default()
        }
        .sanitize();
        assert_eq!(cold.temperature, 0.0);

        let nan = Settings {
            temperature: f32::NAN,
            ..Settings::default()
        }
        .sanitize();
        assert_eq!(nan.temperature, 1.0);
    }

    #[test]
    fn test_merge_partial_object() {
        let settings = Settings::merge_json(r#"{"model":"mistral","temperature":0.2}"#).unwrap();
        assert_eq!(settings.model, "mistral");
        assert_eq!(settings.temperature, 0.2);
        assert_eq!(settings.max_tokens, 2048);
        assert_eq!(settings.history_length, 20);
    }

    #[test]
    fn test_merge_skips_bad_fields() {
        let settings = Settings::merge_json(
            r#"{"model":42,"maxTokens":-5,"historyLength":"ten","systemPrompt":"Be terse"}"#,
        )
        .unwrap();
        assert_eq!(settings.model, "llama2");
        assert_eq!(settings.max_tokens, 2048);
        assert_eq!(settings.history_length, 20);
        assert_eq!(settings.system_prompt, "Be terse");
    }

    #[test]
    fn test_merge_rejects_non_objects() {
        assert!(Settings::merge_json("not json").is_none());
        assert!(Settings::merge_json("[1,2]").is_none());
        assert!(Settings::merge_json("null").is_none());
    }
}
