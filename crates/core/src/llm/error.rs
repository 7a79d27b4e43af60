use crate::llm::Provider;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct LlmDiagnosticsError {
    pub provider: Provider,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl LlmDiagnosticsError {
    /// What the provider actually sent, cut to `max_chars` characters.
    /// Prefers the raw body over the decoded JSON.
    pub fn raw_excerpt(&self, max_chars: usize) -> Option<String> {
        let raw = match (&self.raw_output, &self.raw_response_json) {
            (Some(text), _) => text.clone(),
            (None, Some(json)) => json.to_string(),
            (None, None) => return None,
        };
        if raw.chars().count() <= max_chars {
            return Some(raw);
        }
        let mut cut: String = raw.chars().take(max_chars).collect();
        cut.push('…');
        Some(cut)
    }
}

impl fmt::Display for LlmDiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LLM error (provider={}, stage={}): {}",
            self.provider.as_str(),
            self.stage,
            self.detail
        )
    }
}

impl std::error::Error for LlmDiagnosticsError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diag(raw_output: Option<&str>, raw_response_json: Option<Value>) -> LlmDiagnosticsError {
        LlmDiagnosticsError {
            provider: Provider::Gemini,
            stage: "http",
            detail: "status=503".to_string(),
            raw_output: raw_output.map(str::to_string),
            raw_response_json,
        }
    }

    #[test]
    fn raw_excerpt_prefers_body_text() {
        let err = diag(Some("upstream busy"), Some(json!({"error": 1})));
        assert_eq!(err.raw_excerpt(100).as_deref(), Some("upstream busy"));
    }

    #[test]
    fn raw_excerpt_falls_back_to_json_and_truncates_on_chars() {
        let err = diag(None, Some(json!({"promptFeedback": {"blockReason": "SAFETY"}})));
        assert!(err.raw_excerpt(200).unwrap().contains("SAFETY"));

        let thai = diag(Some("ราคาน้ำมัน"), None);
        assert_eq!(thai.raw_excerpt(4).as_deref(), Some("ราคา…"));

        assert!(diag(None, None).raw_excerpt(10).is_none());
    }

    #[test]
    fn display_names_provider_and_stage() {
        let err = diag(None, None);
        assert_eq!(err.to_string(), "LLM error (provider=gemini, stage=http): status=503");
    }
}
