use crate::domain::analysis::AnalysisResult;
use crate::domain::contract::LlmAnalysis;
use anyhow::Context;

pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        // Remove Markdown fences (```json ... ``` or ``` ... ```).
        let mut inner = trimmed;
        if let Some(after_first) = inner.split_once('\n').map(|(_, rest)| rest) {
            inner = after_first;
        }
        if let Some(end) = inner.rfind("```") {
            inner = &inner[..end];
        }
        return Some(inner.trim().to_string());
    }

    // Best-effort extraction: first '{' to last '}'.
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Parses and re-validates a model reply. The provider's schema support is advisory only.
pub fn parse_analysis(text: &str) -> anyhow::Result<AnalysisResult> {
    anyhow::ensure!(!text.trim().is_empty(), "LLM output is empty");
    let json_str = extract_json(text).unwrap_or_else(|| text.trim().to_string());
    let parsed = serde_json::from_str::<LlmAnalysis>(&json_str)
        .with_context(|| format!("LLM output does not match the analysis schema: {json_str}"))?;
    parsed.validate_and_into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::Recommendation;
    use serde_json::json;

    fn valid_json() -> String {
        json!({
            "recommendation": "SELL",
            "confidenceScore": 83,
            "reasoning": ["a", "b", "c"],
            "riskAssessment": "high",
        })
        .to_string()
    }

    #[test]
    fn extract_json_handles_fenced_blocks() {
        let body = "{\"a\":1}";
        let fenced = format!("```json\n{body}\n```\n");
        assert_eq!(extract_json(&fenced), Some(body.to_string()));
    }

    #[test]
    fn extract_json_falls_back_to_braces() {
        let s = "prefix {\"a\":1} suffix";
        assert_eq!(extract_json(s), Some("{\"a\":1}".to_string()));
    }

    #[test]
    fn parse_analysis_accepts_valid_json() {
        let result = parse_analysis(&valid_json()).unwrap();
        assert_eq!(result.recommendation, Recommendation::Sell);
        assert_eq!(result.confidence_score, 83.0);
        assert_eq!(result.reasoning, vec!["a", "b", "c"]);
        assert_eq!(result.risk_assessment, "high");
        assert_eq!(result.target_price, None);
    }

    #[test]
    fn parse_analysis_accepts_fenced_reply() {
        let fenced = format!("```json\n{}\n```", valid_json());
        assert!(parse_analysis(&fenced).is_ok());
    }

    #[test]
    fn parse_analysis_rejects_empty_and_prose() {
        assert!(parse_analysis("").is_err());
        assert!(parse_analysis("   ").is_err());
        assert!(parse_analysis("I think you should buy.").is_err());
    }

    #[test]
    fn parse_analysis_rejects_missing_recommendation() {
        let json = json!({
            "confidenceScore": 83,
            "reasoning": ["a"],
            "riskAssessment": "high",
        })
        .to_string();
        assert!(parse_analysis(&json).is_err());
    }
}
