use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

impl Recommendation {
    pub const ALL: [Recommendation; 3] = [Self::Buy, Self::Sell, Self::Hold];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Recommendation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("recommendation must be one of BUY, SELL, HOLD (got {s:?})"))
    }
}

/// One investment opinion, either from the model or the local fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub recommendation: Recommendation,
    /// 0..=100.
    pub confidence_score: f64,
    pub reasoning: Vec<String>,
    pub risk_assessment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<f64>,
}

/// Why the gateway answered with the fallback instead of the model's opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// No credential configured; nothing was sent.
    MissingCredential,
    /// Network error, non-2xx status or an empty reply.
    Transport,
    /// The reply arrived but did not satisfy the response schema.
    Contract,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingCredential => "missing_credential",
            Self::Transport => "transport",
            Self::Contract => "contract",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisSource {
    Live,
    Fallback { reason: FailureReason },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub symbol: String,
    pub result: AnalysisResult,
    pub source: AnalysisSource,
}

impl Analysis {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, AnalysisSource::Fallback { .. })
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.source {
            AnalysisSource::Live => None,
            AnalysisSource::Fallback { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recommendation_parses_only_the_closed_set() {
        assert_eq!("SELL".parse::<Recommendation>().unwrap(), Recommendation::Sell);
        assert!("MAYBE".parse::<Recommendation>().is_err());
        assert!("buy".parse::<Recommendation>().is_err());
    }

    #[test]
    fn result_serializes_camel_case_without_absent_target() {
        let result = AnalysisResult {
            recommendation: Recommendation::Hold,
            confidence_score: 55.0,
            reasoning: vec!["r1".to_string()],
            risk_assessment: "moderate".to_string(),
            target_price: None,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["recommendation"], json!("HOLD"));
        assert_eq!(v["confidenceScore"], json!(55.0));
        assert_eq!(v["riskAssessment"], json!("moderate"));
        assert!(v.get("targetPrice").is_none());
    }

    #[test]
    fn fallback_source_carries_reason() {
        let v = serde_json::to_value(AnalysisSource::Fallback {
            reason: FailureReason::MissingCredential,
        })
        .unwrap();
        assert_eq!(v, json!({"kind": "fallback", "reason": "missing_credential"}));
    }
}
