use crate::domain::analysis::{AnalysisResult, Recommendation};
use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// The reply shape the model is asked to produce. Deserializing enforces presence and JSON
/// types of the required fields; `validate_and_into_result` enforces the value constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmAnalysis {
    pub recommendation: String,
    pub confidence_score: f64,
    pub reasoning: Vec<String>,
    pub risk_assessment: String,
    #[serde(default)]
    pub target_price: Option<f64>,
}

impl LlmAnalysis {
    pub fn validate_and_into_result(self) -> anyhow::Result<AnalysisResult> {
        let recommendation = self.recommendation.parse::<Recommendation>()?;

        ensure!(
            self.confidence_score.is_finite() && (0.0..=100.0).contains(&self.confidence_score),
            "confidenceScore must be between 0 and 100 (got {})",
            self.confidence_score
        );

        if let Some(target_price) = self.target_price {
            ensure!(
                target_price.is_finite() && target_price > 0.0,
                "targetPrice must be a positive number (got {target_price})"
            );
        }

        Ok(AnalysisResult {
            recommendation,
            confidence_score: self.confidence_score,
            reasoning: self.reasoning,
            risk_assessment: self.risk_assessment,
            target_price: self.target_price,
        })
    }
}
