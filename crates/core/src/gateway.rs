use crate::config::Settings;
use crate::domain::analysis::{
    Analysis, AnalysisResult, AnalysisSource, FailureReason, Recommendation,
};
use crate::domain::stock::StockSnapshot;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::gemini::GeminiClient;
use crate::llm::{json, AnalysisRequest, AnalysisRequestBuilder, StructuredGenerator};
use std::fmt;
use std::sync::Arc;

pub const FALLBACK_REASONING: [&str; 3] = [
    "ไม่สามารถเชื่อมต่อกับ AI ได้ในขณะนี้",
    "กรุณาตรวจสอบ API Key",
    "แสดงข้อมูลจำลองแทน",
];

pub const FALLBACK_RISK_ASSESSMENT: &str = "N/A";

const RAW_EXCERPT_CHARS: usize = 500;

/// The stand-in opinion returned whenever the model's answer is unavailable or untrustworthy.
/// The target price echoes the current price, i.e. "no change".
pub fn fallback_result(stock: &StockSnapshot) -> AnalysisResult {
    AnalysisResult {
        recommendation: Recommendation::Hold,
        confidence_score: 0.0,
        reasoning: FALLBACK_REASONING.iter().map(|s| s.to_string()).collect(),
        risk_assessment: FALLBACK_RISK_ASSESSMENT.to_string(),
        target_price: Some(stock.price),
    }
}

/// Runs one analysis against a structured-generation service and always yields a usable
/// [`Analysis`]. Holds no mutable state; clones share the generator.
#[derive(Clone)]
pub struct AnalysisGateway {
    api_key: Option<String>,
    generator: Arc<dyn StructuredGenerator>,
}

impl fmt::Debug for AnalysisGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisGateway")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider", &self.generator.provider())
            .finish()
    }
}

impl AnalysisGateway {
    pub fn new(api_key: Option<String>, generator: Arc<dyn StructuredGenerator>) -> Self {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        Self { api_key, generator }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let client = GeminiClient::from_settings(settings)?;
        if settings.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; analyses will return the fallback result");
        }
        Ok(Self::new(settings.gemini_api_key.clone(), Arc::new(client)))
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn analyze(&self, stock: &StockSnapshot) -> Analysis {
        let request = AnalysisRequestBuilder::build(stock);
        self.analyze_request(&request, stock).await
    }

    /// `stock` is only used to label the result and to build the fallback.
    pub async fn analyze_request(&self, request: &AnalysisRequest, stock: &StockSnapshot) -> Analysis {
        let source = match self.try_analyze(request).await {
            Ok(result) => {
                tracing::info!(
                    symbol = %stock.symbol,
                    recommendation = %result.recommendation,
                    confidence = result.confidence_score,
                    "analysis completed"
                );
                return Analysis {
                    symbol: stock.symbol.clone(),
                    result,
                    source: AnalysisSource::Live,
                };
            }
            Err((reason, err)) => {
                let error = format!("{err:#}");
                tracing::warn!(
                    symbol = %stock.symbol,
                    provider = self.generator.provider().as_str(),
                    %reason,
                    %error,
                    "analysis unavailable; returning fallback"
                );
                if let Some(diag) = err.downcast_ref::<LlmDiagnosticsError>() {
                    tracing::debug!(
                        symbol = %stock.symbol,
                        stage = diag.stage,
                        raw = diag.raw_excerpt(RAW_EXCERPT_CHARS).as_deref().unwrap_or(""),
                        "provider diagnostics"
                    );
                }
                AnalysisSource::Fallback { reason }
            }
        };

        Analysis {
            symbol: stock.symbol.clone(),
            result: fallback_result(stock),
            source,
        }
    }

    async fn try_analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, (FailureReason, anyhow::Error)> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err((
                FailureReason::MissingCredential,
                anyhow::anyhow!("no API key configured"),
            ));
        };

        let text = self
            .generator
            .generate(api_key, request)
            .await
            .map_err(|e| (FailureReason::Transport, e))?;
        if text.trim().is_empty() {
            return Err((
                FailureReason::Transport,
                anyhow::anyhow!("provider returned an empty reply"),
            ));
        }

        json::parse_analysis(&text).map_err(|e| (FailureReason::Contract, e))
    }
}
