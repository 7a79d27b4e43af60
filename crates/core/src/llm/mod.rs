pub mod error;
pub mod gemini;
pub mod json;
pub mod prompt;

pub use prompt::AnalysisRequestBuilder;

/// Everything sent to the structured-generation service for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub prompt: String,
    /// Response schema in the provider's OpenAPI-subset form.
    pub schema: serde_json::Value,
    pub system_instruction: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
        }
    }
}

/// Seam between the gateway and a concrete model API.
///
/// The credential is passed per call so the gateway can own the "is a key configured" check
/// and implementations stay free of configuration state.
#[async_trait::async_trait]
pub trait StructuredGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    /// Returns the raw text of the model's reply. Parsing is left to the caller.
    async fn generate(&self, api_key: &str, request: &AnalysisRequest) -> anyhow::Result<String>;
}
