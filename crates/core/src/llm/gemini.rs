use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{AnalysisRequest, Provider, StructuredGenerator};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings
            .gemini_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = settings
            .gemini_model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let timeout_secs = settings.gemini_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            base_url,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn request_body(request: &AnalysisRequest) -> GenerateContentRequest<'_> {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system_instruction,
                }],
            },
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &request.schema,
            },
        }
    }

    async fn generate_content(
        &self,
        api_key: &str,
        request: &AnalysisRequest,
    ) -> anyhow::Result<(serde_json::Value, GenerateContentResponse)> {
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", HeaderValue::from_str(api_key)?);

        let res = self
            .http
            .post(self.url())
            .headers(headers)
            .json(&Self::request_body(request))
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<serde_json::Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        let raw_json = serde_json::from_str::<serde_json::Value>(&text)
            .with_context(|| format!("failed to parse Gemini response JSON: {text}"))?;
        let parsed = serde_json::from_value::<GenerateContentResponse>(raw_json.clone())
            .context("failed to decode Gemini response into GenerateContentResponse")?;
        Ok((raw_json, parsed))
    }

    fn response_text(
        res: &GenerateContentResponse,
        raw_json: &serde_json::Value,
    ) -> anyhow::Result<String> {
        let mut out = String::new();
        if let Some(candidate) = res.candidates.first() {
            for part in candidate.content.iter().flat_map(|c| c.parts.iter()) {
                if let Some(text) = &part.text {
                    out.push_str(text);
                }
            }
        }

        if out.trim().is_empty() {
            let detail = match (
                res.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()),
                res.candidates.first().and_then(|c| c.finish_reason.as_deref()),
            ) {
                (Some(block), _) => format!("prompt blocked: {block}"),
                (None, Some(finish)) => format!("no text in reply (finishReason={finish})"),
                (None, None) => "no candidates in reply".to_string(),
            };
            return Err(LlmDiagnosticsError {
                provider: Provider::Gemini,
                stage: "empty_response",
                detail,
                raw_output: None,
                raw_response_json: Some(raw_json.clone()),
            }
            .into());
        }

        Ok(out)
    }
}

#[async_trait::async_trait]
impl StructuredGenerator for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate(&self, api_key: &str, request: &AnalysisRequest) -> anyhow::Result<String> {
        let started = Instant::now();
        let (raw_json, res) = self.generate_content(api_key, request).await?;
        tracing::debug!(
            model = %self.model,
            elapsed_ms = started.elapsed().as_millis(),
            "Gemini generateContent completed"
        );
        Self::response_text(&res, &raw_json)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: Content<'a>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Clone, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Clone, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,

    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,

    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AnalysisRequestBuilder;
    use crate::market::mock::fixture_stocks;
    use serde_json::json;

    fn decode(v: &serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(v.clone()).unwrap()
    }

    #[test]
    fn request_body_matches_generate_content_shape() {
        let req = AnalysisRequestBuilder::build(&fixture_stocks()[0]);
        let body = serde_json::to_value(GeminiClient::request_body(&req)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], json!(req.prompt));
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(
            body["systemInstruction"]["parts"][0]["text"],
            json!(req.system_instruction)
        );
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], req.schema);
    }

    #[test]
    fn url_uses_model_and_trims_base() {
        let settings = Settings {
            gemini_base_url: Some("http://localhost:8080/".to_string()),
            gemini_model: Some("gemini-test".to_string()),
            ..Default::default()
        };
        let client = GeminiClient::from_settings(&settings).unwrap();
        assert_eq!(
            client.url(),
            "http://localhost:8080/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn response_text_concatenates_parts_of_first_candidate() {
        let raw = json!({
            "candidates": [
                {
                    "content": {"role": "model", "parts": [{"text": "{\"a\":"}, {"text": "1}"}]},
                    "finishReason": "STOP"
                },
                {
                    "content": {"role": "model", "parts": [{"text": "ignored"}]}
                }
            ]
        });
        let text = GeminiClient::response_text(&decode(&raw), &raw).unwrap();
        assert_eq!(text, "{\"a\":1}");
    }

    #[test]
    fn response_text_rejects_blocked_and_empty_replies() {
        let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = GeminiClient::response_text(&decode(&blocked), &blocked).unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "empty_response");
        assert!(diag.detail.contains("SAFETY"));

        let no_text = json!({"candidates": [{"finishReason": "MAX_TOKENS"}]});
        let err = GeminiClient::response_text(&decode(&no_text), &no_text).unwrap_err();
        assert!(err.to_string().contains("MAX_TOKENS"));

        let empty = json!({});
        assert!(GeminiClient::response_text(&decode(&empty), &empty).is_err());
    }
}
