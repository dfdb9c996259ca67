use crate::translation::prompt::{build_translation_prompt, clean_translation};
use crate::utils::config::ApiConfig;
use crate::utils::{CsvTranslatorError, Result, TranslateError};
use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub text: String,
    /// `None` lets the model detect the source language.
    pub source_lang: Option<String>,
    pub target_lang: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub text: String,
    pub tokens: Option<u64>,
}

/// A single, unretried call to a translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> std::result::Result<Translation, TranslateError>;
}

pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

impl GeminiClient {
    pub fn new(api: &ApiConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CsvTranslatorError::ConfigError(
                "API key is empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: api.endpoint.trim_end_matches('/').to_string(),
            model: api.model.clone(),
            api_key,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Translator for GeminiClient {
    async fn translate(
        &self,
        request: &TranslationRequest,
    ) -> std::result::Result<Translation, TranslateError> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(build_translation_prompt(request)),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.3 },
        };

        let response = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error_response(status.as_u16(), &body, retry_after));
        }

        let body = response.text().await?;
        let translation = parse_generate_response(&body)?;
        debug!(tokens = ?translation.tokens, "Gemini response received");

        Ok(Translation {
            text: clean_translation(&request.text, &translation.text),
            tokens: translation.tokens,
        })
    }
}

fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Gemini answers an invalid key with HTTP 400, so the body decides.
fn classify_error_response(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> TranslateError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (
            envelope.error.message.unwrap_or_else(|| body.to_string()),
            envelope.error.status,
        ),
        Err(_) => (body.to_string(), None),
    };

    let key_rejected = message.contains("API key not valid")
        || matches!(
            api_status.as_deref(),
            Some("UNAUTHENTICATED") | Some("PERMISSION_DENIED")
        );
    if key_rejected {
        return TranslateError::Auth { status, message };
    }
    if api_status.as_deref() == Some("RESOURCE_EXHAUSTED") {
        return TranslateError::RateLimited {
            status,
            message,
            retry_after,
        };
    }

    TranslateError::from_status(status, message, retry_after)
}

fn parse_generate_response(body: &str) -> std::result::Result<Translation, TranslateError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| TranslateError::MalformedResponse(e.to_string()))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(TranslateError::EmptyResponse(format!(
            "prompt blocked: {}",
            reason
        )));
    }

    let tokens = response
        .usage_metadata
        .as_ref()
        .and_then(|u| u.total_token_count);

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| TranslateError::EmptyResponse("no candidates".to_string()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(TranslateError::EmptyResponse(format!(
            "finish reason {}",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(Translation { text, tokens })
}
