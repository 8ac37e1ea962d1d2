//! Gemini `generateContent` client
//!
//! The API key travels in the `x-goog-api-key` header, never in the URL, so transport errors
//! (which carry the request URL) cannot expose it.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{
    build_chat_instruction, build_prompt, ChatRequest, InsightError, InsightGenerator,
    InsightRequest,
};
use crate::config::InsightsConfig;

/// Status string the API reports when a quota or rate limit is hit
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Text generation through the Gemini REST API
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(config: &InsightsConfig) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InsightError::Unavailable(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one `generateContent` request and return the text of the first candidate
    async fn generate_content(
        &self,
        body: &GenerateContentRequest<'_>,
    ) -> Result<String, InsightError> {
        let api_key = self.api_key.as_deref().ok_or(InsightError::NotConfigured)?;

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(body)
            .send()
            .await
            .map_err(send_failure)?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            InsightError::Unavailable(format!("failed to read response: {}", e.without_url()))
        })?;

        if !status.is_success() {
            return Err(classify_failure(status, &text));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| InsightError::Unavailable(format!("malformed response: {}", e)))?;

        parsed
            .into_text()
            .ok_or_else(|| InsightError::Unavailable("response contained no text".to_string()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<RequestPart<'a>>,
}

impl<'a> Content<'a> {
    fn text(role: Option<&'static str>, text: &'a str) -> Self {
        Self {
            role,
            parts: vec![RequestPart { text }],
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();

        (!text.trim().is_empty()).then_some(text)
    }
}

/// Map a transport failure to an error, logging it without the request URL
fn send_failure(e: reqwest::Error) -> InsightError {
    let timed_out = e.is_timeout();
    let e = e.without_url();
    tracing::error!(error = %e, "Text generation request could not be sent");

    InsightError::Unavailable(if timed_out {
        "request timed out".to_string()
    } else {
        "request failed".to_string()
    })
}

/// Map a non-success response to an error; the raw body is only logged
fn classify_failure(status: StatusCode, body: &str) -> InsightError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let api_status = envelope.as_ref().and_then(|e| e.error.status.as_deref());

    if status == StatusCode::TOO_MANY_REQUESTS || api_status == Some(RESOURCE_EXHAUSTED) {
        tracing::warn!(http_status = %status, "Text generation quota exceeded");
        return InsightError::QuotaExceeded;
    }

    let message = envelope
        .and_then(|e| e.error.message)
        .unwrap_or_else(|| body.chars().take(200).collect());
    tracing::error!(http_status = %status, error = %message, "Text generation request failed");

    InsightError::Unavailable(format!("upstream returned {}", status))
}

#[async_trait]
impl InsightGenerator for GeminiProvider {
    #[tracing::instrument(
        skip(self, request),
        fields(model = %self.model, dataset = %request.dataset_name)
    )]
    async fn generate(&self, request: &InsightRequest) -> Result<String, InsightError> {
        let prompt = build_prompt(request);
        let body = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content::text(None, &prompt)],
        };

        let insights = self.generate_content(&body).await?;

        tracing::info!(chars = insights.len(), "Insights generated");
        Ok(insights)
    }

    #[tracing::instrument(skip(self, request), fields(model = %self.model, turns = request.messages.len()))]
    async fn chat(&self, request: &ChatRequest) -> Result<String, InsightError> {
        let instruction = build_chat_instruction(request.context.as_deref());
        let body = GenerateContentRequest {
            system_instruction: Some(Content::text(None, &instruction)),
            contents: request
                .messages
                .iter()
                .map(|m| Content::text(Some(m.role.as_str()), &m.content))
                .collect(),
        };

        let reply = self.generate_content(&body).await?;

        tracing::info!(chars = reply.len(), "Chat reply generated");
        Ok(reply)
    }
}
