//! Narrative insight generation
//!
//! Insights are free text produced by an external text-generation model from the statistics of a
//! completed analysis. Generation is an optional enrichment: a failure here is reported to the
//! caller and never changes the analysis itself.
//!
//! The same model also backs the assistant chat: a system instruction built from the caller's
//! context plus the conversation so far, answered with one reply.
//!
//! The [`InsightGenerator`] trait is the seam between the features and the model. The production
//! implementation is [`GeminiProvider`].

pub mod gemini;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{AnalysisResults, AnalysisType};

pub use gemini::GeminiProvider;
pub use prompt::{build_chat_instruction, build_prompt};

/// Generator shared between request handlers
pub type SharedInsightGenerator = Arc<dyn InsightGenerator>;

/// Everything the model gets to see about an analysis
#[derive(Debug, Clone, PartialEq)]
pub struct InsightRequest {
    pub dataset_name: String,
    pub analysis_type: AnalysisType,
    pub results: AnalysisResults,
    /// `None` when unknown
    pub row_count: Option<i64>,
    /// `None` when unknown
    pub column_count: Option<i64>,
}

/// Author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    #[serde(alias = "assistant")]
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            content: content.into(),
        }
    }
}

/// A conversation to continue; the last message is the user's new turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Free-text description of what the user is looking at
    pub context: Option<String>,
}

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("Insight generation is not configured")]
    NotConfigured,

    #[error("Insight generation quota exceeded")]
    QuotaExceeded,

    #[error("Insight generation failed: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Generate narrative text for one analysis; a single attempt, no retry
    async fn generate(&self, request: &InsightRequest) -> Result<String, InsightError>;

    /// Answer the last user message of a conversation; a single attempt, no retry
    async fn chat(&self, request: &ChatRequest) -> Result<String, InsightError>;
}
