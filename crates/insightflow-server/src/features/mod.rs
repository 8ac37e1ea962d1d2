//! Feature modules implementing the InsightFlow API
//!
//! Each feature is a vertical slice:
//! - `commands/` - write operations
//! - `queries/` - read operations
//! - `routes.rs` - HTTP handlers and the mapping of feature errors onto responses
//!
//! # Features
//!
//! - **datasets**: CSV and Excel upload, dataset listing and detail
//! - **analyses**: analysis creation, background processing, polling and insight generation
//! - **chat**: stateless conversation with the assistant

pub mod analyses;
pub mod chat;
pub mod datasets;
pub mod shared;

use axum::{extract::FromRef, Router};

use crate::identity::SharedIdentityProvider;
use crate::insights::SharedInsightGenerator;
use crate::jobs::{AnalysisEvents, AnalysisQueue};
use crate::store::SharedStore;

/// Shared state for all feature routes
#[derive(Clone, FromRef)]
pub struct FeatureState {
    pub store: SharedStore,
    /// Submission side of the analysis job queue
    pub queue: AnalysisQueue,
    pub events: AnalysisEvents,
    pub insights: SharedInsightGenerator,
    /// Resolves the caller of every request
    pub identity: SharedIdentityProvider,
}

/// Feature router, mounted by the API layer under `/api/v1`
///
/// - `/datasets` - dataset upload and lookup
/// - `/analyses` - analysis lifecycle
/// - `/chat` - assistant conversation
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/datasets", datasets::datasets_routes())
        .nest("/analyses", analyses::analyses_routes())
        .nest("/chat", chat::chat_routes())
        .with_state(state)
}
