//! InsightFlow Server Library
//!
//! HTTP backend for uploading tabular datasets and running analyses over them.
//!
//! # Overview
//!
//! - **Datasets**: CSV or Excel upload, reduced to column metadata and a preview of the first rows
//! - **Analyses**: created `pending`, processed in the background, polled until `completed`
//!   or `failed`
//! - **Engine**: descriptive statistics and bar charts for every numeric column of the preview
//! - **Insights**: narrative text from an external text-generation model
//! - **Chat**: an assistant answering questions about the user's data through the same model
//!
//! # Architecture
//!
//! Each feature is a vertical slice under [`features`] with its own commands (writes), queries
//! (reads) and routes. Handlers receive the caller resolved by [`identity`] and talk to a
//! [`store::Store`], either in memory or PostgreSQL.
//!
//! Creating an analysis only persists it and submits an [`jobs::AnalysisJob`]. The
//! [`jobs::AnalysisWorker`] drains the queue, runs the [`engine`] and moves the analysis to a
//! terminal state, publishing an [`jobs::AnalysisEvent`] for each one to in-process subscribers.
//! HTTP clients poll the analysis until it is terminal.
//!
//! # Example
//!
//! ```no_run
//! use insightflow_server::{api, config::Config, features::FeatureState};
//!
//! async fn serve(state: FeatureState, config: Config) -> anyhow::Result<()> {
//!     let app = api::create_router(state, &config);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod features;
pub mod identity;
pub mod insights;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod store;
