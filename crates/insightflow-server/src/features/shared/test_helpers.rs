//! Test helpers and fixtures
//!
//! ```rust,ignore
//! use crate::features::shared::test_helpers::*;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let app = TestApp::new();
//!     let dataset = app.seed(TestDataset::sales().with_name("Q1")).await;
//!
//!     let (status, body) = send(app.router(), get_request("/analyses")).await;
//!     // ... assertions ...
//! }
//! ```

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use chrono::Utc;
use insightflow_common::{ColumnMeta, ColumnType, Row, ScalarValue};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::features::{self, FeatureState};
use crate::identity::{HeaderIdentityProvider, SharedIdentityProvider, USER_ID_HEADER};
use crate::insights::{ChatRequest, InsightError, InsightGenerator, InsightRequest};
use crate::jobs::{AnalysisEvents, AnalysisJob, AnalysisQueue, AnalysisWorker};
use crate::models::Dataset;
use crate::store::{MemoryStore, Store};

pub const TEST_USER: &str = "demo-user-id";

/// Build a row from `(column, value)` pairs, keeping their order
pub fn row(cells: &[(&str, ScalarValue)]) -> Row {
    cells
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Builder for test datasets
#[derive(Debug, Clone)]
pub struct TestDataset {
    pub user_id: String,
    pub name: String,
    pub columns: Vec<ColumnMeta>,
    pub preview: Vec<Row>,
    pub row_count: i64,
}

impl TestDataset {
    /// Three sales rows: text date and product columns, numeric `Satış` (15, 45, 32) and `Gelir`
    pub fn sales() -> Self {
        let preview = vec![
            row(&[
                ("Tarih", "2024-01-01".into()),
                ("Ürün", "Laptop".into()),
                ("Satış", 15i64.into()),
                ("Gelir", ScalarValue::Float(22500.0)),
            ]),
            row(&[
                ("Tarih", "2024-01-02".into()),
                ("Ürün", "Telefon".into()),
                ("Satış", 45i64.into()),
                ("Gelir", ScalarValue::Float(40500.5)),
            ]),
            row(&[
                ("Tarih", "2024-01-03".into()),
                ("Ürün", "Tablet".into()),
                ("Satış", 32i64.into()),
                ("Gelir", ScalarValue::Float(19200.0)),
            ]),
        ];

        Self {
            user_id: TEST_USER.to_string(),
            name: "Satış Verileri".to_string(),
            columns: vec![
                ColumnMeta::new("Tarih", ColumnType::String),
                ColumnMeta::new("Ürün", ColumnType::String),
                ColumnMeta::number("Satış"),
                ColumnMeta::number("Gelir"),
            ],
            row_count: preview.len() as i64,
            preview,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    /// Replace columns and preview; `row_count` follows the preview length
    pub fn with_sample(mut self, columns: Vec<ColumnMeta>, preview: Vec<Row>) -> Self {
        self.row_count = preview.len() as i64;
        self.columns = columns;
        self.preview = preview;
        self
    }

    pub fn with_row_count(mut self, row_count: i64) -> Self {
        self.row_count = row_count;
        self
    }

    pub fn build(self) -> Dataset {
        Dataset {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            name: self.name,
            description: None,
            file_name: "satislar.csv".to_string(),
            file_type: "text/csv".to_string(),
            file_size: 1024,
            row_count: self.row_count,
            column_count: self.columns.len() as i64,
            columns: self.columns,
            preview: self.preview,
            created_at: Utc::now(),
        }
    }
}

/// Scripted outcome of [`FakeInsightGenerator`]
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Reply(String),
    QuotaExceeded,
    Unavailable,
}

/// Insight generator returning a fixed outcome and recording every request
#[derive(Debug)]
pub struct FakeInsightGenerator {
    outcome: FakeOutcome,
    requests: Mutex<Vec<InsightRequest>>,
    chats: Mutex<Vec<ChatRequest>>,
}

impl FakeInsightGenerator {
    pub fn new(outcome: FakeOutcome) -> Self {
        Self {
            outcome,
            requests: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self::new(FakeOutcome::Reply(text.to_string()))
    }

    pub fn requests(&self) -> Vec<InsightRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chats.lock().unwrap().clone()
    }

    fn reply(&self) -> Result<String, InsightError> {
        match &self.outcome {
            FakeOutcome::Reply(text) => Ok(text.clone()),
            FakeOutcome::QuotaExceeded => Err(InsightError::QuotaExceeded),
            FakeOutcome::Unavailable => {
                Err(InsightError::Unavailable("upstream returned 500".to_string()))
            },
        }
    }
}

#[async_trait]
impl InsightGenerator for FakeInsightGenerator {
    async fn generate(&self, request: &InsightRequest) -> Result<String, InsightError> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply()
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String, InsightError> {
        self.chats.lock().unwrap().push(request.clone());
        self.reply()
    }
}

/// Feature state over a memory store, with handles to inspect it
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub insights: Arc<FakeInsightGenerator>,
    pub events: AnalysisEvents,
    pub state: FeatureState,
    receiver: Option<mpsc::Receiver<AnalysisJob>>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_insights(FakeInsightGenerator::replying("Satışlar istikrarlı biçimde artıyor."))
    }

    pub fn with_insights(insights: FakeInsightGenerator) -> Self {
        Self::build(insights, 16)
    }

    pub fn with_queue_capacity(capacity: usize) -> Self {
        Self::build(FakeInsightGenerator::replying("ok"), capacity)
    }

    fn build(insights: FakeInsightGenerator, queue_capacity: usize) -> Self {
        let store = Arc::new(MemoryStore::new());
        let insights = Arc::new(insights);
        let events = AnalysisEvents::default();
        let (queue, receiver) = AnalysisQueue::bounded(queue_capacity);
        let identity: SharedIdentityProvider = Arc::new(HeaderIdentityProvider::strict());

        let state = FeatureState {
            store: store.clone(),
            queue,
            events: events.clone(),
            insights: insights.clone(),
            identity,
        };

        Self {
            store,
            insights,
            events,
            state,
            receiver: Some(receiver),
        }
    }

    pub fn router(&self) -> Router {
        features::router(self.state.clone())
    }

    /// Close the queue so that every further submission is rejected
    pub fn close_queue(&mut self) {
        self.receiver = None;
    }

    /// Jobs submitted so far, without processing them
    pub fn queued_jobs(&mut self) -> Vec<AnalysisJob> {
        let mut jobs = Vec::new();
        if let Some(receiver) = self.receiver.as_mut() {
            while let Ok(job) = receiver.try_recv() {
                jobs.push(job);
            }
        }
        jobs
    }

    /// Start a worker draining the queue
    pub fn start_worker(&mut self) -> tokio::task::JoinHandle<()> {
        let receiver = self.receiver.take().unwrap();
        AnalysisWorker::new(receiver, self.store.clone(), self.events.clone(), 2).start()
    }

    pub async fn seed(&self, dataset: TestDataset) -> Dataset {
        let dataset = dataset.build();
        self.store.insert_dataset(&dataset).await.unwrap();
        dataset
    }
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(USER_ID_HEADER, TEST_USER)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, TEST_USER)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Drive one request through the router and decode the JSON body
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    use tower::ServiceExt;

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, body)
}
