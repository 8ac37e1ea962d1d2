//! Chat API routes
//!
//! - `POST /api/v1/chat` - Answer the last user message of a conversation

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::commands::{SendChatCommand, SendChatError};
use crate::api::response::{ApiResponse, ErrorResponse};
use crate::features::FeatureState;
use crate::identity::CurrentUser;
use crate::insights::InsightError;

pub fn chat_routes() -> Router<FeatureState> {
    Router::new().route("/", post(send_message))
}

/// Send a chat message
///
/// # Request Body
///
/// ```json
/// {
///   "messages": [{"role": "user", "content": "Which column varies most?"}],
///   "context": "Dataset Q1 sales, descriptive analysis"
/// }
/// ```
///
/// # Response
///
/// - `200 OK` - `{"reply": "..."}`
/// - `400 Bad Request` - Empty or malformed conversation
/// - `500 Internal Server Error` - Assistant failed (`QUOTA_EXCEEDED` / `UPSTREAM_ERROR`)
#[tracing::instrument(skip(state, body), fields(user_id = %user.id))]
async fn send_message(
    State(state): State<FeatureState>,
    user: CurrentUser,
    body: Result<Json<SendChatCommand>, JsonRejection>,
) -> Result<Response, ChatApiError> {
    let Json(command) = body?;

    let response =
        super::commands::send::handle(state.insights.as_ref(), &user.id, command).await?;

    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[derive(Debug)]
enum ChatApiError {
    Body(JsonRejection),
    Send(SendChatError),
}

impl From<JsonRejection> for ChatApiError {
    fn from(err: JsonRejection) -> Self {
        Self::Body(err)
    }
}

impl From<SendChatError> for ChatApiError {
    fn from(err: SendChatError) -> Self {
        Self::Send(err)
    }
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        match self {
            ChatApiError::Send(SendChatError::Upstream(InsightError::QuotaExceeded)) => {
                let error = ErrorResponse::new(
                    "QUOTA_EXCEEDED",
                    "Assistant quota exceeded, please wait a minute and try again",
                );
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
            ChatApiError::Send(SendChatError::Upstream(ref e)) => {
                tracing::error!(error = %e, "Assistant request failed");
                let error = ErrorResponse::new("UPSTREAM_ERROR", "The assistant is unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
            ChatApiError::Body(_) | ChatApiError::Send(_) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
        }
    }
}

impl std::fmt::Display for ChatApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatApiError::Body(e) => write!(f, "Invalid request body: {}", e.body_text()),
            ChatApiError::Send(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::features::shared::test_helpers::{
        json_request, send, FakeInsightGenerator, FakeOutcome, TestApp,
    };
    use crate::insights::{ChatMessage, ChatRole};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use serde_json::json;

    #[tokio::test]
    async fn test_chat_replies() {
        let app = TestApp::with_insights(FakeInsightGenerator::replying("Verileriniz güvende."));

        let (status, body) = send(
            app.router(),
            json_request(
                Method::POST,
                "/chat",
                json!({
                    "messages": [
                        {"role": "user", "content": "Merhaba"},
                        {"role": "model", "content": "Merhaba!"},
                        {"role": "user", "content": "Verilerim güvende mi?"}
                    ],
                    "context": "Datasets page"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["reply"], "Verileriniz güvende.");

        let chats = app.insights.chat_requests();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].messages.len(), 3);
        assert_eq!(chats[0].messages[1].role, ChatRole::Model);
        assert_eq!(chats[0].messages[2], ChatMessage::user("Verilerim güvende mi?"));
        assert_eq!(chats[0].context.as_deref(), Some("Datasets page"));
    }

    #[tokio::test]
    async fn test_chat_rejects_invalid_bodies() {
        let app = TestApp::new();

        for body in [
            json!({}),
            json!({"messages": []}),
            json!({"messages": [{"role": "model", "content": "hello"}]}),
            json!({"messages": [{"role": "system", "content": "hello"}]}),
            json!({"messages": "hello"}),
        ] {
            let (status, response) =
                send(app.router(), json_request(Method::POST, "/chat", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
        }

        assert!(app.insights.chat_requests().is_empty());
    }

    #[tokio::test]
    async fn test_chat_upstream_errors_are_generic() {
        for (outcome, code) in [
            (FakeOutcome::QuotaExceeded, "QUOTA_EXCEEDED"),
            (FakeOutcome::Unavailable, "UPSTREAM_ERROR"),
        ] {
            let app = TestApp::with_insights(FakeInsightGenerator::new(outcome));

            let (status, body) = send(
                app.router(),
                json_request(
                    Method::POST,
                    "/chat",
                    json!({"messages": [{"role": "user", "content": "hi"}]}),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["error"]["code"], code);
            assert!(!body["error"]["message"].as_str().unwrap().contains("500"));
        }
    }

    #[tokio::test]
    async fn test_chat_requires_identity() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/chat")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"messages": [{"role": "user", "content": "hi"}]}).to_string(),
            ))
            .unwrap();

        let (status, body) = send(app.router(), request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }
}
