//! Caller identity
//!
//! Handlers never work out who the caller is themselves: they take a [`CurrentUser`] extractor,
//! which delegates to the [`IdentityProvider`] found in the router state. The default provider
//! trusts an upstream `x-user-id` header and, in demo deployments, falls back to a fixed user.
//! Swapping in real authentication only means providing another implementation.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::config::AuthConfig;

/// Header carrying the authenticated user id
pub const USER_ID_HEADER: &str = "x-user-id";

pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Authentication required")]
    Missing,

    #[error("Header 'x-user-id' does not hold a valid user id")]
    Invalid,
}

/// Resolves the user a request acts on behalf of
pub trait IdentityProvider: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Result<String, IdentityError>;
}

/// Identity taken from the `x-user-id` header, with an optional demo fallback
#[derive(Debug, Clone)]
pub struct HeaderIdentityProvider {
    demo_user_id: Option<String>,
}

impl HeaderIdentityProvider {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            demo_user_id: config.demo_mode.then(|| config.demo_user_id.clone()),
        }
    }

    /// Provider that rejects requests without the header
    pub fn strict() -> Self {
        Self { demo_user_id: None }
    }
}

impl IdentityProvider for HeaderIdentityProvider {
    fn resolve(&self, headers: &HeaderMap) -> Result<String, IdentityError> {
        match headers.get(USER_ID_HEADER) {
            Some(value) => value
                .to_str()
                .map(str::trim)
                .ok()
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .ok_or(IdentityError::Invalid),
            None => self.demo_user_id.clone().ok_or(IdentityError::Missing),
        }
    }
}

/// The resolved caller of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    SharedIdentityProvider: FromRef<S>,
{
    type Rejection = IdentityError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provider = SharedIdentityProvider::from_ref(state);
        let id = provider.resolve(&parts.headers)?;
        Ok(CurrentUser { id })
    }
}

impl IntoResponse for IdentityError {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("UNAUTHORIZED", self.to_string());
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    fn headers(user: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(user) = user {
            headers.insert(USER_ID_HEADER, user.parse().unwrap());
        }
        headers
    }

    fn demo_config() -> AuthConfig {
        AuthConfig {
            demo_mode: true,
            demo_user_id: "demo-user-id".to_string(),
        }
    }

    #[test]
    fn test_header_wins_over_demo_user() {
        let provider = HeaderIdentityProvider::new(&demo_config());
        assert_eq!(provider.resolve(&headers(Some("user-42"))), Ok("user-42".to_string()));
    }

    #[test]
    fn test_demo_fallback() {
        let provider = HeaderIdentityProvider::new(&demo_config());
        assert_eq!(provider.resolve(&headers(None)), Ok("demo-user-id".to_string()));
    }

    #[test]
    fn test_strict_requires_header() {
        let provider = HeaderIdentityProvider::strict();
        assert_eq!(provider.resolve(&headers(None)), Err(IdentityError::Missing));

        let disabled = HeaderIdentityProvider::new(&AuthConfig {
            demo_mode: false,
            ..demo_config()
        });
        assert_eq!(disabled.resolve(&headers(None)), Err(IdentityError::Missing));
    }

    #[test]
    fn test_blank_header_is_invalid() {
        let provider = HeaderIdentityProvider::new(&demo_config());
        assert_eq!(provider.resolve(&headers(Some("  "))), Err(IdentityError::Invalid));
    }

    #[tokio::test]
    async fn test_extractor_rejects_with_401() {
        let provider: SharedIdentityProvider = Arc::new(HeaderIdentityProvider::strict());
        let app = Router::new()
            .route("/", get(|user: CurrentUser| async move { user.id }))
            .with_state(provider);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(USER_ID_HEADER, "user-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
