//! Caller identity
//!
//! Credential issuance lives outside this service. Requests carry an opaque
//! bearer token, and an [`IdentityProvider`] turns it into the [`OwnerId`]
//! every drive operation is scoped to.

use std::collections::BTreeMap;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use common::prelude::OwnerId;
use http::request::Parts;
use http::StatusCode;

use crate::ServiceState;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The owner a token belongs to, `None` if the token is not recognised.
    async fn resolve(&self, token: &str) -> Option<OwnerId>;
}

/// Fixed token table loaded from config.
#[derive(Debug, Clone, Default)]
pub struct StaticTokens {
    tokens: BTreeMap<String, OwnerId>,
}

impl StaticTokens {
    pub fn new(tokens: BTreeMap<String, String>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(token, owner)| (token, OwnerId::new(owner)))
                .collect(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokens {
    async fn resolve(&self, token: &str) -> Option<OwnerId> {
        self.tokens.get(token).cloned()
    }
}

/// The authenticated caller. Handlers take this as an extractor.
#[derive(Debug, Clone)]
pub struct Owner(pub OwnerId);

#[async_trait]
impl FromRequestParts<ServiceState> for Owner {
    type Rejection = Unauthorized;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServiceState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| Unauthorized)?;

        match state.identity().resolve(bearer.token()).await {
            Some(owner) => Ok(Owner(owner)),
            None => {
                tracing::debug!("rejected unknown bearer token");
                Err(Unauthorized)
            }
        }
    }
}

#[derive(Debug)]
pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        let msg = serde_json::json!({
            "error": "unauthorized",
            "message": "missing or invalid bearer token",
        });
        (StatusCode::UNAUTHORIZED, Json(msg)).into_response()
    }
}
