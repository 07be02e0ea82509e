use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};

use ocha_auth::AuthUser;

use crate::error::ApiError;
use crate::state::AppState;

/// Extractor for bearer-authenticated routes.
///
/// Pulls the `Authorization: Bearer` credential, runs it through the
/// verifier, and rejects with 401 (or 403 for allow-list misses) before the
/// handler body runs.
pub struct CurrentUser(pub AuthUser);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Authentication("missing bearer token".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::Authentication("missing bearer token".to_string()))?;

        let user = state.verifier.verify(token).await?;
        Ok(CurrentUser(user))
    }
}
