use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use ocha_auth::AuthUser;

use crate::auth::CurrentUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GoogleAuthRequest {
    pub credential: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: AuthUser,
    /// The verified credential, echoed back for client storage
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub user: AuthUser,
}

/// Exchange a Google ID token for a session
pub async fn google_auth(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GoogleAuthRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state.verifier.verify(&req.credential).await?;

    Ok(Json(AuthResponse {
        success: true,
        user,
        token: req.credential,
    }))
}

/// Report the identity behind the bearer credential
pub async fn verify_auth(CurrentUser(user): CurrentUser) -> ApiResult<Json<VerifyResponse>> {
    Ok(Json(VerifyResponse {
        success: true,
        user,
    }))
}
