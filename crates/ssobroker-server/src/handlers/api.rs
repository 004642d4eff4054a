//! JSON API for applications: programmatic login and refresh.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use ssobroker_auth::IssuedTokens;

use super::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub app: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub app: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub app: String,
    pub refresh_token: String,
    pub jwt_token: String,
}

impl TokenResponse {
    fn new(app: String, tokens: IssuedTokens) -> Self {
        Self {
            app,
            refresh_token: tokens.refresh_code,
            jwt_token: tokens.access_token,
        }
    }
}

/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let tokens = state
        .exchanger
        .login_api(&req.app, &req.username, &req.password)
        .await?;
    Ok(Json(TokenResponse::new(req.app, tokens)))
}

/// `POST /api/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let tokens = state.exchanger.refresh(&req.app, &req.refresh_token).await?;
    Ok(Json(TokenResponse::new(req.app, tokens)))
}
