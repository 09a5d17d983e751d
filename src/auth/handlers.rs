use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::instrument;

use crate::auth::dto::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair};
use crate::auth::error::AuthError;
use crate::auth::extractors::AuthUser;
use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::auth::service;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenPair>), AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(AuthError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(AuthError::Validation("Password too short".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let pair = service::sign_up(&*state.store, &keys, &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(pair)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        return Err(AuthError::Validation("Invalid email".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let pair = service::sign_in(&*state.store, &keys, &payload.email, &payload.password).await?;
    Ok(Json(pair))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<StatusCode, AuthError> {
    service::log_out(&*state.store, user_id).await?;
    Ok(StatusCode::OK)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys.verify(&payload.refresh_token, TokenKind::Refresh)?;
    let pair = service::refresh(&*state.store, &keys, claims.sub, &payload.refresh_token).await?;
    Ok(Json(pair))
}
