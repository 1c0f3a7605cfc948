//! Account registration and login.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use common::protocol::{LoginRequest, LoginResponse, MessageResponse, RegisterRequest};
use tracing::info;

use super::{crypto_failure, store_failure};
use crate::auth::{hash_password, verify_dummy, verify_password};
use crate::server::error::{ApiError, ApiResult};
use crate::server::extract::AppJson;
use crate::server::state::AppState;
use crate::store::{NewUser, StoreError};
use crate::validation::{normalize_email, validate_registration};

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    validate_registration(&req)?;

    let password = req.password;
    let password_hash = match tokio::task::spawn_blocking(move || hash_password(&password)).await {
        Ok(Ok(hash)) => hash,
        Ok(Err(e)) => return Err(crypto_failure(&state.health, "hash_password", &e).await),
        Err(e) => return Err(crypto_failure(&state.health, "hash_password", &e).await),
    };

    let user = state
        .repo
        .users
        .create(NewUser {
            email: normalize_email(&req.email),
            username: req.username.trim().to_string(),
            password_hash,
        })
        .await;
    let user = match user {
        Ok(u) => u,
        Err(e) => {
            return Err(store_failure(
                &state.health,
                e,
                "user not found",
                "email or username already registered",
            )
            .await)
        }
    };

    info!(user_id = user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("user registered successfully")),
    ))
}

/// `POST /api/login`
///
/// Unknown email and wrong password are indistinguishable to the caller.
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = match state.repo.users.by_email(&normalize_email(&req.email)).await {
        Ok(u) => u,
        Err(StoreError::NotFound) => {
            let password = req.password;
            if let Err(e) = tokio::task::spawn_blocking(move || verify_dummy(&password)).await {
                return Err(crypto_failure(&state.health, "verify_password", &e).await);
            }
            return Err(invalid_credentials());
        }
        Err(e) => return Err(store_failure(&state.health, e, "", "").await),
    };

    let password = req.password;
    let stored = user.password_hash.clone();
    let matches = match tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await {
        Ok(m) => m,
        Err(e) => return Err(crypto_failure(&state.health, "verify_password", &e).await),
    };
    if !matches {
        return Err(invalid_credentials());
    }

    let token = match state.tokens.issue(user.id) {
        Ok(t) => t,
        Err(e) => return Err(crypto_failure(&state.health, "issue_token", &e).await),
    };
    info!(user_id = user.id, "user logged in");
    Ok(Json(LoginResponse { token }))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("invalid credentials")
}
