//! `/api/restricted/profile` handlers.
//!
//! Aadhaar numbers are encrypted before a row is written and decrypted after
//! it is read; responses always carry plaintext.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use common::protocol::{ProfileRequest, ProfileResponse};
use tracing::info;

use super::{crypto_failure, store_failure};
use crate::crypto::{decrypt_fields, encrypt_fields};
use crate::server::error::ApiResult;
use crate::server::extract::{AppJson, AuthUser};
use crate::server::state::AppState;
use crate::store::{Profile, ProfileFields};
use crate::validation::validate_profile;

const NOT_FOUND: &str = "profile not found";
const CONFLICT: &str = "profile already exists or phone number is taken";

/// `GET`
pub async fn get_profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<ProfileResponse>> {
    let profile = match state.repo.profiles.by_user_id(user.user_id).await {
        Ok(p) => p,
        Err(e) => return Err(store_failure(&state.health, e, NOT_FOUND, CONFLICT).await),
    };
    Ok(Json(reveal(&state, profile).await?))
}

/// `POST`
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<ProfileRequest>,
) -> ApiResult<(StatusCode, Json<ProfileResponse>)> {
    let fields = seal(&state, user, req).await?;
    let profile = match state.repo.profiles.create(fields).await {
        Ok(p) => p,
        Err(e) => return Err(store_failure(&state.health, e, "user not found", CONFLICT).await),
    };
    info!(user_id = user.user_id, "profile created");
    Ok((StatusCode::CREATED, Json(reveal(&state, profile).await?)))
}

/// `PUT`
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(req): AppJson<ProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let fields = seal(&state, user, req).await?;
    let profile = match state.repo.profiles.update(fields).await {
        Ok(p) => p,
        Err(e) => return Err(store_failure(&state.health, e, NOT_FOUND, CONFLICT).await),
    };
    info!(user_id = user.user_id, "profile updated");
    Ok(Json(reveal(&state, profile).await?))
}

/// `DELETE`
pub async fn delete_profile(State(state): State<AppState>, user: AuthUser) -> ApiResult<StatusCode> {
    if let Err(e) = state.repo.profiles.delete(user.user_id).await {
        return Err(store_failure(&state.health, e, NOT_FOUND, CONFLICT).await);
    }
    info!(user_id = user.user_id, "profile deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Validate the body and encrypt its sensitive fields.
async fn seal(state: &AppState, user: AuthUser, req: ProfileRequest) -> ApiResult<ProfileFields> {
    validate_profile(&req, Utc::now().date_naive())?;

    let mut fields = ProfileFields {
        user_id: user.user_id,
        full_name: req.full_name.trim().to_string(),
        date_of_birth: req.date_of_birth,
        aadhaar_number: req.aadhaar_number,
        phone_number: req.phone_number,
        address: req.address,
    };
    if let Err(e) = encrypt_fields(&state.cipher, [("aadhaar_number", &mut fields.aadhaar_number)]) {
        return Err(crypto_failure(&state.health, "encrypt_fields", &e).await);
    }
    Ok(fields)
}

/// Decrypt a stored row into its response form.
async fn reveal(state: &AppState, mut profile: Profile) -> ApiResult<ProfileResponse> {
    if let Err(e) = decrypt_fields(&state.cipher, [("aadhaar_number", &mut profile.aadhaar_number)]) {
        return Err(crypto_failure(&state.health, "decrypt_fields", &e).await);
    }
    Ok(ProfileResponse {
        id: profile.id,
        user_id: profile.user_id,
        full_name: profile.full_name,
        date_of_birth: profile.date_of_birth,
        aadhaar_number: profile.aadhaar_number,
        phone_number: profile.phone_number,
        address: profile.address,
        created_at: profile.created_at,
        updated_at: profile.updated_at,
    })
}
