use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{ProfileResponse, SaveProfileRequest};
use super::repo::Profile;
use crate::{
    auth::extractors::AuthUser,
    error::{internal, ApiError},
    state::AppState,
};

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile", post(save_profile))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ProfileResponse>, ApiError> {
    let profile = Profile::find_by_user(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::NotFound("No profile saved yet.".into()))?;
    Ok(Json(profile.into()))
}

#[instrument(skip(state, payload))]
pub async fn save_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SaveProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let fields = payload.validate()?;
    let profile = Profile::upsert(&state.db, user_id, &fields)
        .await
        .map_err(internal)?;
    info!(user_id = %user_id, profile_id = %profile.id, "profile saved");
    Ok(Json(profile.into()))
}
