use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::auth::{AnonymousAuthRequest, AuthResponse, UserData},
};

/// POST /api/v1/auth/anonymous
///
/// Device-keyed sign-in: finds or creates the anonymous user for this
/// device and issues a session token.
#[instrument(skip(state, request))]
pub async fn anonymous_sign_in(
    State(state): State<AppState>,
    Json(request): Json<AnonymousAuthRequest>,
) -> Result<Json<AuthResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let user = state
        .user_service
        .find_or_create_by_device_id(&request.device_id)
        .await?;

    let (token, expires_at) = state.jwt_service.issue_token(user.id)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserData::from(user),
        expires_at,
    }))
}

/// POST /api/v1/auth/refresh
///
/// Re-issues a session token for an already-authenticated caller.
#[instrument(skip(state, identity))]
pub async fn refresh_token(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<AuthResponse>> {
    let user = state.user_service.find_by_id(identity.user_id).await?;

    let (token, expires_at) = state.jwt_service.issue_token(user.id)?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user: UserData::from(user),
        expires_at,
    }))
}
