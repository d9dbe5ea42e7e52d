use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    services::jwt_service::JwtService,
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Request extension storing the verified identity from the session token
#[derive(Debug, Clone)]
pub struct UserIdentity {
    pub user_id: Uuid,
}

/// Session authentication middleware
///
/// Requires an `Authorization: Bearer <token>` header; an absent header or
/// any other scheme is a missing credential, while a present-but-bad token
/// is reported as expired or invalid specifically.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let headers = request.headers();

    let auth_header = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingCredential)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::MissingCredential)?;

    let claims = state.jwt_service.verify_token(token)?;
    let user_id = JwtService::user_id_from_claims(&claims)?;

    request.extensions_mut().insert(UserIdentity { user_id });

    Ok(next.run(request).await)
}

/// Axum extractor for the verified identity
///
/// Only works on routes protected by jwt_auth_middleware.
impl<S> FromRequestParts<S> for UserIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<UserIdentity>()
            .cloned()
            .ok_or(ApiError::MissingCredential)
    }
}
