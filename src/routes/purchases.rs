use axum::{extract::State, Json};
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::purchases::{PurchaseRequest, PurchaseResponse},
};

/// POST /api/v1/purchases
///
/// Consumable path: validate the receipt, then record the purchase and
/// grant credits exactly once per original transaction.
#[instrument(skip(state, identity, request))]
pub async fn create_purchase(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<PurchaseRequest>,
) -> Result<Json<PurchaseResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let credits_to_grant = state
        .config
        .products
        .credits
        .get(&request.product_id)
        .copied()
        .filter(|credits| *credits > 0)
        .ok_or_else(|| ApiError::InvalidProduct(request.product_id.clone()))?;

    let claim = state.receipt_service.validate(&request.jws_token).await?;

    if claim.product_id != request.product_id {
        return Err(ApiError::ProductMismatch);
    }

    if !state.receipt_service.is_environment_allowed(claim.environment) {
        return Err(ApiError::EnvironmentMismatch);
    }

    let outcome = state
        .reconciliation_service
        .reconcile_purchase(identity.user_id, &claim, credits_to_grant)
        .await?;

    Ok(Json(PurchaseResponse {
        success: true,
        purchase_id: outcome.purchase_id,
        transaction_id: claim.transaction_id,
        credits_added: outcome.credits_added,
        total_credits: outcome.total_credits,
        message: "Purchase successful".to_string(),
    }))
}
