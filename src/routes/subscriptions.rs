use axum::{extract::State, Json};
use time::OffsetDateTime;
use tracing::{instrument, warn};
use validator::Validate;

use crate::{
    app_state::AppState,
    config::ProductsConfig,
    error::{ApiError, Result},
    middleware::UserIdentity,
    models::subscriptions::{
        CurrentSubscriptionResponse, RestoreRequest, RestoreResponse, SubscriptionData,
        SubscriptionRequest, SubscriptionResponse, SubscriptionsListResponse,
    },
    services::reconciliation_service::RestoreOutcome,
};

/// POST /api/v1/subscriptions
///
/// Subscription path: validate the receipt, then create, renew, or transfer
/// the subscription row for this original transaction.
#[instrument(skip(state, identity, request))]
pub async fn create_subscription(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<SubscriptionRequest>,
) -> Result<Json<SubscriptionResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let products = &state.config.products;
    let product = products
        .subscriptions
        .get(&request.product_id)
        .ok_or_else(|| ApiError::InvalidProduct(request.product_id.clone()))?;

    let claim = state.receipt_service.validate(&request.jws_token).await?;

    if claim.product_id != request.product_id {
        return Err(ApiError::ProductMismatch);
    }

    if !state.receipt_service.is_environment_allowed(claim.environment) {
        return Err(ApiError::EnvironmentMismatch);
    }

    let subscription = state
        .reconciliation_service
        .reconcile_subscription(identity.user_id, &claim, &product.tier)
        .await?;

    Ok(Json(SubscriptionResponse {
        success: true,
        subscription: subscription_data(&subscription, products),
        message: "Subscription activated successfully".to_string(),
    }))
}

/// GET /api/v1/subscriptions
#[instrument(skip(state, identity))]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<SubscriptionsListResponse>> {
    let subscriptions = state
        .reconciliation_service
        .list_subscriptions(identity.user_id)
        .await?;

    Ok(Json(SubscriptionsListResponse {
        success: true,
        subscriptions: subscriptions
            .iter()
            .map(|s| subscription_data(s, &state.config.products))
            .collect(),
    }))
}

/// GET /api/v1/subscriptions/current
#[instrument(skip(state, identity))]
pub async fn current_subscription(
    State(state): State<AppState>,
    identity: UserIdentity,
) -> Result<Json<CurrentSubscriptionResponse>> {
    let subscription = state
        .reconciliation_service
        .active_subscription(identity.user_id)
        .await?;

    match subscription {
        Some(subscription) => Ok(Json(CurrentSubscriptionResponse {
            success: true,
            subscription: Some(subscription_data(&subscription, &state.config.products)),
            message: None,
        })),
        None => Ok(Json(CurrentSubscriptionResponse {
            success: true,
            subscription: None,
            message: Some("No active subscription".to_string()),
        })),
    }
}

/// POST /api/v1/restore
///
/// Smart restore: walk a batch of signed transactions from the client's
/// store history and re-attach each to the caller. Per-entry failures are
/// counted as skipped and never abort the batch.
#[instrument(skip(state, identity, request))]
pub async fn restore_transactions(
    State(state): State<AppState>,
    identity: UserIdentity,
    Json(request): Json<RestoreRequest>,
) -> Result<Json<RestoreResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let products = &state.config.products;
    let mut restored_count = 0;
    let mut skipped_count = 0;

    for entry in &request.transactions {
        let claim = match state.receipt_service.validate(&entry.jws_token).await {
            Ok(claim) => claim,
            Err(e) => {
                warn!("smart restore skipping transaction: {}", e);
                skipped_count += 1;
                continue;
            }
        };

        let product_id = entry.product_id.as_deref().unwrap_or(&claim.product_id);
        let tier = products
            .subscriptions
            .get(product_id)
            .map(|p| p.tier.as_str())
            .unwrap_or("premium");

        match state
            .reconciliation_service
            .restore_subscription(identity.user_id, &claim, product_id, tier)
            .await
        {
            Ok(RestoreOutcome::Restored) => restored_count += 1,
            Ok(RestoreOutcome::Skipped) => skipped_count += 1,
            Err(e) => {
                warn!("smart restore skipping transaction: {}", e);
                skipped_count += 1;
            }
        }
    }

    let subscription = state
        .reconciliation_service
        .active_subscription(identity.user_id)
        .await?;

    Ok(Json(RestoreResponse {
        restored_count,
        skipped_count,
        message: format!("Restored {} subscription(s)", restored_count),
        subscription: subscription.map(|s| subscription_data(&s, products)),
    }))
}

fn subscription_data(
    subscription: &entity::subscriptions::Model,
    products: &ProductsConfig,
) -> SubscriptionData {
    let product = products.subscriptions.get(&subscription.product_id);

    let plan_name = product
        .map(|p| p.name.clone())
        .unwrap_or_else(|| "Premium Subscription".to_string());

    let billing_period = product.map(|p| p.billing_period.clone()).unwrap_or_else(|| {
        if subscription.product_id.contains("weekly") {
            "week".to_string()
        } else {
            "year".to_string()
        }
    });

    SubscriptionData {
        id: subscription.id,
        plan_id: subscription.product_id.clone(),
        plan_name,
        status: subscription.status.clone(),
        billing_period,
        expires_at: subscription.expires_at,
        renews_at: subscription.expires_at,
        cancelled_at: None,
        days_remaining: subscription.days_remaining(OffsetDateTime::now_utc()),
    }
}
