use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

/// POST /api/v1/subscriptions request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRequest {
    #[validate(length(min = 1, max = 200))]
    pub product_id: String,
    #[validate(length(min = 10, max = 100000))]
    pub jws_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResponse {
    pub success: bool,
    pub subscription: SubscriptionData,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionsListResponse {
    pub success: bool,
    pub subscriptions: Vec<SubscriptionData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSubscriptionResponse {
    pub success: bool,
    pub subscription: Option<SubscriptionData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionData {
    pub id: Uuid,
    pub plan_id: String,
    pub plan_name: String,
    pub status: String,
    pub billing_period: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub renews_at: OffsetDateTime,
    pub cancelled_at: Option<String>,
    pub days_remaining: i64,
}

/// POST /api/v1/restore request: a batch of signed transactions collected
/// client-side from the store's transaction history.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RestoreRequest {
    #[validate(length(max = 100))]
    pub transactions: Vec<RestoreEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreEntry {
    pub jws_token: String,
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub restored_count: usize,
    pub skipped_count: usize,
    pub message: String,
    pub subscription: Option<SubscriptionData>,
}
