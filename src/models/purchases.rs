use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// POST /api/v1/purchases request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    #[validate(length(min = 1, max = 200))]
    pub product_id: String,
    #[validate(length(min = 10, max = 100000))]
    pub jws_token: String,
}

/// POST /api/v1/purchases response
///
/// Clients expect credits_added and total_credits at the root level.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    pub success: bool,
    pub purchase_id: Uuid,
    pub transaction_id: String,
    pub credits_added: i32,
    pub total_credits: i32,
    pub message: String,
}
