use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use validator::Validate;

/// POST /api/v1/auth/anonymous request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousAuthRequest {
    #[validate(length(min = 8, max = 100))]
    pub device_id: String,
}

/// Session token response (anonymous sign-in and refresh)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: UserData,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    pub id: String,
    pub device_id: String,
    pub is_anonymous: bool,
    pub username: Option<String>,
    pub credit_balance: i32,
}

impl From<entity::users::Model> for UserData {
    fn from(user: entity::users::Model) -> Self {
        Self {
            id: user.id.to_string(),
            device_id: user.device_id,
            is_anonymous: user.is_anonymous,
            username: user.username,
            credit_balance: user.credit_balance,
        }
    }
}
