use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A recurring entitlement. `original_transaction_id` is unique and immutable;
/// `user_id`, `transaction_id`, `expires_at`, `status` and `tier` are updated
/// in place by reconciliation and by the expiry sweeper.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub original_transaction_id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub purchase_date: TimeDateTimeWithTimeZone,
    pub expires_at: TimeDateTimeWithTimeZone,
    pub platform: String,
    pub status: String,
    pub tier: String,
    pub created_at: TimeDateTimeWithTimeZone,
    pub updated_at: TimeDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Model {
    /// Active in the strict sense: flagged active and not yet past expiry.
    pub fn is_active(&self, now: TimeDateTimeWithTimeZone) -> bool {
        self.status == "active" && self.expires_at > now
    }

    pub fn days_remaining(&self, now: TimeDateTimeWithTimeZone) -> i64 {
        let remaining = self.expires_at - now;
        let days = (remaining.whole_seconds() as f64 / 86_400.0).ceil() as i64;
        days.max(0)
    }
}

impl ActiveModelBehavior for ActiveModel {}
