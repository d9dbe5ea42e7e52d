use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A consumable credit purchase. Rows are write-once: `original_transaction_id`
/// carries a unique index and acts as the idempotency key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchases")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(unique)]
    pub original_transaction_id: String,
    pub transaction_id: String,
    pub product_id: String,
    pub credits_granted: i32,
    pub purchase_date: TimeDateTimeWithTimeZone,
    pub platform: String,
    pub created_at: TimeDateTimeWithTimeZone,
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

impl ActiveModelBehavior for ActiveModel {}
