use crate::{config::ExpiryConfig, error::Result, models::common::SubscriptionStatus};
use sea_orm::{query::*, sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

/// Transitions past-due active subscriptions to expired.
///
/// The sweep only ever moves rows toward `expired` based on a monotonic
/// expiry comparison, so it is safe to run concurrently with live
/// reconciliation and safe to re-run immediately.
pub struct ExpiryService {
    db: DatabaseConnection,
    batch_size: u64,
}

impl ExpiryService {
    pub fn new(db: DatabaseConnection, config: &ExpiryConfig) -> Self {
        Self {
            db,
            batch_size: config.batch_size.max(1),
        }
    }

    /// Expire everything past due, in bounded batches. Returns the number of
    /// subscriptions transitioned.
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> Result<u64> {
        let mut total_expired = 0u64;

        loop {
            let now = OffsetDateTime::now_utc();

            let batch = entity::subscriptions::Entity::find()
                .filter(entity::subscriptions::Column::Status.eq(SubscriptionStatus::Active.as_str()))
                .filter(entity::subscriptions::Column::ExpiresAt.lte(now))
                .limit(self.batch_size)
                .all(&self.db)
                .await?;

            if batch.is_empty() {
                break;
            }

            let fetched = batch.len() as u64;
            let ids: Vec<Uuid> = batch.iter().map(|s| s.id).collect();

            // Guard on status again so a concurrent reconciliation that
            // renewed one of these rows is not clobbered back to expired.
            let result = entity::subscriptions::Entity::update_many()
                .col_expr(
                    entity::subscriptions::Column::Status,
                    Expr::value(SubscriptionStatus::Expired.as_str()),
                )
                .col_expr(entity::subscriptions::Column::UpdatedAt, Expr::value(now))
                .filter(entity::subscriptions::Column::Id.is_in(ids))
                .filter(entity::subscriptions::Column::Status.eq(SubscriptionStatus::Active.as_str()))
                .filter(entity::subscriptions::Column::ExpiresAt.lte(now))
                .exec(&self.db)
                .await?;

            total_expired += result.rows_affected;

            if fetched < self.batch_size {
                break;
            }
        }

        info!("Expiry sweep marked {} subscriptions as expired", total_expired);

        Ok(total_expired)
    }
}
