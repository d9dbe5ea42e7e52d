use crate::{
    error::{ApiError, Result},
    models::{
        common::{Platform, SubscriptionStatus},
        receipt::TransactionClaim,
    },
};
use anyhow::anyhow;
use sea_orm::{
    entity::*, query::*, sea_query::OnConflict, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, TransactionTrait,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

/// Merges verified claims into durable purchase/subscription state.
///
/// Every mutating path runs inside a single database transaction keyed on
/// `original_transaction_id`, with the unique index as the final arbiter
/// against concurrent duplicates: an insert that loses the race reads back
/// the winner's row and reports `DuplicateTransaction` (consumables) or
/// converges to an update in place (subscriptions).
pub struct ReconciliationService {
    db: DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub purchase_id: Uuid,
    pub credits_added: i32,
    pub total_credits: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    Skipped,
}

impl ReconciliationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Consumable path: create the purchase record exactly once and grant
    /// credits to the owner in the same transaction.
    ///
    /// Duplicate detection is global, not owner-scoped; a receipt can only
    /// ever be consumed once across the whole system.
    #[instrument(skip(self, claim), fields(original_transaction_id = %claim.original_transaction_id))]
    pub async fn reconcile_purchase(
        &self,
        user_id: Uuid,
        claim: &TransactionClaim,
        credits_to_grant: i32,
    ) -> Result<PurchaseOutcome> {
        let txn = self.db.begin().await?;

        let existing = entity::purchases::Entity::find()
            .filter(
                entity::purchases::Column::OriginalTransactionId
                    .eq(&claim.original_transaction_id),
            )
            .one(&txn)
            .await?;

        if existing.is_some() {
            txn.rollback().await?;
            return Err(ApiError::DuplicateTransaction);
        }

        let now = OffsetDateTime::now_utc();
        let purchase_id = Uuid::new_v4();

        let new_purchase = entity::purchases::ActiveModel {
            id: Set(purchase_id),
            user_id: Set(user_id),
            original_transaction_id: Set(claim.original_transaction_id.clone()),
            transaction_id: Set(claim.transaction_id.clone()),
            product_id: Set(claim.product_id.clone()),
            credits_granted: Set(credits_to_grant),
            purchase_date: Set(claim.purchase_date),
            platform: Set(Platform::Ios.as_str().to_string()),
            created_at: Set(now),
        };

        // Insert atomically; a concurrent duplicate does nothing instead of erroring.
        entity::purchases::Entity::insert(new_purchase)
            .on_conflict(
                OnConflict::column(entity::purchases::Column::OriginalTransactionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        // Read back to learn whether this call won the insert.
        let persisted = entity::purchases::Entity::find()
            .filter(
                entity::purchases::Column::OriginalTransactionId
                    .eq(&claim.original_transaction_id),
            )
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to read purchase after insert for transaction {}",
                    claim.original_transaction_id
                ))
            })?;

        if persisted.id != purchase_id {
            // Another request already consumed this receipt
            txn.rollback().await?;
            return Err(ApiError::DuplicateTransaction);
        }

        // Credit grant keyed by the purchase row just created; the unique
        // purchase insert above makes the increment at-most-once.
        let total_credits = Self::add_credits_txn(user_id, credits_to_grant, &txn).await?;

        txn.commit().await?;

        info!(
            "Recorded purchase: user={}, purchase={}, credits={}, balance={}",
            user_id, purchase_id, credits_to_grant, total_credits
        );

        Ok(PurchaseOutcome {
            purchase_id,
            credits_added: credits_to_grant,
            total_credits,
        })
    }

    /// Subscription path: create on first sighting, update in place on
    /// renewal/replay, and transfer ownership when the same receipt shows up
    /// under a different identity (device or account reset). The token was
    /// already validated as authentic for this transaction, so the transfer
    /// is trusted.
    #[instrument(skip(self, claim), fields(original_transaction_id = %claim.original_transaction_id))]
    pub async fn reconcile_subscription(
        &self,
        user_id: Uuid,
        claim: &TransactionClaim,
        tier: &str,
    ) -> Result<entity::subscriptions::Model> {
        let expires_at = claim.expires_at.ok_or(ApiError::MissingExpiry)?;

        let txn = self.db.begin().await?;
        let now = OffsetDateTime::now_utc();
        let status = derive_status(expires_at, now);

        // Owner-scoped lookup first
        let owned = entity::subscriptions::Entity::find()
            .filter(
                entity::subscriptions::Column::OriginalTransactionId
                    .eq(&claim.original_transaction_id),
            )
            .filter(entity::subscriptions::Column::UserId.eq(user_id))
            .one(&txn)
            .await?;

        let subscription = if let Some(subscription) = owned {
            Self::apply_claim_txn(subscription, user_id, claim, expires_at, status, tier, &txn)
                .await?
        } else {
            // Global lookup: the same purchaser may have re-authenticated as
            // a different identity.
            let elsewhere = entity::subscriptions::Entity::find()
                .filter(
                    entity::subscriptions::Column::OriginalTransactionId
                        .eq(&claim.original_transaction_id),
                )
                .one(&txn)
                .await?;

            if let Some(subscription) = elsewhere {
                info!(
                    "transferring subscription {} from user {} to user {}",
                    subscription.id, subscription.user_id, user_id
                );
                Self::apply_claim_txn(subscription, user_id, claim, expires_at, status, tier, &txn)
                    .await?
            } else {
                self.create_subscription_txn(user_id, claim, expires_at, status, tier, now, &txn)
                    .await?
            }
        };

        txn.commit().await?;

        info!(
            "Reconciled subscription: user={}, subscription={}, status={}, expires_at={}",
            user_id, subscription.id, subscription.status, subscription.expires_at
        );

        Ok(subscription)
    }

    /// Smart restore: re-attach a previously seen subscription to the caller
    /// without touching its billing state, or create it when unseen.
    #[instrument(skip(self, claim), fields(original_transaction_id = %claim.original_transaction_id))]
    pub async fn restore_subscription(
        &self,
        user_id: Uuid,
        claim: &TransactionClaim,
        product_id: &str,
        tier: &str,
    ) -> Result<RestoreOutcome> {
        let txn = self.db.begin().await?;

        let existing = entity::subscriptions::Entity::find()
            .filter(
                entity::subscriptions::Column::OriginalTransactionId
                    .eq(&claim.original_transaction_id),
            )
            .one(&txn)
            .await?;

        let outcome = match existing {
            Some(subscription) if subscription.user_id == user_id => RestoreOutcome::Skipped,
            Some(subscription) => {
                // Owned by another identity: transfer only, keep billing state
                let mut active: entity::subscriptions::ActiveModel = subscription.into();
                active.user_id = Set(user_id);
                active.updated_at = Set(OffsetDateTime::now_utc());
                active.update(&txn).await?;
                RestoreOutcome::Restored
            }
            None => {
                let expires_at = claim.expires_at.ok_or(ApiError::MissingExpiry)?;
                let now = OffsetDateTime::now_utc();
                let status = derive_status(expires_at, now);
                let mut restore_claim = claim.clone();
                // The store history entry may omit productId; prefer the
                // client-declared one in that case.
                if restore_claim.product_id.is_empty() {
                    restore_claim.product_id = product_id.to_string();
                }
                self.create_subscription_txn(
                    user_id,
                    &restore_claim,
                    expires_at,
                    status,
                    tier,
                    now,
                    &txn,
                )
                .await?;
                RestoreOutcome::Restored
            }
        };

        txn.commit().await?;
        Ok(outcome)
    }

    /// List the caller's subscriptions, newest expiry first.
    pub async fn list_subscriptions(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<entity::subscriptions::Model>> {
        let subscriptions = entity::subscriptions::Entity::find()
            .filter(entity::subscriptions::Column::UserId.eq(user_id))
            .order_by_desc(entity::subscriptions::Column::ExpiresAt)
            .all(&self.db)
            .await?;

        Ok(subscriptions)
    }

    /// The caller's active subscription with the furthest expiry, if any.
    pub async fn active_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<entity::subscriptions::Model>> {
        let now = OffsetDateTime::now_utc();
        let subscription = entity::subscriptions::Entity::find()
            .filter(entity::subscriptions::Column::UserId.eq(user_id))
            .filter(entity::subscriptions::Column::Status.eq(SubscriptionStatus::Active.as_str()))
            .filter(entity::subscriptions::Column::ExpiresAt.gt(now))
            .order_by_desc(entity::subscriptions::Column::ExpiresAt)
            .one(&self.db)
            .await?;

        Ok(subscription)
    }

    async fn create_subscription_txn(
        &self,
        user_id: Uuid,
        claim: &TransactionClaim,
        expires_at: OffsetDateTime,
        status: SubscriptionStatus,
        tier: &str,
        now: OffsetDateTime,
        txn: &DatabaseTransaction,
    ) -> Result<entity::subscriptions::Model> {
        let subscription_id = Uuid::new_v4();

        let new_subscription = entity::subscriptions::ActiveModel {
            id: Set(subscription_id),
            user_id: Set(user_id),
            original_transaction_id: Set(claim.original_transaction_id.clone()),
            transaction_id: Set(claim.transaction_id.clone()),
            product_id: Set(claim.product_id.clone()),
            purchase_date: Set(claim.purchase_date),
            expires_at: Set(expires_at),
            platform: Set(Platform::Ios.as_str().to_string()),
            status: Set(status.as_str().to_string()),
            tier: Set(tier.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        entity::subscriptions::Entity::insert(new_subscription)
            .on_conflict(
                OnConflict::column(entity::subscriptions::Column::OriginalTransactionId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(txn)
            .await?;

        let persisted = entity::subscriptions::Entity::find()
            .filter(
                entity::subscriptions::Column::OriginalTransactionId
                    .eq(&claim.original_transaction_id),
            )
            .one(txn)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to read subscription after insert for transaction {}",
                    claim.original_transaction_id
                ))
            })?;

        if persisted.id != subscription_id {
            // Lost a create race for the same receipt; converge by updating
            // the winner's row in place.
            return Self::apply_claim_txn(persisted, user_id, claim, expires_at, status, tier, txn)
                .await;
        }

        Ok(persisted)
    }

    async fn apply_claim_txn(
        subscription: entity::subscriptions::Model,
        user_id: Uuid,
        claim: &TransactionClaim,
        expires_at: OffsetDateTime,
        status: SubscriptionStatus,
        tier: &str,
        txn: &DatabaseTransaction,
    ) -> Result<entity::subscriptions::Model> {
        let mut active: entity::subscriptions::ActiveModel = subscription.into();
        active.user_id = Set(user_id);
        active.transaction_id = Set(claim.transaction_id.clone());
        active.expires_at = Set(expires_at);
        active.status = Set(status.as_str().to_string());
        active.tier = Set(tier.to_string());
        active.updated_at = Set(OffsetDateTime::now_utc());

        Ok(active.update(txn).await?)
    }

    /// Idempotent-per-purchase credit increment: callers only reach this
    /// after winning the unique purchase insert.
    async fn add_credits_txn<C: ConnectionTrait>(
        user_id: Uuid,
        amount: i32,
        conn: &C,
    ) -> Result<i32> {
        let user = entity::users::Entity::find_by_id(user_id)
            .lock_exclusive()
            .one(conn)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))?;

        let new_balance = user.credit_balance + amount;
        let mut active: entity::users::ActiveModel = user.into();
        active.credit_balance = Set(new_balance);
        active.updated_at = Set(OffsetDateTime::now_utc());
        active.update(conn).await?;

        Ok(new_balance)
    }
}

/// Status is re-derived on every create/update from the claim expiry alone.
pub fn derive_status(expires_at: OffsetDateTime, now: OffsetDateTime) -> SubscriptionStatus {
    if expires_at > now {
        SubscriptionStatus::Active
    } else {
        SubscriptionStatus::Expired
    }
}
