use crate::error::{ApiError, Result};
use anyhow::anyhow;
use sea_orm::{entity::*, query::*, sea_query::OnConflict, DatabaseConnection};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

/// Owner records for anonymous device-keyed users.
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find or create the anonymous user for a device. Concurrent first
    /// sign-ins from the same device resolve through the unique device_id
    /// index plus read-back, both callers ending up with the same row.
    #[instrument(skip(self))]
    pub async fn find_or_create_by_device_id(
        &self,
        device_id: &str,
    ) -> Result<entity::users::Model> {
        if let Some(user) = entity::users::Entity::find()
            .filter(entity::users::Column::DeviceId.eq(device_id))
            .one(&self.db)
            .await?
        {
            return Ok(user);
        }

        let now = OffsetDateTime::now_utc();
        let user_id = Uuid::new_v4();

        let new_user = entity::users::ActiveModel {
            id: Set(user_id),
            device_id: Set(device_id.to_string()),
            is_anonymous: Set(true),
            username: Set(Some(format!(
                "user_{}",
                device_id.chars().take(8).collect::<String>()
            ))),
            credit_balance: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        // A concurrent first sign-in may win this insert; either way the
        // read-back below yields the surviving row.
        entity::users::Entity::insert(new_user)
            .on_conflict(
                OnConflict::column(entity::users::Column::DeviceId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let user = entity::users::Entity::find()
            .filter(entity::users::Column::DeviceId.eq(device_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "Failed to read user after insert for device {}",
                    device_id
                ))
            })?;

        if user.id == user_id {
            info!("Created anonymous user {} for device", user_id);
        }

        Ok(user)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<entity::users::Model> {
        entity::users::Entity::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", user_id)))
    }
}
