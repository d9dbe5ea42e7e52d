use crate::{
    config::Config,
    services::{ExpiryService, JwtService, ReceiptService, ReconciliationService, UserService},
};
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_service: Arc<JwtService>,
    pub receipt_service: Arc<ReceiptService>,
    pub reconciliation_service: Arc<ReconciliationService>,
    pub expiry_service: Arc<ExpiryService>,
    pub user_service: Arc<UserService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self, anyhow::Error> {
        // Connect to database
        let db = sea_orm::Database::connect(&config.database.url).await?;

        // Apply any pending schema migrations before serving traffic
        Migrator::up(&db, None).await?;

        // Initialize services
        let jwt_service = Arc::new(JwtService::new(Arc::new(config.auth.clone())));
        let receipt_service = Arc::new(ReceiptService::new(&config.app_store)?);
        let reconciliation_service = Arc::new(ReconciliationService::new(db.clone()));
        let expiry_service = Arc::new(ExpiryService::new(db.clone(), &config.expiry));
        let user_service = Arc::new(UserService::new(db.clone()));

        Ok(Self {
            db,
            jwt_service,
            receipt_service,
            reconciliation_service,
            expiry_service,
            user_service,
            config: Arc::new(config),
        })
    }
}
