// Service modules
pub mod app_store_client;
pub mod expiry_service;
pub mod jwt_service;
pub mod receipt_service;
pub mod reconciliation_service;
pub mod user_service;

pub use app_store_client::AppStoreClient;
pub use expiry_service::ExpiryService;
pub use jwt_service::JwtService;
pub use receipt_service::ReceiptService;
pub use reconciliation_service::ReconciliationService;
pub use user_service::UserService;
