// Request/Response models and shared domain enums
pub mod auth;
pub mod common;
pub mod purchases;
pub mod receipt;
pub mod subscriptions;
