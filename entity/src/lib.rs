pub mod purchases;
pub mod subscriptions;
pub mod users;
