use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub app_store: AppStoreConfig,
    #[serde(default)]
    pub products: ProductsConfig,
    #[serde(default)]
    pub expiry: ExpiryConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration_hours: u64,
    pub refresh_token_expiration_days: u64,
}

/// App Store Server API credentials. All four values are required together;
/// if any is missing, remote transaction verification is disabled rather
/// than treated as a startup error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppStoreConfig {
    /// Whether this deployment only accepts production-environment receipts.
    #[serde(default)]
    pub production: bool,
    #[serde(default)]
    pub issuer_id: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
    #[serde(default)]
    pub private_key: Option<String>,
    #[serde(default)]
    pub bundle_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppStoreCredentials {
    pub issuer_id: String,
    pub key_id: String,
    pub private_key: String,
    pub bundle_id: String,
}

impl AppStoreConfig {
    pub fn credentials(&self) -> Option<AppStoreCredentials> {
        Some(AppStoreCredentials {
            issuer_id: self.issuer_id.clone()?,
            key_id: self.key_id.clone()?,
            private_key: self.private_key.clone()?,
            bundle_id: self.bundle_id.clone()?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProductsConfig {
    /// Consumable product id -> credits granted per purchase.
    #[serde(default = "default_credit_products")]
    pub credits: HashMap<String, i32>,
    /// Subscription product id -> plan details.
    #[serde(default = "default_subscription_products")]
    pub subscriptions: HashMap<String, SubscriptionProduct>,
}

impl Default for ProductsConfig {
    fn default() -> Self {
        Self {
            credits: default_credit_products(),
            subscriptions: default_subscription_products(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionProduct {
    pub name: String,
    pub billing_period: String,
    #[serde(default = "default_tier")]
    pub tier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpiryConfig {
    #[serde(default = "default_expiry_batch_size")]
    pub batch_size: u64,
    #[serde(default = "default_expiry_interval_secs")]
    pub interval_secs: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            batch_size: default_expiry_batch_size(),
            interval_secs: default_expiry_interval_secs(),
        }
    }
}

fn default_tier() -> String {
    "premium".to_string()
}

fn default_expiry_batch_size() -> u64 {
    500
}

fn default_expiry_interval_secs() -> u64 {
    3600
}

fn default_credit_products() -> HashMap<String, i32> {
    HashMap::from([
        ("credit_pack_small".to_string(), 100),
        ("credit_pack_medium".to_string(), 500),
        ("credit_pack_large".to_string(), 1000),
        ("credit_pack_xl".to_string(), 2500),
    ])
}

fn default_subscription_products() -> HashMap<String, SubscriptionProduct> {
    HashMap::from([
        (
            "com.pictora.premium.weekly".to_string(),
            SubscriptionProduct {
                name: "Weekly Premium".to_string(),
                billing_period: "week".to_string(),
                tier: "premium".to_string(),
            },
        ),
        (
            "com.pictora.premium.yearly".to_string(),
            SubscriptionProduct {
                name: "Yearly Premium".to_string(),
                billing_period: "year".to_string(),
                tier: "premium".to_string(),
            },
        ),
    ])
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for environment variable overrides)
        dotenvy::dotenv().ok();

        // Build config from config.yml (required) with environment variable overrides
        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(
                config::Environment::with_prefix("STOREKEEP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
