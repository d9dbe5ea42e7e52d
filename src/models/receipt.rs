use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// The execution context a receipt was produced in, as declared by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEnvironment {
    Production,
    Sandbox,
    Xcode,
    #[serde(rename = "StoreKit Testing")]
    StoreKitTesting,
}

impl StoreEnvironment {
    /// Local test harness transactions never reach the App Store servers,
    /// so there is nothing to verify remotely.
    pub fn is_test_harness(&self) -> bool {
        matches!(self, Self::Xcode | Self::StoreKitTesting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "Production",
            Self::Sandbox => "Sandbox",
            Self::Xcode => "Xcode",
            Self::StoreKitTesting => "StoreKit Testing",
        }
    }
}

/// Decoded, not-yet-persisted data extracted from a signed receipt token.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionClaim {
    pub transaction_id: String,
    pub original_transaction_id: String,
    pub product_id: String,
    pub purchase_date: OffsetDateTime,
    /// Absent for consumables.
    pub expires_at: Option<OffsetDateTime>,
    pub environment: StoreEnvironment,
    pub quantity: i32,
    pub transaction_type: Option<String>,
}
