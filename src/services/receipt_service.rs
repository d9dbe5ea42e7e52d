use crate::{
    config::AppStoreConfig,
    error::{ApiError, Result},
    models::receipt::{StoreEnvironment, TransactionClaim},
    services::app_store_client::AppStoreClient,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{debug, instrument, warn};

/// Wrapper keys some clients put around the raw signed transaction.
const WRAPPER_KEYS: [&str; 3] = ["jws", "token", "transaction"];

/// Decodes signed receipt tokens and gates them on environment policy and
/// the optional App Store Server API check.
pub struct ReceiptService {
    production: bool,
    app_store_client: Option<AppStoreClient>,
}

/// Raw wire shape of the signed transaction payload (millisecond epochs).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransactionPayload {
    transaction_id: String,
    original_transaction_id: String,
    product_id: String,
    purchase_date: i64,
    #[serde(default)]
    expires_date: Option<i64>,
    environment: StoreEnvironment,
    #[serde(default)]
    quantity: Option<i32>,
    #[serde(rename = "type", default)]
    transaction_type: Option<String>,
}

impl ReceiptService {
    pub fn new(config: &AppStoreConfig) -> Result<Self> {
        let app_store_client = config.credentials().map(AppStoreClient::new).transpose()?;
        if app_store_client.is_none() {
            warn!("App Store credentials not configured, remote transaction verification disabled");
        }

        Ok(Self {
            production: config.production,
            app_store_client,
        })
    }

    /// Decode and verify a signed receipt token into a claim.
    ///
    /// Test-harness transactions (Xcode / StoreKit Testing) never reach the
    /// App Store servers and are trusted as-is. Everything else is checked
    /// against the App Store Server API when credentials are configured.
    /// Extracted fields always come from the decoded payload; the remote
    /// check is a gate, not a data source.
    #[instrument(skip(self, token))]
    pub async fn validate(&self, token: &str) -> Result<TransactionClaim> {
        let claim = Self::decode_token(token)?;

        if claim.environment.is_test_harness() {
            debug!(
                environment = claim.environment.as_str(),
                "test-harness transaction, skipping remote verification"
            );
            return Ok(claim);
        }

        if let Some(client) = &self.app_store_client {
            client.verify_transaction(&claim.transaction_id).await?;
        }

        Ok(claim)
    }

    /// Structurally decode a compact signed token into a claim.
    ///
    /// The signature segment is not cryptographically verified here: the
    /// token shape and payload encoding are validated, and authenticity is
    /// established by the remote transaction check (when configured) and
    /// transport security.
    pub fn decode_token(token: &str) -> Result<TransactionClaim> {
        let token = Self::unwrap_json(token);

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(ApiError::MalformedToken(format!(
                "Not enough or too many segments (found {})",
                segments.len()
            )));
        }

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(segments[1].trim_end_matches('='))
            .map_err(|e| ApiError::MalformedToken(format!("Invalid payload encoding: {}", e)))?;

        let raw: RawTransactionPayload = serde_json::from_slice(&payload_bytes)
            .map_err(|e| ApiError::MalformedToken(format!("Invalid payload: {}", e)))?;

        if raw.original_transaction_id.is_empty() {
            return Err(ApiError::MalformedToken(
                "Missing original transaction id".to_string(),
            ));
        }

        let purchase_date = millis_to_timestamp(raw.purchase_date)?;
        let expires_at = raw.expires_date.map(millis_to_timestamp).transpose()?;

        if let Some(expires) = expires_at {
            if expires < purchase_date {
                return Err(ApiError::MalformedToken(
                    "Expiry precedes purchase date".to_string(),
                ));
            }
        }

        Ok(TransactionClaim {
            transaction_id: raw.transaction_id,
            original_transaction_id: raw.original_transaction_id,
            product_id: raw.product_id,
            purchase_date,
            expires_at,
            environment: raw.environment,
            quantity: raw.quantity.unwrap_or(1),
            transaction_type: raw.transaction_type,
        })
    }

    /// Environment policy: production deployments only accept Production
    /// receipts; everything else only accepts sandbox/test environments.
    pub fn is_environment_allowed(&self, environment: StoreEnvironment) -> bool {
        if self.production {
            environment == StoreEnvironment::Production
        } else {
            environment != StoreEnvironment::Production
        }
    }

    /// Some clients send the token wrapped in a small JSON object. Unwrap it
    /// when one of the known keys is present, otherwise use the input as-is.
    fn unwrap_json(token: &str) -> String {
        let trimmed = token.trim();
        if trimmed.starts_with('{') {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
                for key in WRAPPER_KEYS {
                    if let Some(inner) = value.get(key).and_then(|v| v.as_str()) {
                        return inner.to_string();
                    }
                }
            }
        }
        trimmed.to_string()
    }
}

fn millis_to_timestamp(millis: i64) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
        .map_err(|e| ApiError::MalformedToken(format!("Invalid timestamp: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    fn encode_token(payload: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string().as_bytes());
        format!("{}.{}.c2lnbmF0dXJl", header, body)
    }

    fn sample_payload() -> serde_json::Value {
        json!({
            "transactionId": "2000000123456789",
            "originalTransactionId": "1000000123456789",
            "productId": "com.pictora.premium.yearly",
            "purchaseDate": 1_700_000_000_000i64,
            "expiresDate": 1_731_536_000_000i64,
            "environment": "Production",
            "quantity": 1,
            "type": "Auto-Renewable Subscription"
        })
    }

    #[test]
    fn decodes_raw_token() {
        let claim = ReceiptService::decode_token(&encode_token(sample_payload())).unwrap();
        assert_eq!(claim.transaction_id, "2000000123456789");
        assert_eq!(claim.original_transaction_id, "1000000123456789");
        assert_eq!(claim.product_id, "com.pictora.premium.yearly");
        assert_eq!(claim.purchase_date.unix_timestamp(), 1_700_000_000);
        assert_eq!(claim.expires_at.unwrap().unix_timestamp(), 1_731_536_000);
        assert_eq!(claim.environment, StoreEnvironment::Production);
        assert_eq!(claim.quantity, 1);
    }

    #[test]
    fn decodes_wrapped_tokens() {
        let token = encode_token(sample_payload());
        for key in ["jws", "token", "transaction"] {
            let wrapped = json!({ key: token }).to_string();
            let claim = ReceiptService::decode_token(&wrapped).unwrap();
            assert_eq!(claim.original_transaction_id, "1000000123456789");
        }
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = ReceiptService::decode_token("invalid.token").unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken(_)));

        let err = ReceiptService::decode_token("a.b.c.d").unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken(_)));
    }

    #[test]
    fn rejects_bad_payload_encoding() {
        let err = ReceiptService::decode_token("aGVhZGVy.!!!not-base64!!!.c2ln").unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken(_)));
    }

    #[test]
    fn rejects_non_json_payload() {
        let body = URL_SAFE_NO_PAD.encode(b"plain text");
        let token = format!("aGVhZGVy.{}.c2ln", body);
        let err = ReceiptService::decode_token(&token).unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken(_)));
    }

    #[test]
    fn rejects_empty_original_transaction_id() {
        let mut payload = sample_payload();
        payload["originalTransactionId"] = json!("");
        let err = ReceiptService::decode_token(&encode_token(payload)).unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken(_)));
    }

    #[test]
    fn rejects_expiry_before_purchase() {
        let mut payload = sample_payload();
        payload["expiresDate"] = json!(1_600_000_000_000i64);
        let err = ReceiptService::decode_token(&encode_token(payload)).unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken(_)));
    }

    #[test]
    fn defaults_quantity_and_allows_missing_expiry() {
        let payload = json!({
            "transactionId": "tx-1",
            "originalTransactionId": "orig-1",
            "productId": "credit_pack_large",
            "purchaseDate": 1_700_000_000_000i64,
            "environment": "Sandbox",
            "type": "Consumable"
        });
        let claim = ReceiptService::decode_token(&encode_token(payload)).unwrap();
        assert_eq!(claim.quantity, 1);
        assert!(claim.expires_at.is_none());
        assert_eq!(claim.environment, StoreEnvironment::Sandbox);
    }

    #[test]
    fn decoded_claim_survives_reencoding() {
        let claim = ReceiptService::decode_token(&encode_token(sample_payload())).unwrap();

        // Rebuild the wire payload from the claim and decode again
        let payload = json!({
            "transactionId": claim.transaction_id,
            "originalTransactionId": claim.original_transaction_id,
            "productId": claim.product_id,
            "purchaseDate": claim.purchase_date.unix_timestamp() * 1000,
            "expiresDate": claim.expires_at.map(|t| t.unix_timestamp() * 1000),
            "environment": claim.environment,
            "quantity": claim.quantity,
            "type": claim.transaction_type,
        });
        let reparsed = ReceiptService::decode_token(&encode_token(payload)).unwrap();

        assert_eq!(reparsed, claim);
    }

    #[test]
    fn parses_storekit_testing_environment() {
        let mut payload = sample_payload();
        payload["environment"] = json!("StoreKit Testing");
        let claim = ReceiptService::decode_token(&encode_token(payload)).unwrap();
        assert_eq!(claim.environment, StoreEnvironment::StoreKitTesting);
        assert!(claim.environment.is_test_harness());
    }

    #[test]
    fn environment_policy_by_deployment() {
        let production = ReceiptService {
            production: true,
            app_store_client: None,
        };
        assert!(production.is_environment_allowed(StoreEnvironment::Production));
        assert!(!production.is_environment_allowed(StoreEnvironment::Sandbox));
        assert!(!production.is_environment_allowed(StoreEnvironment::Xcode));

        let development = ReceiptService {
            production: false,
            app_store_client: None,
        };
        assert!(!development.is_environment_allowed(StoreEnvironment::Production));
        assert!(development.is_environment_allowed(StoreEnvironment::Sandbox));
        assert!(development.is_environment_allowed(StoreEnvironment::Xcode));
        assert!(development.is_environment_allowed(StoreEnvironment::StoreKitTesting));
    }

    #[test]
    fn new_without_credentials_disables_remote_check() {
        let service = ReceiptService::new(&AppStoreConfig::default()).unwrap();
        assert!(service.app_store_client.is_none());
    }

    #[tokio::test]
    async fn validate_skips_remote_check_for_test_harness() {
        // No client configured; a test-harness claim still validates.
        let service = ReceiptService {
            production: false,
            app_store_client: None,
        };
        let mut payload = sample_payload();
        payload["environment"] = json!("Xcode");
        let claim = service.validate(&encode_token(payload)).await.unwrap();
        assert_eq!(claim.environment, StoreEnvironment::Xcode);
    }
}
