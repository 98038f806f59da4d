//! Payment Highway REST API client
//!
//! Signed JSON calls for transaction init, token debit, form commit, revert
//! and card tokenization. One HTTP request per call: a commit or debit that
//! timed out may still have moved money, so nothing here retries.

use crate::error::{GatewayError, GatewayResult};
use crate::payments::response::VendorResponse;
use crate::payments::signer::SecureSigner;
use crate::payments::stamp::{StampSource, SystemStamp};
use crate::payments::traits::PaymentApi;
use crate::payments::types::DebitRequest;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

/// Sandbox endpoint used when no service URL is configured
pub const DEFAULT_SERVICE_URL: &str = "https://v1-hub-staging.sph-test-solinor.com";

/// Default location of the persisted gateway settings, without extension
pub const DEFAULT_SETTINGS_PATH: &str = "settings/payment_highway";

/// Persisted gateway settings
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentHighwayConfig {
    /// Signature key id
    pub api_key_id: String,
    /// Signature secret
    pub api_key_secret: String,
    /// Merchant account id
    pub sph_account: String,
    /// Merchant id
    pub sph_merchant: String,
    /// Service base URL
    pub sph_url: String,
    /// Language tag for the hosted forms (EN, FI, SV, ...)
    pub sph_locale: String,
    /// Store tokens for cards that require CVC on later charges
    pub accept_cvc_required: bool,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PaymentHighwayConfig {
    fn default() -> Self {
        Self {
            api_key_id: String::new(),
            api_key_secret: String::new(),
            sph_account: String::new(),
            sph_merchant: String::new(),
            sph_url: DEFAULT_SERVICE_URL.to_string(),
            sph_locale: "EN".to_string(),
            accept_cvc_required: false,
            timeout_secs: 30,
        }
    }
}

impl PaymentHighwayConfig {
    /// Load settings from `PAYMENT_HIGHWAY_SETTINGS` (or the default path)
    /// overlaid with `PAYMENT_HIGHWAY_*` environment variables
    pub fn from_env() -> GatewayResult<Self> {
        let path = std::env::var("PAYMENT_HIGHWAY_SETTINGS")
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());
        Self::load(&path)
    }

    pub fn load(settings_path: &str) -> GatewayResult<Self> {
        let defaults = Self::default();
        let settings = ::config::Config::builder()
            .set_default("sph_url", defaults.sph_url)
            .and_then(|b| b.set_default("sph_locale", defaults.sph_locale))
            .and_then(|b| b.set_default("accept_cvc_required", defaults.accept_cvc_required))
            .and_then(|b| b.set_default("timeout_secs", defaults.timeout_secs))
            .map_err(|e| GatewayError::configuration(e.to_string()))?
            .add_source(::config::File::with_name(settings_path).required(false))
            .add_source(::config::Environment::with_prefix("PAYMENT_HIGHWAY").try_parsing(true))
            .build()
            .map_err(|e| GatewayError::configuration(e.to_string()))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| GatewayError::configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        let required = [
            ("api_key_id", &self.api_key_id),
            ("api_key_secret", &self.api_key_secret),
            ("sph_account", &self.sph_account),
            ("sph_merchant", &self.sph_merchant),
            ("sph_locale", &self.sph_locale),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(GatewayError::configuration(format!(
                    "{} cannot be empty",
                    name
                )));
            }
        }

        url::Url::parse(&self.sph_url).map_err(|e| {
            GatewayError::configuration(format!("sph_url '{}' is invalid: {}", self.sph_url, e))
        })?;

        if self.timeout_secs == 0 {
            return Err(GatewayError::configuration(
                "timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn signer(&self) -> SecureSigner {
        SecureSigner::new(&self.api_key_id, &self.api_key_secret)
    }

    pub fn service_url(&self) -> &str {
        self.sph_url.trim_end_matches('/')
    }
}

/// HTTP implementation of [`PaymentApi`]
pub struct PaymentHighwayClient {
    config: PaymentHighwayConfig,
    signer: SecureSigner,
    stamps: Arc<dyn StampSource>,
    client: Client,
}

impl PaymentHighwayClient {
    pub fn new(config: PaymentHighwayConfig) -> GatewayResult<Self> {
        Self::with_stamp_source(config, Arc::new(SystemStamp))
    }

    pub fn with_stamp_source(
        config: PaymentHighwayConfig,
        stamps: Arc<dyn StampSource>,
    ) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("payment-highway-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                GatewayError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        info!(
            "Payment Highway client initialized: url={}, account={}, merchant={}",
            config.service_url(),
            config.sph_account,
            config.sph_merchant
        );

        Ok(Self {
            signer: config.signer(),
            config,
            stamps,
            client,
        })
    }

    /// Send one signed request and decode the result envelope
    async fn make_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> GatewayResult<VendorResponse> {
        let url = format!("{}{}", self.config.service_url(), path);
        let body_text = match body {
            Some(body) => serde_json::to_string(body)?,
            None => String::new(),
        };

        let stamp = self.stamps.stamp();
        let sph_headers = [
            ("sph-account", self.config.sph_account.as_str()),
            ("sph-merchant", self.config.sph_merchant.as_str()),
            ("sph-timestamp", stamp.timestamp.as_str()),
            ("sph-request-id", stamp.request_id.as_str()),
        ];
        let signature = self
            .signer
            .sign(method.as_str(), path, sph_headers, &body_text);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header("Authorization", signature)
            .header("Content-Type", "application/json; charset=utf-8");
        for (name, value) in sph_headers {
            request = request.header(name, value);
        }
        if !body_text.is_empty() {
            request = request.body(body_text);
        }

        debug!("Payment Highway request: {} {}", method, path);

        let response = request.send().await.map_err(|e| {
            error!("Payment Highway request {} {} failed: {}", method, path, e);
            GatewayError::from(e)
        })?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| {
            error!("Failed to read Payment Highway response body: {}", e);
            GatewayError::unreachable(format!("failed to read body: {}", e))
        })?;

        if status.is_server_error() {
            error!(
                "Payment Highway server error on {} {}: HTTP {}",
                method, path, status
            );
            return Err(GatewayError::unreachable(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        VendorResponse::from_body(&response_text).map_err(|e| {
            error!(
                "Failed to parse Payment Highway response to {} {} (HTTP {}): {}",
                method, path, status, e
            );
            e
        })
    }
}

#[async_trait]
impl PaymentApi for PaymentHighwayClient {
    async fn init_transaction(&self) -> GatewayResult<VendorResponse> {
        self.make_request(Method::POST, "/transaction", None).await
    }

    async fn debit_transaction(
        &self,
        transaction_id: &str,
        request: &DebitRequest,
    ) -> GatewayResult<VendorResponse> {
        info!(
            "Debiting Payment Highway transaction {}: {} {} order={}",
            transaction_id, request.amount, request.currency, request.order
        );
        let payload = serde_json::to_value(request)?;
        self.make_request(
            Method::POST,
            &format!("/transaction/{}/debit", transaction_id),
            Some(&payload),
        )
        .await
    }

    async fn commit_form_transaction(
        &self,
        transaction_id: &str,
        amount: i64,
        currency: &str,
    ) -> GatewayResult<VendorResponse> {
        info!(
            "Committing Payment Highway transaction {}: {} {}",
            transaction_id, amount, currency
        );
        let payload = serde_json::json!({
            "amount": amount,
            "currency": currency,
        });
        self.make_request(
            Method::POST,
            &format!("/transaction/{}/commit", transaction_id),
            Some(&payload),
        )
        .await
    }

    async fn revert_transaction(
        &self,
        transaction_id: &str,
        amount: Option<i64>,
    ) -> GatewayResult<VendorResponse> {
        // No amount reverts the full transaction
        let payload = match amount {
            Some(amount) => serde_json::json!({ "amount": amount }),
            None => serde_json::json!({}),
        };
        self.make_request(
            Method::POST,
            &format!("/transaction/{}/revert", transaction_id),
            Some(&payload),
        )
        .await
    }

    async fn tokenize(&self, tokenization_id: &str) -> GatewayResult<VendorResponse> {
        self.make_request(
            Method::GET,
            &format!("/tokenization/{}", tokenization_id),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PaymentHighwayConfig {
        PaymentHighwayConfig {
            api_key_id: "testKey".to_string(),
            api_key_secret: "testSecret".to_string(),
            sph_account: "test".to_string(),
            sph_merchant: "test_merchantId".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_config_default() {
        let config = PaymentHighwayConfig::default();
        assert_eq!(config.sph_url, DEFAULT_SERVICE_URL);
        assert_eq!(config.sph_locale, "EN");
        assert!(!config.accept_cvc_required);
        assert_eq!(config.timeout_secs, 30);
    }

    #[test]
    fn test_config_validation() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.api_key_secret = " ".to_string();
        assert!(matches!(
            config.validate(),
            Err(GatewayError::Configuration { .. })
        ));

        let mut config = valid_config();
        config.sph_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_url_strips_trailing_slash() {
        let mut config = valid_config();
        config.sph_url = "https://example.test/".to_string();
        assert_eq!(config.service_url(), "https://example.test");
    }

    #[test]
    fn test_config_load_missing_file_without_env_fails() {
        let result = PaymentHighwayConfig::load("does/not/exist/payment_highway");
        // Required credentials are absent unless the environment provides them
        if std::env::var("PAYMENT_HIGHWAY_API_KEY_ID").is_err() {
            assert!(result.is_err());
        }
    }
}
