use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;

use crate::payments::providers::PaymentHighwayConfig;
use crate::payments::urls::StorefrontUrls;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: Option<DatabaseConfig>,
    pub storefront: StorefrontUrls,
    pub payment_highway: PaymentHighwayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let database = match env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            }),
            Err(_) => None,
        };

        let defaults = StorefrontUrls::default();
        let storefront = StorefrontUrls {
            base_url: env::var("STORE_BASE_URL").unwrap_or(defaults.base_url),
            checkout_path: env::var("STORE_CHECKOUT_PATH").unwrap_or(defaults.checkout_path),
            account_path: env::var("STORE_ACCOUNT_PATH").unwrap_or(defaults.account_path),
            add_card_path: env::var("STORE_ADD_CARD_PATH").unwrap_or(defaults.add_card_path),
        };

        let payment_highway =
            PaymentHighwayConfig::from_env().context("Invalid Payment Highway settings")?;

        let config = Config {
            server,
            database,
            storefront,
            payment_highway,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if let Some(database) = &self.database {
            if database.url.trim().is_empty() {
                return Err(anyhow!("DATABASE_URL cannot be empty"));
            }
            if database.max_connections == 0 {
                return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
            }
        }

        self.storefront
            .validate()
            .context("Invalid storefront URLs")?;

        // Live credentials must not talk to the sandbox and vice versa
        if self.server.environment == "production"
            && self.payment_highway.sph_url.contains("sph-test")
        {
            return Err(anyhow!(
                "Production environment is configured against the Payment Highway sandbox"
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                environment: "development".to_string(),
            },
            database: None,
            storefront: StorefrontUrls::default(),
            payment_highway: PaymentHighwayConfig {
                api_key_id: "testKey".to_string(),
                api_key_secret: "testSecret".to_string(),
                sph_account: "test".to_string(),
                sph_merchant: "test_merchantId".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_validate_accepts_development_defaults() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_low_port() {
        let mut config = config();
        config.server.port = 80;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_environment() {
        let mut config = config();
        config.server.environment = "qa".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_sandbox_in_production() {
        let mut config = config();
        config.server.environment = "production".to_string();
        assert!(config.validate().is_err());

        config.payment_highway.sph_url = "https://v1-hub.solinor.com".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_pool() {
        let mut config = config();
        config.database = Some(DatabaseConfig {
            url: "postgres://localhost/shop".to_string(),
            max_connections: 0,
        });
        assert!(config.validate().is_err());
    }
}
