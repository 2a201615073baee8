// Storefront configuration: backend endpoint, pricing and booking limits

use std::path::Path;
use std::time::Duration;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use rust_decimal::Decimal;
use serde::Deserialize;
use smart_default::SmartDefault;

#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct StorefrontConfig {
    // Base URL of the booking backend, without the `/api` suffix
    #[default("http://localhost:5000".to_owned())]
    pub base_url: String,

    // Upper bound for a single HTTP call
    #[default(Duration::from_secs(10))]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    // Taxes & fees applied on top of the room charge
    #[default(Decimal::new(18, 2))]
    pub tax_rate: Decimal,

    #[default(4)]
    pub max_guests: u32,

    pub retry: RetryConfig,

    pub room_cache: RoomCacheConfig,
}

impl StorefrontConfig {
    /// Creates a new [`StorefrontConfig`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with `STOREFRONT__*` environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be parsed or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::<DefaultState>::default();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config: Self = builder
            .add_source(config::Environment::with_prefix("STOREFRONT").separator("__"))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tax_rate.is_sign_negative() {
            return Err(ConfigError::Message(format!(
                "tax_rate must not be negative, got {}",
                self.tax_rate
            )));
        }
        if self.max_guests == 0 {
            return Err(ConfigError::Message(
                "max_guests must be at least 1".to_owned(),
            ));
        }
        if self.room_cache.max_entries == 0 {
            return Err(ConfigError::Message(
                "room_cache.max_entries must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

// Retry configuration for catalog reads; bookings are never retried
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 2000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

// Room detail cache configuration
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct RoomCacheConfig {
    #[default(Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,

    #[default(256)]
    pub max_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.tax_rate, Decimal::new(18, 2));
        assert_eq!(config.max_guests, 4);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.room_cache.ttl, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_merges_defaults() {
        let path = std::env::temp_dir().join(format!(
            "villa_storefront_config_{}.toml",
            std::process::id()
        ));
        fs::write(
            &path,
            r#"
base_url = "https://villas.example.com"
request_timeout = "3s"
max_guests = 6

[room_cache]
ttl = "5m"
"#,
        )
        .unwrap();

        let config = StorefrontConfig::load(Some(&path)).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.base_url, "https://villas.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.max_guests, 6);
        assert_eq!(config.room_cache.ttl, Duration::from_secs(300));
        assert_eq!(config.room_cache.max_entries, 256);
        assert_eq!(config.tax_rate, Decimal::new(18, 2));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("villa_storefront_does_not_exist.toml");
        let config = StorefrontConfig::load(Some(&path)).unwrap();
        assert_eq!(config.max_guests, 4);
    }

    #[test]
    fn test_validate_rejects_zero_guests() {
        let config = StorefrontConfig {
            max_guests: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_tax() {
        let config = StorefrontConfig {
            tax_rate: Decimal::new(-1, 2),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
