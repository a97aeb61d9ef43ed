//! # Checkout Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_STORE_NAME, TILL_CHANGE_URL, TILL_SALES_URL,                  │
//! │     TILL_REQUEST_TIMEOUT_MS, TILL_PAPER_WIDTH                          │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/pos/till.toml (Linux)                                    │
//! │     ~/Library/Application Support/com.till.pos/till.toml (macOS)       │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     No remote services: local change, locally issued sale ids          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! name = "Corner Store"
//! address_lines = ["12 Mall Road", "Lahore"]
//! currency_symbol = "Rs "
//!
//! [services]
//! change_url = "http://10.0.0.5:8080/api"
//! sales_url = "http://10.0.0.5:8080/api"
//! request_timeout_ms = 3000
//! connect_timeout_ms = 1000
//!
//! [receipt]
//! paper_width = 42
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use till_core::receipt::{MAX_PAPER_WIDTH, MIN_PAPER_WIDTH};
use till_core::StoreProfile;

use crate::error::ConfigError;

// =============================================================================
// Store Settings
// =============================================================================

/// Store details printed on receipts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_store_name")]
    pub name: String,

    #[serde(default)]
    pub address_lines: Vec<String>,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_store_name() -> String {
    "Till POS".to_string()
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            name: default_store_name(),
            address_lines: Vec::new(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

// =============================================================================
// Service Settings
// =============================================================================

/// Remote collaborators. An absent URL selects the local path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Base URL of the change-calculation service (`{base}/change`).
    #[serde(default)]
    pub change_url: Option<String>,

    /// Base URL of the sale-submission service (`{base}/sales`).
    #[serde(default)]
    pub sales_url: Option<String>,

    /// Whole-request timeout (milliseconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Connection timeout (milliseconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_request_timeout() -> u64 {
    3_000
}

fn default_connect_timeout() -> u64 {
    1_000
}

impl Default for ServiceSettings {
    fn default() -> Self {
        ServiceSettings {
            change_url: None,
            sales_url: None,
            request_timeout_ms: default_request_timeout(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

impl ServiceSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

// =============================================================================
// Receipt Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptSettings {
    /// Characters per printed line.
    #[serde(default = "default_paper_width")]
    pub paper_width: usize,
}

fn default_paper_width() -> usize {
    42
}

impl Default for ReceiptSettings {
    fn default() -> Self {
        ReceiptSettings {
            paper_width: default_paper_width(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub services: ServiceSettings,

    #[serde(default)]
    pub receipt: ReceiptSettings,
}

impl CheckoutConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (till.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> Result<(), ConfigError> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::SaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in [&self.services.change_url, &self.services.sales_url]
            .into_iter()
            .flatten()
        {
            validate_service_url(url)?;
        }

        if self.services.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.services.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_ms must be greater than 0".into(),
            ));
        }

        if !(MIN_PAPER_WIDTH..=MAX_PAPER_WIDTH).contains(&self.receipt.paper_width) {
            return Err(ConfigError::Invalid(format!(
                "paper_width must be between {} and {}, got {}",
                MIN_PAPER_WIDTH, MAX_PAPER_WIDTH, self.receipt.paper_width
            )));
        }

        Ok(())
    }

    /// Applies overrides from a key lookup (the process environment in
    /// [`load`](Self::load)).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("TILL_STORE_NAME") {
            self.store.name = name;
        }

        if let Some(url) = lookup("TILL_CHANGE_URL") {
            debug!(url = %url, "Overriding change service URL from environment");
            self.services.change_url = Some(url).filter(|u| !u.trim().is_empty());
        }

        if let Some(url) = lookup("TILL_SALES_URL") {
            debug!(url = %url, "Overriding sales service URL from environment");
            self.services.sales_url = Some(url).filter(|u| !u.trim().is_empty());
        }

        if let Some(timeout) = lookup("TILL_REQUEST_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(ms) => self.services.request_timeout_ms = ms,
                Err(_) => warn!(value = %timeout, "Ignoring non-numeric TILL_REQUEST_TIMEOUT_MS"),
            }
        }

        if let Some(width) = lookup("TILL_PAPER_WIDTH") {
            match width.parse::<usize>() {
                Ok(w) => self.receipt.paper_width = w,
                Err(_) => warn!(value = %width, "Ignoring non-numeric TILL_PAPER_WIDTH"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "pos")
            .map(|dirs| dirs.config_dir().join("till.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Store header for the receipt formatter.
    pub fn store_profile(&self) -> StoreProfile {
        StoreProfile {
            name: self.store.name.clone(),
            address_lines: self.store.address_lines.clone(),
            currency_symbol: self.store.currency_symbol.clone(),
        }
    }

    pub fn change_url(&self) -> Option<&str> {
        self.services.change_url.as_deref()
    }

    pub fn sales_url(&self) -> Option<&str> {
        self.services.sales_url.as_deref()
    }

    pub fn paper_width(&self) -> usize {
        self.receipt.paper_width
    }
}

fn validate_service_url(raw: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(raw)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl(format!(
            "Service URL must use http:// or https://, got {}://",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CheckoutConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.change_url(), None);
        assert_eq!(config.sales_url(), None);
        assert_eq!(config.paper_width(), 42);
        assert_eq!(config.services.request_timeout(), Duration::from_millis(3_000));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = CheckoutConfig::from_toml(
            r#"
            [store]
            name = "Corner Store"

            [services]
            change_url = "http://localhost:8080/api"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.name, "Corner Store");
        assert_eq!(config.store.currency_symbol, "$");
        assert_eq!(config.change_url(), Some("http://localhost:8080/api"));
        assert_eq!(config.services.connect_timeout_ms, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CheckoutConfig::default();

        config.services.change_url = Some("ws://localhost:8080".into());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        config.services.change_url = Some("not a url".into());
        assert!(config.validate().is_err());

        config.services.change_url = Some("https://pos.example.com".into());
        assert!(config.validate().is_ok());

        config.services.request_timeout_ms = 0;
        assert!(config.validate().is_err());
        config.services.request_timeout_ms = 500;

        config.receipt.paper_width = 80;
        assert!(config.validate().is_err());
        config.receipt.paper_width = 32;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let mut config = CheckoutConfig::default();
        config.apply_overrides(lookup(&[
            ("TILL_STORE_NAME", "Night Shop"),
            ("TILL_CHANGE_URL", "http://change.local"),
            ("TILL_REQUEST_TIMEOUT_MS", "250"),
            ("TILL_PAPER_WIDTH", "wide"),
        ]));

        assert_eq!(config.store.name, "Night Shop");
        assert_eq!(config.change_url(), Some("http://change.local"));
        assert_eq!(config.services.request_timeout_ms, 250);
        assert_eq!(config.paper_width(), 42);
    }

    #[test]
    fn test_blank_url_override_disables_service() {
        let mut config = CheckoutConfig::default();
        config.services.sales_url = Some("http://sales.local".into());
        config.apply_overrides(lookup(&[("TILL_SALES_URL", "")]));
        assert_eq!(config.sales_url(), None);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("till-config-{}", uuid::Uuid::new_v4()))
            .join("till.toml");

        let mut config = CheckoutConfig::default();
        config.store.name = "Saved Store".into();
        config.receipt.paper_width = 32;
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[store]"));
        assert!(contents.contains("[receipt]"));

        let loaded = CheckoutConfig::from_toml(&contents).unwrap();
        assert_eq!(loaded.store.name, "Saved Store");
        assert_eq!(loaded.paper_width(), 32);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_load_or_default_falls_back_on_bad_file() {
        let dir = std::env::temp_dir().join(format!("till-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("till.toml");
        std::fs::write(&path, "[receipt]\npaper_width = 5\n").unwrap();

        assert!(CheckoutConfig::load(Some(path.clone())).is_err());
        assert_eq!(CheckoutConfig::load_or_default(Some(path)).paper_width(), 42);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_store_profile() {
        let mut config = CheckoutConfig::default();
        config.store.address_lines = vec!["12 Mall Road".into()];
        let profile = config.store_profile();
        assert_eq!(profile.name, "Till POS");
        assert_eq!(profile.address_lines, vec!["12 Mall Road".to_string()]);
    }
}
