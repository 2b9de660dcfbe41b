//! Application configuration management.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger engine configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Account role settings (role name to account ID).
    #[serde(default)]
    pub accounts: AccountSettings,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Monetary rounding tolerance used for balance checks.
    #[serde(default = "default_balance_epsilon")]
    pub balance_epsilon: Decimal,
    /// Account code of the retained earnings equity account.
    #[serde(default = "default_retained_earnings_code")]
    pub retained_earnings_code: String,
    /// Whether closing a period locks it immediately.
    #[serde(default)]
    pub lock_on_close: bool,
}

fn default_balance_epsilon() -> Decimal {
    Decimal::new(1, 2)
}

fn default_retained_earnings_code() -> String {
    "3201".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            balance_epsilon: default_balance_epsilon(),
            retained_earnings_code: default_retained_earnings_code(),
            lock_on_close: false,
        }
    }
}

/// Account role settings.
///
/// Keys are role names such as `sales_cash` or `purchase_payable`; values
/// are account IDs. A missing key means "fall back to the role's default codes".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountSettings {
    /// Role name to account ID.
    #[serde(flatten)]
    pub roles: HashMap<String, Uuid>,
}

impl AccountSettings {
    /// Returns the configured account for a role name, if any.
    #[must_use]
    pub fn get(&self, role: &str) -> Option<Uuid> {
        self.roles.get(role).copied()
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON formatted log lines.
    #[serde(default)]
    pub json: bool,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("NERACA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_ledger_config_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.balance_epsilon, dec!(0.01));
        assert_eq!(config.retained_earnings_code, "3201");
        assert!(!config.lock_on_close);
    }

    #[test]
    fn test_load_from_environment() {
        let cash_id = Uuid::new_v4();
        temp_env::with_vars(
            [
                ("NERACA__DATABASE__URL", Some("postgres://localhost/neraca_test")),
                ("NERACA__LEDGER__RETAINED_EARNINGS_CODE", Some("3300")),
                ("NERACA__ACCOUNTS__SALES_CASH", Some(cash_id.to_string().as_str())),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/neraca_test");
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.retained_earnings_code, "3300");
                assert_eq!(config.ledger.balance_epsilon, dec!(0.01));
                assert_eq!(config.accounts.get("sales_cash"), Some(cash_id));
                assert_eq!(config.accounts.get("sales_bank"), None);
                assert!(!config.logging.json);
            },
        );
    }

    #[test]
    fn test_load_requires_database_url() {
        temp_env::with_var_unset("NERACA__DATABASE__URL", || {
            assert!(AppConfig::load().is_err());
        });
    }
}
