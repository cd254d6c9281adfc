//! Application configuration loaded from environment variables.

use domain::user::DEFAULT_MIN_PASSWORD_LENGTH;
use domain::wallet::DEFAULT_CURRENCY;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Runtime configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `DATABASE_URL`: PostgreSQL connection string (default: unset, in-memory backend)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` or `pretty` (default: `pretty`)
/// - `METRICS_PORT`: Prometheus listener port (default: `9000`)
/// - `MIN_PASSWORD_LENGTH`: shortest accepted password (default: `8`)
/// - `WALLET_CURRENCY`: currency tag for new wallets (default: `INTERNAL_COIN`)
/// - `BCRYPT_COST`: bcrypt work factor (default: bcrypt's default)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_port: u16,
    pub min_password_length: usize,
    pub wallet_currency: String,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        fn parse_with<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|v| v.trim().parse().ok())
        }

        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            metrics_port: parse_with(&lookup, "METRICS_PORT").unwrap_or(defaults.metrics_port),
            min_password_length: parse_with(&lookup, "MIN_PASSWORD_LENGTH")
                .unwrap_or(defaults.min_password_length),
            wallet_currency: lookup("WALLET_CURRENCY").unwrap_or(defaults.wallet_currency),
            bcrypt_cost: parse_with(&lookup, "BCRYPT_COST").unwrap_or(defaults.bcrypt_cost),
        }
    }

    pub fn uses_postgres(&self) -> bool {
        self.database_url.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9000,
            min_password_length: DEFAULT_MIN_PASSWORD_LENGTH,
            wallet_currency: DEFAULT_CURRENCY.to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}
