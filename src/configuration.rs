use std::time::Duration;

use crate::error::{AppError, ConfigError};

/// Minimum accepted length of the HMAC signing secret, in bytes
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub sessions: SessionSettings,
    #[serde(default)]
    pub bootstrap: BootstrapSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// Access-token signing settings. Loaded once at startup, never mutated.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,   // seconds (900 = 15 minutes)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64,  // seconds (2592000 = 30 days)
}

impl std::fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSettings")
            .field("secret", &"[redacted]")
            .field("issuer", &self.issuer)
            .field("access_token_expiry", &self.access_token_expiry)
            .field("refresh_token_expiry", &self.refresh_token_expiry)
            .finish()
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct SessionSettings {
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 3600,
        }
    }
}

impl SessionSettings {
    /// Period of the expired-session sweep
    ///
    /// # Errors
    /// Returns `AppError::Config` when the interval is zero
    pub fn sweep_interval(&self) -> Result<Duration, AppError> {
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "sessions.sweep_interval_secs must be positive".to_string(),
            )
            .into());
        }
        Ok(Duration::from_secs(self.sweep_interval_secs))
    }
}

/// Initial administrator, created only when the user table is empty
#[derive(serde::Deserialize, Clone, Default)]
pub struct BootstrapSettings {
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout() -> u64 {
    5
}

fn default_issuer() -> String {
    "iam_server".to_string()
}

fn default_access_token_expiry() -> i64 {
    15 * 60
}

fn default_refresh_token_expiry() -> i64 {
    30 * 24 * 60 * 60
}

/// Reads `configuration.yaml` (optional) and `APP_*` environment overrides,
/// e.g. `APP_JWT__SECRET` or `APP_DATABASE__HOST`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let settings = SessionSettings {
            sweep_interval_secs: 0,
        };

        assert!(matches!(
            settings.sweep_interval(),
            Err(AppError::Config(ConfigError::InvalidValue(_)))
        ));
    }

    #[test]
    fn default_sweep_interval_is_one_hour() {
        let interval = SessionSettings::default().sweep_interval().unwrap();

        assert_eq!(interval, Duration::from_secs(3600));
    }
}
