use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Count failed logins per identifier and client address.
    /// Off by default, account lockout still applies.
    pub rate_limit_enabled: bool,

    /// Rolling window for counting failed logins.
    pub rate_limit_window_seconds: u64,

    /// Failed logins tolerated inside the window.
    pub rate_limit_max_attempts: u64,

    pub account_lock_enabled: bool,

    pub account_lock_minutes: i64,

    /// Consecutive failed passwords before the account is locked.
    pub account_lock_attempts: i32,

    /// Minimum length of a management PIN.
    pub pin_min_length: usize,

    /// Ask for an emailed one-time code after the password is accepted.
    pub login_two_factor_enabled: bool,

    /// How long a successful settings unlock stays valid for the session.
    /// 0 requires a PIN on every settings call.
    pub settings_unlock_ttl_minutes: i64,

    /// Return reset tokens and access codes in API responses.
    /// Only meant for local development where no mailer is wired.
    pub expose_verification_codes: bool,

    /// Trusted proxy IP addresses allowed to provide forwarded client IP headers.
    ///
    /// When empty, forwarded headers are ignored for rate-limiting identity and
    /// the socket peer address is used.
    pub trusted_proxy_ips: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            rate_limit_enabled: false,
            rate_limit_window_seconds: 900,
            rate_limit_max_attempts: 5,
            account_lock_enabled: true,
            account_lock_minutes: 30,
            account_lock_attempts: 5,
            pin_min_length: 4,
            login_two_factor_enabled: true,
            settings_unlock_ttl_minutes: 0,
            expose_verification_codes: false,
            trusted_proxy_ips: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// "text" or "json"
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            log_format: "text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,

    /// Whether to set the Secure flag on session cookies.
    /// Default: true for production safety. Set to false for local development without HTTPS.
    pub secure_cookies: bool,

    /// Keep sessions in the database instead of process memory.
    pub persistent_sessions: bool,

    /// Minutes of inactivity before a session expires.
    pub session_idle_minutes: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "0.0.0.0".to_string(),
            port: 8040,
            cors_allowed_origins: vec![
                "http://localhost:8040".to_string(),
                "http://127.0.0.1:8040".to_string(),
            ],
            secure_cookies: true,
            persistent_sessions: false,
            session_idle_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/eduflow.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // A missing .env is normal outside development.
        dotenvy::dotenv().ok();

        let paths = Self::config_paths();

        let mut config = None;
        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                config = Some(Self::load_from_path(path)?);
                break;
            }
        }

        let mut config = config.unwrap_or_else(|| {
            info!("No config file found, using defaults");
            Self::default()
        });
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("EDUFLOW_DATABASE_URL") {
            self.general.database_path = url;
        }
        if let Ok(level) = std::env::var("EDUFLOW_LOG_LEVEL") {
            self.general.log_level = level;
        }
        if let Some(port) = std::env::var("EDUFLOW_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.server.port = port;
        }
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("eduflow").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".eduflow").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.general.database_path.is_empty() {
            anyhow::bail!("Database path cannot be empty");
        }

        if self.security.rate_limit_enabled
            && (self.security.rate_limit_window_seconds == 0
                || self.security.rate_limit_max_attempts == 0)
        {
            anyhow::bail!("Rate limit window and max attempts must be > 0 when enabled");
        }

        if self.security.account_lock_enabled
            && (self.security.account_lock_minutes <= 0 || self.security.account_lock_attempts <= 0)
        {
            anyhow::bail!("Account lock minutes and attempts must be > 0 when enabled");
        }

        if self.security.pin_min_length == 0 {
            anyhow::bail!("PIN minimum length must be > 0");
        }

        if self.security.settings_unlock_ttl_minutes < 0 {
            anyhow::bail!("Settings unlock TTL cannot be negative");
        }

        if !matches!(self.observability.log_format.as_str(), "text" | "json") {
            anyhow::bail!(
                "Unknown log format '{}', expected \"text\" or \"json\"",
                self.observability.log_format
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.security.rate_limit_enabled);
        assert_eq!(config.security.rate_limit_window_seconds, 900);
        assert_eq!(config.security.rate_limit_max_attempts, 5);
        assert!(config.security.account_lock_enabled);
        assert_eq!(config.security.account_lock_minutes, 30);
        assert_eq!(config.security.settings_unlock_ttl_minutes, 0);
        assert!(config.security.login_two_factor_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[security]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [security]
            rate_limit_enabled = true
            rate_limit_max_attempts = 3
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!(config.security.rate_limit_enabled);
        assert_eq!(config.security.rate_limit_max_attempts, 3);

        assert_eq!(config.security.rate_limit_window_seconds, 900);
        assert_eq!(config.server.port, 8040);
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.observability.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("eduflow-config-{}.toml", uuid::Uuid::new_v4()));
        let mut config = Config::default();
        config.security.settings_unlock_ttl_minutes = 10;
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.security.settings_unlock_ttl_minutes, 10);
        std::fs::remove_file(&path).ok();
    }
}
