// ============================
// vidtube-backend/src/config.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `VIDTUBE__<SECTION>__<KEY>` environment variables.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::PasswordRequirements;

/// Default config file looked up by [`Settings::load`]
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "VIDTUBE";

/// Minimum accepted length of a signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime, in seconds (100 years)
pub const MAX_TOKEN_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub tokens: TokenSettings,
    pub cookies: CookieSettings,
    pub passwords: PasswordSettings,
    pub media: MediaSettings,
    pub sessions: SessionSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Single origin allowed to make credentialed cross-origin calls
    pub cors_origin: Option<String>,
    /// Upper bound on JSON request bodies
    pub json_body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origin: None,
            json_body_limit_bytes: 20 * 1024,
        }
    }
}

/// Where the flat-file credential store keeps `principals.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub path: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data"),
        }
    }
}

/// Secrets and lifetimes for the two token kinds
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
    pub access_secret: String,
    pub access_ttl_secs: u64,
    pub refresh_secret: String,
    pub refresh_ttl_secs: u64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_secret: String::new(),
            access_ttl_secs: 15 * 60,
            refresh_secret: String::new(),
            refresh_ttl_secs: 60 * 60 * 24 * 10, // 10 days
        }
    }
}

impl TokenSettings {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }
}

impl std::fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_secret", &"<redacted>")
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Attributes of the `accessToken`/`refreshToken` cookies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieSettings {
    pub secure: bool,
    pub same_site: SameSite,
    pub path: String,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secure: true,
            same_site: SameSite::Strict,
            path: "/".to_string(),
        }
    }
}

/// Password complexity requirements and hashing cost
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordSettings {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
    /// scrypt CPU/memory cost as log2(N)
    pub scrypt_log_n: u8,
}

impl Default for PasswordSettings {
    fn default() -> Self {
        let req = PasswordRequirements::default();
        Self {
            min_length: req.min_length,
            require_uppercase: req.require_uppercase,
            require_lowercase: req.require_lowercase,
            require_digit: req.require_digit,
            require_special: req.require_special,
            scrypt_log_n: 15,
        }
    }
}

impl PasswordSettings {
    pub fn requirements(&self) -> PasswordRequirements {
        PasswordRequirements {
            min_length: self.min_length,
            require_uppercase: self.require_uppercase,
            require_lowercase: self.require_lowercase,
            require_digit: self.require_digit,
            require_special: self.require_special,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Directory holding uploaded objects
    pub path: PathBuf,
    /// Prefix of the URLs handed back for uploaded objects
    pub public_base_url: String,
    pub max_upload_bytes: usize,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("media"),
            public_base_url: "http://127.0.0.1:8000/media".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Clear the stored refresh token when the password changes
    pub revoke_on_password_change: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl Settings {
    /// Load from [`DEFAULT_CONFIG_PATH`] (if present) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific TOML file (if present) and the environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let settings = Config::builder()
            .add_source(File::new(&path, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    /// Parse a TOML document on top of the defaults, ignoring the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize::<Settings>()?;
        Ok(settings)
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind address: {e}")))
    }

    /// Reject settings the server must not start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let tokens = &self.tokens;
        for (name, secret) in [
            ("tokens.access_secret", &tokens.access_secret),
            ("tokens.refresh_secret", &tokens.refresh_secret),
        ] {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be at least {MIN_SECRET_LEN} bytes"
                )));
            }
        }
        if tokens.access_secret == tokens.refresh_secret {
            return Err(ConfigError::Invalid(
                "access and refresh secrets must differ".to_string(),
            ));
        }
        if tokens.access_ttl_secs == 0 || tokens.refresh_ttl_secs == 0 {
            return Err(ConfigError::Invalid("token lifetimes must be non-zero".to_string()));
        }
        if tokens.access_ttl_secs > MAX_TOKEN_TTL_SECS
            || tokens.refresh_ttl_secs > MAX_TOKEN_TTL_SECS
        {
            return Err(ConfigError::Invalid(format!(
                "token lifetimes must not exceed {MAX_TOKEN_TTL_SECS} seconds"
            )));
        }
        if tokens.access_ttl_secs >= tokens.refresh_ttl_secs {
            return Err(ConfigError::Invalid(
                "access token lifetime must be shorter than refresh token lifetime".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown log level '{}'",
                self.log.level
            )));
        }

        if !(4..=20).contains(&self.passwords.scrypt_log_n) {
            return Err(ConfigError::Invalid(
                "passwords.scrypt_log_n must be between 4 and 20".to_string(),
            ));
        }
        if self.passwords.min_length == 0 {
            return Err(ConfigError::Invalid(
                "passwords.min_length must be non-zero".to_string(),
            ));
        }

        if self.cookies.same_site == SameSite::None && !self.cookies.secure {
            return Err(ConfigError::Invalid(
                "cookies.same_site = none requires cookies.secure".to_string(),
            ));
        }

        if self.media.max_upload_bytes == 0 || self.server.json_body_limit_bytes == 0 {
            return Err(ConfigError::Invalid("body limits must be non-zero".to_string()));
        }

        if let Some(origin) = &self.server.cors_origin {
            if origin == "*" {
                return Err(ConfigError::Invalid(
                    "server.cors_origin cannot be a wildcard for credentialed requests"
                        .to_string(),
                ));
            }
            axum::http::HeaderValue::from_str(origin)
                .map_err(|_| ConfigError::Invalid(format!("bad cors origin '{origin}'")))?;
        }

        self.bind_addr()?;
        Ok(())
    }
}
