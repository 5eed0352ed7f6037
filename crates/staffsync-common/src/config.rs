//! Gateway configuration.
//!
//! Configuration is loaded from `~/.config/staffsync/config.toml`.
//!
//! ## Example Configuration
//!
//! ```toml
//! base_url = "https://hr.example.com/api"
//! fallback_collection = "employees"
//! strict_decoding = false
//! login_path = "auth/login"
//! # timeout_seconds = 30
//! # credential_file = "/var/lib/staffsync/credentials.json"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use typed_builder::TypedBuilder;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`GatewayConfig`].
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias using `ConfigError`.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Settings shared by the gateway, the session helpers and the CLI.
///
/// # Examples
///
/// ```
/// use staffsync_common::GatewayConfig;
///
/// let config = GatewayConfig::builder()
///     .base_url("https://hr.example.com/api")
///     .timeout_seconds(30)
///     .build();
///
/// assert_eq!(config.fallback_collection, "employees");
/// assert_eq!(config.endpoint("employees"), "https://hr.example.com/api/employees");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL that relative resource paths are joined onto.
    #[builder(setter(into), default = default_base_url())]
    pub base_url: String,

    /// Client-side request timeout. `None` means requests never time out.
    #[builder(default, setter(strip_option))]
    pub timeout_seconds: Option<u64>,

    /// Collection name used for the `{ <name>: [] }` fallback payload.
    #[builder(setter(into), default = default_fallback_collection())]
    pub fallback_collection: String,

    /// Report malformed success bodies instead of substituting the fallback.
    #[builder(default)]
    pub strict_decoding: bool,

    /// Credential file location. `None` uses the platform data directory.
    #[builder(default, setter(strip_option, into))]
    pub credential_file: Option<PathBuf>,

    /// Path of the login endpoint, relative to `base_url`.
    #[builder(setter(into), default = default_login_path())]
    pub login_path: String,
}

fn default_base_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_fallback_collection() -> String {
    "employees".to_string()
}

fn default_login_path() -> String {
    "auth/login".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GatewayConfig {
    /// Creates a configuration for `base_url` with every other field defaulted.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::builder().base_url(base_url).build()
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = Some(timeout_seconds);
        self
    }

    /// Sets the fallback collection name.
    #[must_use]
    pub fn with_fallback_collection(mut self, collection: impl Into<String>) -> Self {
        self.fallback_collection = collection.into();
        self
    }

    /// Enables or disables strict decoding of success bodies.
    #[must_use]
    pub const fn with_strict_decoding(mut self, strict: bool) -> Self {
        self.strict_decoding = strict;
        self
    }

    /// Sets the credential file location.
    #[must_use]
    pub fn with_credential_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_file = Some(path.into());
        self
    }

    /// Loads configuration from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config directory cannot be determined
    /// - The file doesn't exist
    /// - Deserialization or validation fails
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Err(ConfigError::Invalid(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        Self::load_from(&path)
    }

    /// Loads the default configuration file if it exists, otherwise defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or is invalid.
    pub fn load_or_default() -> Result<Self> {
        match Self::config_path() {
            Ok(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Loads and validates configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::Invalid("Failed to determine config directory".to_string()))?
            .join("staffsync");

        Ok(config_dir.join("config.toml"))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `base_url` is not an absolute `http` or `https` URL
    /// - `fallback_collection` is empty
    /// - `timeout_seconds` is zero
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Invalid(format!("base_url '{}' is not a valid URL: {e}", self.base_url))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.fallback_collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "fallback_collection must not be empty".to_string(),
            ));
        }

        if self.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "timeout_seconds must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Joins `path` onto the base URL.
    ///
    /// Absolute `http(s)` URLs are returned unchanged.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
