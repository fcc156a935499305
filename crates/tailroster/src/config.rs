//! Configuration management for tailroster.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::aircraft::Identifier;
use crate::auth::DuplicatePolicy;
use crate::error::{Error, Result};
use crate::pool::{DEFAULT_MAX_ATTEMPTS, DEFAULT_SEED};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default configuration directory name.
const CONFIG_DIR_NAME: &str = "tailroster";

/// Environment variable prefix.
const ENV_PREFIX: &str = "TAILROSTER_";

/// Public aircraft registration lookup service.
const DEFAULT_BASE_URL: &str = "https://api.adsbdb.com/v0";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `TAILROSTER_`, `__` between levels)
/// 2. TOML config file at `~/.config/tailroster/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream lookup configuration.
    pub lookup: LookupConfig,
    /// Roster aggregation configuration.
    pub roster: RosterConfig,
    /// Credential store configuration.
    pub auth: AuthConfig,
}

/// Upstream lookup configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Base URL of the registration lookup API.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Connection timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Overrides the default `tailroster/<version>` user agent.
    pub user_agent: Option<String>,
}

/// Roster aggregation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    /// Registrations always placed at the front of the working set.
    pub seed_registrations: Vec<String>,
    /// Size of the working set submitted to the aggregator.
    pub target_size: usize,
    /// Maximum number of records in a roster.
    pub cap: usize,
    /// Overall deadline for one aggregation in milliseconds.
    pub deadline_ms: u64,
    /// Maximum candidate draws when synthesizing identifiers.
    pub max_generation_attempts: usize,
    /// Prefix letters for synthesized identifiers.
    pub prefixes: String,
}

/// Credential store configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// What to do when a username is registered twice.
    pub duplicate_usernames: DuplicatePolicy,
    /// Require a successful login before fetching a roster.
    pub require_login: bool,
    /// Accounts registered into the in-memory store at startup.
    pub accounts: Vec<AccountConfig>,
}

/// An account registered at startup.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_ms: 30_000,
            connect_timeout_ms: 10_000,
            user_agent: None,
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            seed_registrations: DEFAULT_SEED.iter().map(ToString::to_string).collect(),
            target_size: 15,
            cap: 15,
            deadline_ms: 20_000,
            max_generation_attempts: DEFAULT_MAX_ATTEMPTS,
            prefixes: "N".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `TAILROSTER_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let base_url = &self.lookup.base_url;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(invalid(format!(
                "base_url must start with http:// or https:// (got {base_url})"
            )));
        }

        if self.lookup.request_timeout_ms == 0 {
            return Err(invalid("request_timeout_ms must be greater than 0"));
        }
        if self.lookup.connect_timeout_ms == 0 {
            return Err(invalid("connect_timeout_ms must be greater than 0"));
        }

        if self.roster.target_size == 0 {
            return Err(invalid("target_size must be greater than 0"));
        }
        if self.roster.deadline_ms == 0 {
            return Err(invalid("deadline_ms must be greater than 0"));
        }
        if self.roster.max_generation_attempts == 0 {
            return Err(invalid("max_generation_attempts must be greater than 0"));
        }

        if self.roster.prefixes.is_empty()
            || !self.roster.prefixes.chars().all(|c| c.is_ascii_uppercase())
        {
            return Err(invalid(format!(
                "prefixes must be one or more letters A-Z (got '{}')",
                self.roster.prefixes
            )));
        }

        for seed in &self.roster.seed_registrations {
            Identifier::parse(seed).map_err(|e| invalid(format!("seed registration: {e}")))?;
        }

        for account in &self.auth.accounts {
            if account.username.is_empty() || account.password.is_empty() {
                return Err(invalid("accounts need a non-empty username and password"));
            }
        }

        Ok(())
    }

    /// Get the per-request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup.request_timeout_ms)
    }

    /// Get the connect timeout as a Duration.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup.connect_timeout_ms)
    }

    /// Get the aggregation deadline as a Duration.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.roster.deadline_ms)
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}
