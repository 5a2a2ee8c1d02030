//! Run configuration, loaded from a sectioned TOML file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::holding::{DesiredState, HoldingRequest};

pub const DEFAULT_TOKEN_URL: &str = "https://oauth.oclc.org/token";
pub const DEFAULT_SERVICE_URL: &str = "https://metadata.api.oclc.org";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("missing required config key: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub oclc: OclcConfig,
    #[serde(default)]
    pub folio: Option<FolioConfig>,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub testing: TestingConfig,
}

#[derive(Clone, Deserialize)]
pub struct OclcConfig {
    #[serde(default)]
    pub ws_key: String,
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_service_url")]
    pub service_url: String,
}

impl Default for OclcConfig {
    fn default() -> Self {
        Self {
            ws_key: String::new(),
            secret: String::new(),
            token_url: default_token_url(),
            service_url: default_service_url(),
        }
    }
}

impl fmt::Debug for OclcConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OclcConfig")
            .field("ws_key", &self.ws_key)
            .field("secret", &"[REDACTED]")
            .field("token_url", &self.token_url)
            .field("service_url", &self.service_url)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub okapi_url: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Identifier type UUID marking an instance identifier as an OCLC number.
    #[serde(default)]
    pub id_type_oclc: String,
    /// Instance status UUID meaning "set holding in WorldCat".
    #[serde(default)]
    pub instance_status_set: String,
    /// Instance status UUID meaning "withdraw holding from WorldCat".
    #[serde(default)]
    pub instance_status_withdraw: String,
    #[serde(default = "default_folio_limit")]
    pub limit: u32,
}

impl fmt::Debug for FolioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolioConfig")
            .field("okapi_url", &self.okapi_url)
            .field("tenant_id", &self.tenant_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("id_type_oclc", &self.id_type_oclc)
            .field("instance_status_set", &self.instance_status_set)
            .field("instance_status_withdraw", &self.instance_status_withdraw)
            .field("limit", &self.limit)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub from_name: Option<String>,
    #[serde(default)]
    pub to_address: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            from_address: String::new(),
            from_name: None,
            to_address: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    pub log_file: Option<PathBuf>,
    /// `EnvFilter` directive, e.g. "info" or "folio_oclc_sync=debug".
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Static OCLC numbers to process instead of querying FOLIO.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestingConfig {
    #[serde(default)]
    pub set: Vec<String>,
    #[serde(default)]
    pub withdraw: Vec<String>,
}

impl TestingConfig {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.withdraw.is_empty()
    }

    /// Requests for the configured test numbers, sets first.
    pub fn requests(&self) -> Vec<HoldingRequest> {
        let sets = self
            .set
            .iter()
            .map(|n| HoldingRequest::new(n.trim(), DesiredState::Set));
        let withdraws = self
            .withdraw
            .iter()
            .map(|n| HoldingRequest::new(n.trim(), DesiredState::Withdrawn));
        sets.chain(withdraws).collect()
    }
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_string()
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_string()
}

fn default_folio_limit() -> u32 {
    1000
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Read, parse, and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Check required keys. FOLIO settings are only required when no test
    /// numbers are configured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require(&self.oclc.ws_key, "oclc.ws_key")?;
        require(&self.oclc.secret, "oclc.secret")?;
        require(&self.email.from_address, "email.from_address")?;
        require(&self.email.to_address, "email.to_address")?;

        if self.testing.is_empty() {
            let folio = self.folio.as_ref().ok_or(ConfigError::Missing("folio"))?;
            require(&folio.okapi_url, "folio.okapi_url")?;
            require(&folio.tenant_id, "folio.tenant_id")?;
            require(&folio.username, "folio.username")?;
            require(&folio.password, "folio.password")?;
            require(&folio.id_type_oclc, "folio.id_type_oclc")?;
            require(&folio.instance_status_set, "folio.instance_status_set")?;
            require(&folio.instance_status_withdraw, "folio.instance_status_withdraw")?;
        }
        Ok(())
    }
}

fn require(value: &str, key: &'static str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing(key));
    }
    Ok(())
}
