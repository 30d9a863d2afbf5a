//! Configuration for the relay.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (GCP_*, SG_*, TEMPLATE_ID*, MAIL_*, RELAY_*)
//! 2. Config file (.submission-relay/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - An explicit `--config` path wins
//! - Otherwise searches current directory and parents for .submission-relay/config.yaml
//! - Relative `paths.home` resolves against the .submission-relay/ directory,
//!   relative `paths.scratch_dir` against the project root
//!
//! Credentials and template ids are optional here. Components ask for them
//! when they need them and get [`ConfigError::Missing`] if they are absent.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::MailStatus;

pub const ENV_PROJECT_ID: &str = "GCP_PROJECT_ID";
pub const ENV_BUCKET: &str = "GCP_BUCKET_NAME";
pub const ENV_SERVICE_ACCOUNT_KEY: &str = "GCP_SERVICE_ACCOUNT_KEY";
pub const ENV_STORAGE_ENDPOINT: &str = "GCP_STORAGE_ENDPOINT";
pub const ENV_MAIL_API_KEY: &str = "SG_API_KEY";
pub const ENV_MAIL_ENDPOINT: &str = "SG_ENDPOINT";
pub const ENV_TEMPLATE_SUCCESS: &str = "TEMPLATE_ID";
pub const ENV_TEMPLATE_FAILED: &str = "TEMPLATE_ID_FAILED";
pub const ENV_TEMPLATE_EMPTY_FILE: &str = "TEMPLATE_ID_EMPTY_FILE";
pub const ENV_MAIL_FROM: &str = "MAIL_FROM";
pub const ENV_UNSUBSCRIBE_GROUP: &str = "MAIL_UNSUBSCRIBE_GROUP";
pub const ENV_SCRATCH_DIR: &str = "RELAY_SCRATCH_DIR";
pub const ENV_HOME: &str = "RELAY_HOME";

pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_MAIL_ENDPOINT: &str = "https://api.sendgrid.com";
pub const DEFAULT_SENDER: &str = "notifications@submission-relay.local";
pub const DEFAULT_UNSUBSCRIBE_GROUP: u32 = 35630;

const CONFIG_DIR: &str = ".submission-relay";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration value: {key}")]
    Missing { key: &'static str },

    #[error("invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to determine home directory; set {}", ENV_HOME)]
    NoHome,
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub mail: MailSection,
    #[serde(default)]
    pub paths: PathsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageSection {
    pub project_id: Option<String>,
    pub bucket: Option<String>,
    /// Base64-encoded service-account JSON
    pub credentials_base64: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailSection {
    pub api_key: Option<String>,
    pub sender: Option<String>,
    pub unsubscribe_group: Option<u32>,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub templates: TemplateSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsSection {
    /// State directory (relative to .submission-relay/)
    pub home: Option<String>,
    /// Staging directory for fetched files (relative to the project root)
    pub scratch_dir: Option<String>,
}

/// Object storage settings
#[derive(Debug, Clone, Default)]
pub struct StorageSettings {
    pub project_id: Option<String>,
    pub bucket: Option<String>,
    pub credentials_base64: Option<String>,
    /// API base URL
    pub endpoint: String,
}

impl StorageSettings {
    pub fn project_id(&self) -> Result<&str, ConfigError> {
        required(&self.project_id, ENV_PROJECT_ID)
    }

    pub fn bucket(&self) -> Result<&str, ConfigError> {
        required(&self.bucket, ENV_BUCKET)
    }

    pub fn credentials_base64(&self) -> Result<&str, ConfigError> {
        required(&self.credentials_base64, ENV_SERVICE_ACCOUNT_KEY)
    }
}

/// Template identifiers, one per [`MailStatus`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateSet {
    pub success: Option<String>,
    pub failed: Option<String>,
    pub empty_file: Option<String>,
}

impl TemplateSet {
    /// Template id for an outcome
    pub fn for_status(&self, status: MailStatus) -> Result<&str, ConfigError> {
        match status {
            MailStatus::Success => required(&self.success, ENV_TEMPLATE_SUCCESS),
            MailStatus::Failed => required(&self.failed, ENV_TEMPLATE_FAILED),
            MailStatus::EmptyFile => required(&self.empty_file, ENV_TEMPLATE_EMPTY_FILE),
        }
    }
}

/// Mail provider settings
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub api_key: Option<String>,
    pub sender: String,
    /// Unsubscribe group attached to every message
    pub unsubscribe_group: u32,
    pub endpoint: String,
    pub templates: TemplateSet,
}

impl MailSettings {
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        required(&self.api_key, ENV_MAIL_API_KEY)
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            sender: DEFAULT_SENDER.to_string(),
            unsubscribe_group: DEFAULT_UNSUBSCRIBE_GROUP,
            endpoint: DEFAULT_MAIL_ENDPOINT.to_string(),
            templates: TemplateSet::default(),
        }
    }
}

/// Resolved configuration handed to each component at construction
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub storage: StorageSettings,
    pub mail: MailSettings,
    /// Staging directory for fetched files
    pub scratch_dir: PathBuf,
    /// State directory; the ledger lives under `home/ledger`
    pub home: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl RelayConfig {
    /// Load from the process environment and the discovered (or given) config file
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        let config_file = match explicit_file {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let file = config_file.as_deref().map(load_config_file).transpose()?;
        let default_home = dirs::home_dir().map(|h| h.join(CONFIG_DIR));

        Self::resolve(file, config_file, default_home, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    /// Merge a parsed config file with environment lookups
    pub fn resolve<F>(
        file: Option<ConfigFile>,
        config_file: Option<PathBuf>,
        default_home: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = file.unwrap_or_default();

        // .submission-relay/ and the project root above it
        let config_dir = config_file
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(Path::new("."));
        let base_dir = config_dir.parent().unwrap_or(Path::new("."));

        let home = match env(ENV_HOME) {
            Some(home) => PathBuf::from(home),
            None => match file.paths.home.as_deref() {
                Some(home) => resolve_path(config_dir, home),
                None => default_home.ok_or(ConfigError::NoHome)?,
            },
        };

        let scratch_dir = match env(ENV_SCRATCH_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => match file.paths.scratch_dir.as_deref() {
                Some(dir) => resolve_path(base_dir, dir),
                None => std::env::temp_dir(),
            },
        };

        let storage = StorageSettings {
            project_id: env(ENV_PROJECT_ID).or(file.storage.project_id),
            bucket: env(ENV_BUCKET).or(file.storage.bucket),
            credentials_base64: env(ENV_SERVICE_ACCOUNT_KEY).or(file.storage.credentials_base64),
            endpoint: env(ENV_STORAGE_ENDPOINT)
                .or(file.storage.endpoint)
                .unwrap_or_else(|| DEFAULT_STORAGE_ENDPOINT.to_string()),
        };

        let unsubscribe_group = match env(ENV_UNSUBSCRIBE_GROUP) {
            Some(raw) => raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                key: ENV_UNSUBSCRIBE_GROUP,
                reason: e.to_string(),
            })?,
            None => file
                .mail
                .unsubscribe_group
                .unwrap_or(DEFAULT_UNSUBSCRIBE_GROUP),
        };

        let templates = TemplateSet {
            success: env(ENV_TEMPLATE_SUCCESS).or(file.mail.templates.success),
            failed: env(ENV_TEMPLATE_FAILED).or(file.mail.templates.failed),
            empty_file: env(ENV_TEMPLATE_EMPTY_FILE).or(file.mail.templates.empty_file),
        };

        let mail = MailSettings {
            api_key: env(ENV_MAIL_API_KEY).or(file.mail.api_key),
            sender: env(ENV_MAIL_FROM)
                .or(file.mail.sender)
                .unwrap_or_else(|| DEFAULT_SENDER.to_string()),
            unsubscribe_group,
            endpoint: env(ENV_MAIL_ENDPOINT)
                .or(file.mail.endpoint)
                .unwrap_or_else(|| DEFAULT_MAIL_ENDPOINT.to_string()),
            templates,
        };

        Ok(Self {
            storage,
            mail,
            scratch_dir,
            home,
            config_file,
        })
    }

    /// Directory holding the ledger table
    pub fn ledger_dir(&self) -> PathBuf {
        self.home.join("ledger")
    }
}

impl fmt::Display for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config_file = self
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none)".to_string());

        writeln!(f, "config file:        {}", config_file)?;
        writeln!(f, "home:               {}", self.home.display())?;
        writeln!(f, "ledger:             {}", self.ledger_dir().display())?;
        writeln!(f, "scratch dir:        {}", self.scratch_dir.display())?;
        writeln!(f, "storage project:    {}", shown(&self.storage.project_id))?;
        writeln!(f, "storage bucket:     {}", shown(&self.storage.bucket))?;
        writeln!(f, "storage credential: {}", redacted(&self.storage.credentials_base64))?;
        writeln!(f, "storage endpoint:   {}", self.storage.endpoint)?;
        writeln!(f, "mail api key:       {}", redacted(&self.mail.api_key))?;
        writeln!(f, "mail sender:        {}", self.mail.sender)?;
        writeln!(f, "mail endpoint:      {}", self.mail.endpoint)?;
        writeln!(f, "unsubscribe group:  {}", self.mail.unsubscribe_group)?;
        writeln!(f, "template success:   {}", shown(&self.mail.templates.success))?;
        writeln!(f, "template failed:    {}", shown(&self.mail.templates.failed))?;
        write!(f, "template empty:     {}", shown(&self.mail.templates.empty_file))
    }
}

fn required<'a>(value: &'a Option<String>, key: &'static str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { key })
}

fn shown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("(unset)")
}

fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "(set)",
        None => "(unset)",
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve a path that may be relative to a base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}
