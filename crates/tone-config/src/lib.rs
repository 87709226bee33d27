use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tone_core::{Credentials, CredentialsSource, Secret};

pub const TONE_DIR_NAME: &str = ".tone";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_SERVICE_URL: &str = "https://gateway.watsonplatform.net/tone-analyzer/api";
pub const DEFAULT_VERSION_DATE: &str = "2016-02-11";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ToneConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub credentials: Vec<CredentialsEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_url")]
    pub url: String,
    #[serde(default = "default_version_date")]
    pub version_date: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub legacy_quoted_text: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: default_service_url(),
            version_date: default_version_date(),
            timeout_secs: default_timeout_secs(),
            legacy_quoted_text: false,
        }
    }
}

/// One `[[credentials]]` table. Secrets are never stored in the file; only the
/// names of the environment variables that hold them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsEntry {
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl CredentialsEntry {
    pub fn resolve(&self) -> Credentials {
        Credentials {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password_env.as_deref().and_then(read_env_secret),
            api_key: self.api_key_env.as_deref().and_then(read_env_secret),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Credentials backed by the `[[credentials]]` tables of a loaded config.
///
/// Environment variables are read once, when the source is built.
#[derive(Debug, Clone, Default)]
pub struct ConfigCredentialsSource {
    entries: Vec<(String, Arc<Credentials>)>,
}

impl ConfigCredentialsSource {
    pub fn from_config(config: &ToneConfig) -> Self {
        let entries = config
            .credentials
            .iter()
            .map(|entry| (entry.service_id.clone(), Arc::new(entry.resolve())))
            .collect();
        Self { entries }
    }
}

impl CredentialsSource for ConfigCredentialsSource {
    fn find_credentials(&self, service_id: &str) -> Option<Arc<Credentials>> {
        self.entries
            .iter()
            .find(|(id, _)| id == service_id)
            .map(|(_, credentials)| Arc::clone(credentials))
    }
}

pub fn tone_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(TONE_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    tone_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(workspace_root: impl AsRef<Path>) -> Result<ToneConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(ToneConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: ToneConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<ToneConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(tone_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = ToneConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

pub fn validate_config(config: &ToneConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if !config.service.url.starts_with("http://") && !config.service.url.starts_with("https://") {
        warnings.push(ConfigWarning {
            code: "service_url_scheme",
            message: format!(
                "service.url '{}' is not an http(s) URL; requests will not be submitted",
                config.service.url
            ),
        });
    }

    if config.service.timeout_secs == 0 {
        warnings.push(ConfigWarning {
            code: "timeout_disabled",
            message: "service.timeout_secs = 0 disables the request timeout".to_owned(),
        });
    }

    for entry in &config.credentials {
        if entry.api_key_env.is_none() && (entry.username.is_none() || entry.password_env.is_none())
        {
            warnings.push(ConfigWarning {
                code: "credentials_incomplete",
                message: format!(
                    "credentials for '{}' need api_key_env or both username and password_env",
                    entry.service_id
                ),
            });
        }
    }

    warnings
}

fn default_service_url() -> String {
    DEFAULT_SERVICE_URL.to_owned()
}

fn default_version_date() -> String {
    DEFAULT_VERSION_DATE.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn read_env_secret(name: &str) -> Option<Secret> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(Secret::new)
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn normalize_required(input: String, fallback: fn() -> String) -> String {
    normalize_optional(Some(input)).unwrap_or_else(fallback)
}

fn normalize_config(mut config: ToneConfig) -> ToneConfig {
    config.service.url = normalize_required(config.service.url, default_service_url);
    config.service.version_date =
        normalize_required(config.service.version_date, default_version_date);

    config.credentials.retain_mut(|entry| {
        entry.service_id = entry.service_id.trim().to_owned();
        entry.url = normalize_optional(entry.url.take());
        entry.username = normalize_optional(entry.username.take());
        entry.password_env = normalize_optional(entry.password_env.take());
        entry.api_key_env = normalize_optional(entry.api_key_env.take());
        !entry.service_id.is_empty()
    });

    config
}
