use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GfmError, Result};

/// Directory under the user config dir holding the token and config file
pub const APP_DIR: &str = "gmail_filter";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub files: FileConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// Token file; `<config dir>/gmail_filter/auth` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    #[serde(default = "default_input_xml")]
    pub input_xml: PathBuf,
    #[serde(default = "default_input_yaml")]
    pub input_yaml: PathBuf,
    #[serde(default = "default_output_xml")]
    pub output_xml: PathBuf,
    #[serde(default = "default_output_yaml")]
    pub output_yaml: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            input_xml: default_input_xml(),
            input_yaml: default_input_yaml(),
            output_xml: default_output_xml(),
            output_yaml: default_output_yaml(),
        }
    }
}

fn default_input_xml() -> PathBuf {
    PathBuf::from("mailFilters.xml")
}

fn default_input_yaml() -> PathBuf {
    PathBuf::from("mailFilters.yaml")
}

fn default_output_xml() -> PathBuf {
    PathBuf::from("filters.xml")
}

fn default_output_yaml() -> PathBuf {
    PathBuf::from("mailFilters.yaml")
}

/// `<config dir>/gmail_filter`, or `.gmail_filter` when the platform has none
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{}", APP_DIR)))
}

pub fn default_config_path() -> PathBuf {
    app_dir().join("config.toml")
}

pub fn default_auth_file() -> PathBuf {
    app_dir().join("auth")
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self> {
        // If file doesn't exist, return default config with warning
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GfmError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GfmError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GfmError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GfmError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GfmError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let paths = [
            ("files.input_xml", &self.files.input_xml),
            ("files.input_yaml", &self.files.input_yaml),
            ("files.output_xml", &self.files.output_xml),
            ("files.output_yaml", &self.files.output_yaml),
        ];
        for (name, path) in paths {
            if path.as_os_str().is_empty() {
                return Err(GfmError::ConfigError(format!("{} cannot be empty", name)));
            }
        }

        if let Some(auth_file) = &self.auth.auth_file {
            if auth_file.as_os_str().is_empty() {
                return Err(GfmError::ConfigError(
                    "auth.auth_file cannot be empty".to_string(),
                ));
            }
        }

        let has_id = self.auth.client_id.as_deref().is_some_and(|s| !s.is_empty());
        let has_secret = self
            .auth
            .client_secret
            .as_deref()
            .is_some_and(|s| !s.is_empty());
        if has_id != has_secret {
            return Err(GfmError::ConfigError(
                "auth.client_id and auth.client_secret must be set together".to_string(),
            ));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        let config = Self::default();
        config.save(path).await
    }
}
