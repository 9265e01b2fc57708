// src/config.rs

//! Runtime settings, loaded once at start-up from a TOML file.
//!
//! Every section has defaults, so a missing file or a partial file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::logging::project_directory;

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "AUDIT_SANDBOX_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Could not parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub user_agent: String,
    pub max_redirects: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: format!("AuditSandbox/{}", env!("CARGO_PKG_VERSION")),
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub max_links: usize,
    pub concurrency: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self { max_links: 100, concurrency: 8 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservatorySettings {
    pub base_url: String,
    pub poll_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for ObservatorySettings {
    fn default() -> Self {
        Self {
            base_url: "https://observatory.mozilla.org/api/v1".to_string(),
            poll_attempts: 10,
            poll_interval_ms: 3000,
        }
    }
}

impl ObservatorySettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// External programs invoked by the local and network-exposure checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub nmap: String,
    pub grep: String,
    pub cargo: String,
    pub npm: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            nmap: "nmap".to_string(),
            grep: "grep".to_string(),
            cargo: "cargo".to_string(),
            npm: "npm".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    None,
    Claude,
    Ollama,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::None,
            model: None,
            base_url: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory the workspace checks (secrets, backup, dependency) inspect.
    pub workspace_dir: PathBuf,
    pub http: HttpSettings,
    pub links: LinkSettings,
    pub observatory: ObservatorySettings,
    pub tools: ToolSettings,
    pub llm: LlmSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            workspace_dir: PathBuf::from("."),
            http: HttpSettings::default(),
            links: LinkSettings::default(),
            observatory: ObservatorySettings::default(),
            tools: ToolSettings::default(),
            llm: LlmSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from `$AUDIT_SANDBOX_CONFIG`, then from `config.toml`
    /// in the project config directory, falling back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load_from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from_file(path),
            _ => {
                info!("No config file found, using default settings.");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let settings = Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!(path = %path.display(), "Loaded settings.");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        let settings: Settings = toml::from_str(content)?;
        if settings.links.concurrency == 0 {
            warn!("links.concurrency is 0, broken-link checks will use 1.");
        }
        Ok(settings)
    }
}

fn default_config_path() -> Option<PathBuf> {
    project_directory().map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings.links.max_links, 100);
        assert_eq!(settings.observatory.poll_attempts, 10);
        assert_eq!(settings.llm.provider, LlmProviderKind::None);
        assert_eq!(settings.tools.nmap, "nmap");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let settings = Settings::from_toml(
            r#"
            workspace_dir = "/srv/site"

            [links]
            max_links = 25

            [llm]
            provider = "ollama"
            model = "llama3.1"
            "#,
        )
        .unwrap();

        assert_eq!(settings.workspace_dir, PathBuf::from("/srv/site"));
        assert_eq!(settings.links.max_links, 25);
        assert_eq!(settings.links.concurrency, 8);
        assert_eq!(settings.llm.provider, LlmProviderKind::Ollama);
        assert_eq!(settings.llm.model.as_deref(), Some("llama3.1"));
        assert_eq!(settings.llm.api_key_env, "ANTHROPIC_API_KEY");
    }

    #[test]
    fn unknown_provider_is_a_parse_error() {
        assert!(Settings::from_toml("[llm]\nprovider = \"gpt\"").is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Settings::load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
