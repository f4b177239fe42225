use crate::chat::RequestMode;
use crate::core::error::DocChatError;
use crate::service::ALL_CATEGORIES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_stream_idle_timeout() -> u64 {
    120
}

fn default_mode() -> RequestMode {
    RequestMode::Sync
}

fn default_category() -> String {
    ALL_CATEGORIES.to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Longest wait for the next event of a streamed reply
    #[serde(default = "default_stream_idle_timeout")]
    pub stream_idle_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            stream_idle_timeout_secs: default_stream_idle_timeout(),
        }
    }
}

/// Starting composer state of every new chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_mode")]
    pub mode: RequestMode,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_true")]
    pub use_docs: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            category: default_category(),
            use_docs: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".docchat")
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.yaml")
    }

    pub fn history_path() -> PathBuf {
        Self::config_dir().join("input_history.txt")
    }

    /// Loads `~/.docchat/config.yaml`, writing the defaults there on first run.
    pub fn load() -> Result<Config, DocChatError> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Config, DocChatError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            if contents.trim().is_empty() {
                return Ok(Config::default());
            }
            let config = serde_yml::from_str::<Config>(&contents)
                .map_err(|e| DocChatError::Config(format!("Parse {}: {}", path.display(), e)))?;
            config.validate()?;
            return Ok(config);
        }

        let config = Config::default();
        if let Err(e) = config.save_to(path) {
            tracing::warn!("could not write default config to {}: {}", path.display(), e);
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), DocChatError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let yaml_content = serde_yml::to_string(self)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DocChatError> {
        let url = self.service.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DocChatError::Config(format!(
                "service.base_url must be an http(s) URL, got `{}`",
                url
            )));
        }
        if self.service.stream_idle_timeout_secs == 0 {
            return Err(DocChatError::Config(
                "service.stream_idle_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.chat.category.trim().is_empty() {
            return Err(DocChatError::Config("chat.category must not be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "service:\n  base_url: http://10.0.0.5:8000\nchat:\n  mode: stream\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.service.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.service.request_timeout_secs, 60);
        assert_eq!(config.service.stream_idle_timeout_secs, 120);
        assert_eq!(config.chat.mode, RequestMode::Stream);
        assert_eq!(config.chat.category, "All");
        assert!(config.chat.use_docs);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        fs::write(&path, "service:\n  base_url: localhost:8000\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(DocChatError::Config(_))));

        fs::write(&path, "chat:\n  mode: batch\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(DocChatError::Config(_))));

        fs::write(&path, "service:\n  stream_idle_timeout_secs: 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(DocChatError::Config(_))));
    }
}
