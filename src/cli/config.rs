//! Configuration management for jobmatch
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.jobmatch/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::errors::{MatchError, Result};
use crate::streaming::client::{ClientConfig, DEFAULT_ENDPOINT_TEMPLATE, DEFAULT_MODEL, MODEL_PLACEHOLDER};

/// Complete configuration for jobmatch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Generation API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Empty means "take it from --api-key / GEMINI_API_KEY"
    pub key: String,
    pub model: String,
    pub endpoint_template: String,
}

/// Saved user profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Resume used when --resume is not given
    pub resume_path: Option<String>,
}

/// File system paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_dir: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: "~/.jobmatch".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| MatchError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| MatchError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".jobmatch").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.api.model.trim().is_empty() {
            return Err(MatchError::Config("api.model must not be empty".to_string()));
        }

        if !self.api.endpoint_template.contains(MODEL_PLACEHOLDER) {
            return Err(MatchError::Config(format!(
                "api.endpoint_template must contain {}",
                MODEL_PLACEHOLDER
            )));
        }

        if !self.api.endpoint_template.starts_with("http://")
            && !self.api.endpoint_template.starts_with("https://")
        {
            return Err(MatchError::Config(
                "api.endpoint_template must be an http(s) URL".to_string(),
            ));
        }

        Ok(())
    }

    /// Client settings, command-line overrides taking precedence
    pub fn client_config(
        &self,
        api_key: Option<&str>,
        model: Option<&str>,
    ) -> Result<ClientConfig> {
        let key = api_key
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(self.api.key.as_str())
            .trim();

        if key.is_empty() {
            return Err(MatchError::Config(
                "API key is missing; pass --api-key, set GEMINI_API_KEY, or set [api] key".to_string(),
            ));
        }

        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(self.api.model.as_str());

        Ok(ClientConfig::new(key, model).with_endpoint_template(self.api.endpoint_template.clone()))
    }

    /// Saved resume location, if any
    pub fn resume_path(&self) -> Option<PathBuf> {
        self.profile
            .resume_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(Self::expand_path)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    /// Get state directory path
    pub fn state_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.state_dir)
    }

    /// Copy safe to print (API key masked)
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api.key.is_empty() {
            let tail: String = copy
                .api
                .key
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            copy.api.key = format!("****{}", tail);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.model, DEFAULT_MODEL);
        assert_eq!(config.api.endpoint_template, DEFAULT_ENDPOINT_TEMPLATE);
        assert!(config.api.key.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[api]\nkey = \"abc\"\n").unwrap();
        assert_eq!(config.api.key, "abc");
        assert_eq!(config.api.model, DEFAULT_MODEL);
        assert_eq!(config.paths.state_dir, "~/.jobmatch");
    }

    #[test]
    fn test_validation_template_placeholder() {
        let mut config = Config::default();
        config.api.endpoint_template = "https://example.com/generate".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_template_scheme() {
        let mut config = Config::default();
        config.api.endpoint_template = "ftp://example.com/{MODEL}".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_model() {
        let mut config = Config::default();
        config.api.model = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_config_overrides() {
        let mut config = Config::default();
        config.api.key = "from-file".to_string();

        let client = config.client_config(None, None).unwrap();
        assert_eq!(client.api_key, "from-file");
        assert_eq!(client.model_id, DEFAULT_MODEL);

        let client = config
            .client_config(Some("from-flag"), Some("gemini-1.5-flash"))
            .unwrap();
        assert_eq!(client.api_key, "from-flag");
        assert_eq!(client.model_id, "gemini-1.5-flash");
    }

    #[test]
    fn test_client_config_missing_key() {
        let config = Config::default();
        assert!(matches!(
            config.client_config(Some("  "), None),
            Err(MatchError::Config(_))
        ));
    }

    #[test]
    fn test_load_profile_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[profile]\nresume_path = \"/tmp/resume.txt\"\n").unwrap();

        let loaded = Config::load(Some(path)).unwrap();
        assert_eq!(loaded.resume_path(), Some(PathBuf::from("/tmp/resume.txt")));
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nkey=").unwrap();
        assert!(matches!(Config::load_from_file(&path), Err(MatchError::Config(_))));
    }

    #[test]
    fn test_redacted_masks_key() {
        let mut config = Config::default();
        config.api.key = "AIzaSyExample1234".to_string();
        assert_eq!(config.redacted().api.key, "****1234");
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path("~/.jobmatch");
        assert!(!expanded.to_string_lossy().contains('~'));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = "/absolute/path";
        assert_eq!(Config::expand_path(path).to_string_lossy(), path);
    }
}
