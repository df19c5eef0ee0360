use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

use super::model::ConfigurationData;

/// Supported configuration document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Picks the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

/// Configuration loader responsible for reading injection configuration from files
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader resolving paths as given
    pub fn new() -> Self {
        Self { base_path: None }
    }

    /// Create a config loader with custom base path (for testing)
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    /// Load configuration data from a file, choosing the parser by extension
    pub fn load(&self, source: impl AsRef<Path>) -> Result<ConfigurationData, ConfigError> {
        let path = self.resolve_path(source.as_ref());
        let origin = path.display().to_string();

        let format = ConfigFormat::from_path(&path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(origin.clone()))?;

        let content =
            fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(origin.clone(), e))?;

        let config = Self::parse(&content, format, &origin)?;
        tracing::debug!(
            "loaded {} factories, {} injectables, {} interfaces from {}",
            config.factories.len(),
            config.injectables.len(),
            config.interfaces.len(),
            origin
        );
        Ok(config)
    }

    /// Parse configuration text of a known format. `origin` only names the source in errors.
    pub fn parse(
        content: &str,
        format: ConfigFormat,
        origin: &str,
    ) -> Result<ConfigurationData, ConfigError> {
        match format {
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::TomlParse(origin.to_string(), e))
            }
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| ConfigError::JsonParse(origin.to_string(), e)),
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| ConfigError::YamlParse(origin.to_string(), e)),
        }
    }

    fn resolve_path(&self, source: &Path) -> PathBuf {
        match &self.base_path {
            Some(base) if source.is_relative() => base.join(source),
            _ => source.to_path_buf(),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
