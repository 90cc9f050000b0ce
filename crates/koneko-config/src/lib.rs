use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration:\n  {}", .problems.join("\n  "))]
    Invalid { problems: Vec<String> },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub site: SiteConfig,
    pub sources: SourceConfig,
}

/// Values a renderer needs for every page of the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub name: Option<String>,
    pub address: Option<String>,
    pub author: Option<String>,
    pub lang: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: None,
            address: None,
            author: None,
            lang: "en".to_string(),
        }
    }
}

/// Which files count as markup sources, and where output goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Filename suffixes, each with its leading dot.
    pub include_extensions: Vec<String>,
    /// Glob patterns; a matching path is skipped.
    pub exclude: Vec<String>,
    pub out_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            include_extensions: vec![".md".to_string(), ".ᗢ".to_string()],
            exclude: Vec::new(),
            out_dir: PathBuf::from("."),
        }
    }
}

impl SourceConfig {
    /// Whether `path` is a source file: its name ends in one of the included
    /// extensions and no exclude pattern matches it.
    pub fn accepts<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let included = self
            .include_extensions
            .iter()
            .any(|ext| file_name.len() > ext.len() && file_name.ends_with(ext.as_str()));
        if !included {
            return false;
        }
        // malformed patterns are reported by `Config::validate`
        !self
            .exclude
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .any(|pattern| pattern.matches_path(path))
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        // Expand shell variables and tilde in the output directory
        config.sources.out_dir =
            Self::expand_path(&config.sources.out_dir).unwrap_or(config.sources.out_dir);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/koneko");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    /// Checks every setting and reports all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.sources.include_extensions.is_empty() {
            problems.push("sources.include_extensions is empty".to_string());
        }
        for ext in &self.sources.include_extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                problems.push(format!(
                    "sources.include_extensions: `{ext}` must be a dot followed by a suffix"
                ));
            }
        }
        for pattern in &self.sources.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                problems.push(format!("sources.exclude: `{pattern}` is not a valid glob: {e}"));
            }
        }
        if self.site.lang.trim().is_empty() {
            problems.push("site.lang is empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid { problems })
        }
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
