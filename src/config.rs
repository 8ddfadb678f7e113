use crate::templates::{TemplateError, find_guideline};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Location of the project configuration, relative to the project root.
pub const CONFIG_FILE: &str = ".project/aipim.toml";

/// AI tools configured when nothing else is known.
pub const DEFAULT_AIS: [&str; 2] = ["claude-code", "gemini"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(std::io::Error),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Unsupported config file version: {0}")]
    UnsupportedVersion(u32),
    #[error("No AI tools configured")]
    NoAis,
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ConfigError {
    fn from_io(e: std::io::Error, path: &Path) -> Self {
        if e.kind() == ErrorKind::PermissionDenied {
            ConfigError::PermissionDenied(path.to_path_buf())
        } else {
            ConfigError::Io(e)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Metadata {
    version: u32,
}

/// Used to check the version before parsing the rest, so that a file written
/// by a newer release fails with a version error rather than a parse error.
#[derive(Debug, Deserialize)]
struct MetadataOnly {
    metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectSettings {
    /// AI tool identifiers; each maps to one prompt file.
    pub ais: Vec<String>,
    /// Framework guideline ids merged into every prompt file.
    #[serde(default)]
    pub guidelines: Vec<String>,
    /// Templates directory overriding the built-in templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templates_dir: Option<PathBuf>,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        ProjectSettings {
            ais: DEFAULT_AIS.iter().map(|ai| ai.to_string()).collect(),
            guidelines: Vec::new(),
            templates_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    metadata: Metadata,
    pub project: ProjectSettings,
}

impl ConfigFile {
    const SUPPORTED_VERSION: u32 = 1;

    pub fn new(project: ProjectSettings) -> Self {
        ConfigFile {
            metadata: Metadata {
                version: Self::SUPPORTED_VERSION,
            },
            project,
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let metadata_only: MetadataOnly = toml::from_str(content)?;

        if metadata_only.metadata.version != Self::SUPPORTED_VERSION {
            return Err(ConfigError::UnsupportedVersion(
                metadata_only.metadata.version,
            ));
        }

        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::from_io(e, path))?;
        Self::from_toml(&content)
    }

    /// Loads the configuration of the project at `root`, if it has one.
    pub fn load_project(root: &Path) -> Result<Option<Self>, ConfigError> {
        match Self::load(&root.join(CONFIG_FILE)) {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Saves atomically: temp file in the same directory, fsync, rename.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_toml()?;
        crate::util::fs::write_atomic(path, content.as_bytes())
            .map_err(|e| ConfigError::from_io(e, path))
    }
}

impl ProjectSettings {
    /// Rejects settings that could never render: no AI tools, or guideline
    /// ids that are not in the registry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ais.is_empty() {
            return Err(ConfigError::NoAis);
        }
        for id in &self.guidelines {
            if find_guideline(id).is_none() {
                return Err(TemplateError::UnknownGuideline(id.clone()).into());
            }
        }
        Ok(())
    }
}
