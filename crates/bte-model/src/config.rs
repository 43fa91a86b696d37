//! Editor configuration loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ConfigError, StepStrategy};

/// Editor configuration, loaded from .bte/config.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Cap on undo entries; unbounded when absent
    pub max_history: Option<usize>,

    #[serde(default)]
    pub save: SaveConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub step: StepConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_history: None,
            save: SaveConfig::default(),
            backup: BackupConfig::default(),
            step: StepConfig::default(),
        }
    }
}

/// What `save_tree` does when the target file exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Fail with `FormatError::Exists`.
    Refuse,
    /// Rename the existing file to `<file>.bak`, then write.
    #[default]
    Backup,
    Overwrite,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveConfig {
    #[serde(default)]
    pub overwrite: OverwritePolicy,
}

/// Automatic backups of valid trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Backup directory; the platform data directory when absent
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Backups kept per tree name, 0 keeps all
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
}

fn default_max_backups() -> usize {
    20
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: None,
            max_backups: default_max_backups(),
        }
    }
}

/// Live stepping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepConfig {
    /// Seconds between auto steps; every update when 0
    #[serde(default)]
    pub interval_seconds: f32,

    /// Seed of the random composites
    #[serde(default)]
    pub seed: u64,
}

impl StepConfig {
    pub fn strategy(&self) -> StepStrategy {
        if self.interval_seconds > 0.0 {
            StepStrategy::Interval {
                seconds: self.interval_seconds,
            }
        } else {
            StepStrategy::EveryUpdate
        }
    }
}

impl EditorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from project root (looks for .bte/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self, ConfigError> {
        let config_path = project_root.join(".bte/config.yaml");
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the backup directory relative to project root
    pub fn resolve_paths(&mut self, project_root: &Path) {
        if let Some(dir) = self.backup.dir.as_mut() {
            *dir = project_root.join(&*dir);
        }
    }
}
