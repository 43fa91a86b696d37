//! Content-addressed backups of valid trees.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use directories::ProjectDirs;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{BackupConfig, FormatError};

const EXTENSION: &str = "tree";

/// Writes `{name}_{digest}.tree` files into one directory and keeps at most `max_backups` of
/// them per tree name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backups {
    dir: PathBuf,
    max_backups: usize,
}

impl Backups {
    pub fn new(dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            dir: dir.into(),
            max_backups,
        }
    }

    /// `None` when backups are disabled or no directory can be determined.
    pub fn from_config(config: &BackupConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let dir = config.dir.clone().or_else(Self::default_dir)?;
        Some(Self::new(dir, config.max_backups))
    }

    /// `<platform data dir>/backups`.
    pub fn default_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "bte").map(|dirs| dirs.data_dir().join("backups"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First 12 hex characters of the SHA-256 of `text`.
    pub fn digest(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let mut digest = hex::encode(hasher.finalize());
        digest.truncate(12);
        digest
    }

    /// Store `text` for tree `name`. Identical content maps to the same file and is written once;
    /// writing it again only marks it as the newest backup.
    pub fn write(&self, name: &str, text: &str) -> Result<PathBuf, FormatError> {
        let path = self
            .dir
            .join(format!("{name}_{}.{EXTENSION}", Self::digest(text)));
        if path.exists() {
            File::options()
                .write(true)
                .open(&path)
                .and_then(|file| file.set_modified(SystemTime::now()))
                .map_err(|e| FormatError::io(&path, e))?;
            debug!(path = %path.display(), "touched backup");
        } else {
            fs::create_dir_all(&self.dir).map_err(|e| FormatError::io(&self.dir, e))?;
            fs::write(&path, text).map_err(|e| FormatError::io(&path, e))?;
            debug!(path = %path.display(), "wrote backup");
        }
        self.prune(name)?;
        Ok(path)
    }

    /// Backups of tree `name`, oldest first.
    pub fn list(&self, name: &str) -> Result<Vec<PathBuf>, FormatError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(FormatError::io(&self.dir, e)),
        };
        let prefix = format!("{name}_");
        let mut found = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FormatError::io(&self.dir, e))?;
            let path = entry.path();
            let matches = path.extension().is_some_and(|ext| ext == EXTENSION)
                && path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.strip_prefix(&prefix))
                    .is_some_and(|digest| digest.len() == 12);
            if matches {
                let modified = entry.metadata().and_then(|m| m.modified()).ok();
                found.push((modified, path));
            }
        }
        found.sort();
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    fn prune(&self, name: &str) -> Result<(), FormatError> {
        if self.max_backups == 0 {
            return Ok(());
        }
        let existing = self.list(name)?;
        let excess = existing.len().saturating_sub(self.max_backups);
        for path in &existing[..excess] {
            fs::remove_file(path).map_err(|e| FormatError::io(path, e))?;
            debug!(path = %path.display(), "pruned backup");
        }
        Ok(())
    }
}
