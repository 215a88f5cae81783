//! Configuration management

mod cli;

pub use cli::{Cli, Command, DiffArgs, PairArgs, RestoreArgs, SyncArgs};

use crate::diff::DiffOptions;
use crate::executor::RetryPolicy;
use crate::hash::HashAlgorithm;
use crate::plan::PlanOptions;
use crate::restore::RestoreMode;
use crate::scanner::Exclusions;
use crate::types::{DeleteMethod, DeletionPolicy, MirrorError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One `[[sync_pairs]]` table of the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Relative-path prefixes or globs, applied to both trees
    #[serde(default)]
    pub exclusions: Vec<String>,
}

/// Global configuration for hashmirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub sync_pairs: Vec<PairConfig>,

    /// How deletions (and restores) are confirmed
    pub deletion_policy: DeletionPolicy,

    /// Trash or permanent delete
    pub delete_method: DeleteMethod,

    /// Concurrent file operations
    pub worker_count: usize,

    /// Attempts per file operation, including the first
    pub retry_attempts: u32,

    pub retry_base_delay_ms: u64,

    /// Hash every equal-size pair; when false, equal size and mtime means unchanged
    pub hash_always: bool,

    pub hash_algorithm: HashAlgorithm,

    /// Remove destination-only directories left empty by deletes
    pub prune_empty_dirs: bool,

    pub restore_mode: RestoreMode,

    /// Keep overwritten source files in the source's trash during restore
    pub backup_before_restore: bool,

    /// Refuse a pair up front when the receiving side lacks space for the copy set
    pub check_free_space: bool,

    /// Dry run (show plan, don't execute)
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_pairs: Vec::new(),
            deletion_policy: DeletionPolicy::AlwaysConfirm,
            delete_method: DeleteMethod::Trash,
            worker_count: num_cpus::get(),
            retry_attempts: 3,
            retry_base_delay_ms: 500,
            hash_always: true,
            hash_algorithm: HashAlgorithm::Sha256,
            prune_empty_dirs: false,
            restore_mode: RestoreMode::Outdated,
            backup_before_restore: true,
            check_free_space: true,
            dry_run: false,
        }
    }
}

impl Config {
    /// Load a TOML config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, MirrorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MirrorError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| MirrorError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, MirrorError> {
        toml::from_str(content).map_err(|e| MirrorError::Config(e.to_string()))
    }

    /// Validate configuration
    ///
    /// Pair paths are checked later, per pair, so one bad pair does not stop the others.
    pub fn validate(&self) -> Result<(), MirrorError> {
        if self.worker_count == 0 {
            return Err(MirrorError::Config(
                "worker_count must be greater than 0".to_string(),
            ));
        }
        if self.retry_attempts == 0 {
            return Err(MirrorError::Config(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.sync_pairs.is_empty() {
            return Err(MirrorError::Config(
                "No sync pairs configured. Pass SOURCE and DESTINATION or use --config"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }

    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions {
            hash_always: self.hash_always,
            algorithm: self.hash_algorithm,
        }
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            prune_empty_dirs: self.prune_empty_dirs,
        }
    }
}

/// A validated, canonical source/destination pair
#[derive(Debug, Clone)]
pub struct SyncPair {
    pub source_root: PathBuf,
    pub dest_root: PathBuf,
    pub exclusions: Exclusions,
}

impl SyncPair {
    /// Canonicalize and check a configured pair for mirroring
    ///
    /// The source must be an existing directory. The destination may not exist
    /// yet. The roots must differ and neither may contain the other.
    pub fn new(config: &PairConfig) -> Result<Self, MirrorError> {
        let source_root = existing_dir(&config.source, "Source")?;
        let dest_root = resolve_missing(&config.destination, "Destination")?;
        Self::checked(source_root, dest_root, config)
    }

    /// Canonicalize and check a configured pair for restoring
    ///
    /// Here the destination is the backup and must exist, while the source
    /// may be gone entirely and is resolved like a fresh destination.
    pub fn for_restore(config: &PairConfig) -> Result<Self, MirrorError> {
        let dest_root = existing_dir(&config.destination, "Backup")?;
        let source_root = resolve_missing(&config.source, "Source")?;
        Self::checked(source_root, dest_root, config)
    }

    fn checked(
        source_root: PathBuf,
        dest_root: PathBuf,
        config: &PairConfig,
    ) -> Result<Self, MirrorError> {
        if source_root.exists() && !source_root.is_dir() {
            return Err(MirrorError::Config(format!(
                "Source path {} is not a directory",
                source_root.display()
            )));
        }
        if dest_root.exists() && !dest_root.is_dir() {
            return Err(MirrorError::Config(format!(
                "Destination path {} is not a directory",
                dest_root.display()
            )));
        }

        if source_root == dest_root {
            return Err(MirrorError::Config(
                "Source and destination cannot be the same".to_string(),
            ));
        }
        if dest_root.starts_with(&source_root) || source_root.starts_with(&dest_root) {
            return Err(MirrorError::Config(format!(
                "Source {} and destination {} must not contain each other",
                source_root.display(),
                dest_root.display()
            )));
        }

        Ok(Self {
            source_root,
            dest_root,
            exclusions: Exclusions::new(&config.exclusions)?,
        })
    }
}

fn existing_dir(path: &Path, label: &str) -> Result<PathBuf, MirrorError> {
    let root = dunce::canonicalize(path).map_err(|e| {
        MirrorError::Config(format!(
            "{} path {} is not accessible: {}",
            label,
            path.display(),
            e
        ))
    })?;
    if !root.is_dir() {
        return Err(MirrorError::Config(format!(
            "{} path {} is not a directory",
            label,
            root.display()
        )));
    }
    Ok(root)
}

/// Canonicalize the deepest existing ancestor and re-append the rest
fn resolve_missing(path: &Path, label: &str) -> Result<PathBuf, MirrorError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| MirrorError::Config(format!("Cannot resolve current directory: {}", e)))?
            .join(path)
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = dunce::canonicalize(existing).map_err(|e| {
        MirrorError::Config(format!(
            "{} path {} is not accessible: {}",
            label,
            path.display(),
            e
        ))
    })?;
    for name in missing.into_iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}
