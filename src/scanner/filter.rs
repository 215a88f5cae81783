//! Exclusion matching shared by both trees of a pair

use crate::types::MirrorError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path, PathBuf};

/// Relative-path exclusions.
///
/// Plain entries are component-wise prefixes (`build` excludes `build/out.o` but not
/// `buildx`). Entries containing glob metacharacters are compiled with globset and
/// matched against the path and each of its ancestors.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    prefixes: Vec<PathBuf>,
    globs: Option<GlobSet>,
}

impl Exclusions {
    pub fn new(patterns: &[String]) -> Result<Self, MirrorError> {
        let mut prefixes = Vec::new();
        let mut builder = GlobSetBuilder::new();
        let mut glob_count = 0usize;

        for raw in patterns {
            let pattern = raw.trim().replace('\\', "/");
            let pattern = pattern.trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }

            if is_glob(pattern) {
                let glob = Glob::new(pattern).map_err(|e| {
                    MirrorError::Config(format!("Invalid exclusion pattern '{}': {}", raw, e))
                })?;
                builder.add(glob);
                glob_count += 1;
            } else {
                let prefix = normalize(Path::new(pattern));
                if prefix.as_os_str().is_empty() {
                    return Err(MirrorError::Config(format!(
                        "Exclusion '{}' must be a path below the sync root",
                        raw
                    )));
                }
                prefixes.push(prefix);
            }
        }

        let globs = if glob_count > 0 {
            Some(builder.build().map_err(|e| {
                MirrorError::Config(format!("Failed to build exclusion patterns: {}", e))
            })?)
        } else {
            None
        };

        Ok(Self {
            prefixes,
            globs,
        })
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.globs.is_none()
    }

    /// Check a path relative to either sync root
    pub fn is_excluded(&self, relative: &Path) -> bool {
        if self.prefixes.iter().any(|prefix| relative.starts_with(prefix)) {
            return true;
        }

        match &self.globs {
            Some(globs) => relative
                .ancestors()
                .filter(|p| !p.as_os_str().is_empty())
                .any(|p| globs.is_match(p)),
            None => false,
        }
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

/// Drop `.` components and reject anything that would escape the root
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exclusions(patterns: &[&str]) -> Exclusions {
        let owned: Vec<String> = patterns.iter().map(|p| p.to_string()).collect();
        Exclusions::new(&owned).expect("valid exclusions")
    }

    #[test]
    fn test_prefix_is_component_wise() {
        let ex = exclusions(&["build"]);
        assert!(ex.is_excluded(Path::new("build")));
        assert!(ex.is_excluded(Path::new("build/out/app.o")));
        assert!(!ex.is_excluded(Path::new("buildx/app.o")));
        assert!(!ex.is_excluded(Path::new("src/build.rs")));
    }

    #[test]
    fn test_nested_prefix_and_trailing_slash() {
        let ex = exclusions(&["./assets/cache/"]);
        assert!(ex.is_excluded(Path::new("assets/cache/a.bin")));
        assert!(!ex.is_excluded(Path::new("assets/a.bin")));
    }

    #[test]
    fn test_glob_matches_path_or_ancestor() {
        let ex = exclusions(&["*.tmp", "node_*"]);
        assert!(ex.is_excluded(Path::new("a/b/c.tmp")));
        assert!(ex.is_excluded(Path::new("node_modules/pkg/index.js")));
        assert!(!ex.is_excluded(Path::new("src/main.rs")));
    }

    #[test]
    fn test_empty_patterns_are_ignored() {
        let ex = exclusions(&["", "  "]);
        assert!(ex.is_empty());
        assert!(!ex.is_excluded(Path::new("anything")));
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let result = Exclusions::new(&["[unclosed".to_string()]);
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }

    #[test]
    fn test_root_only_prefix_is_rejected() {
        let result = Exclusions::new(&["..".to_string()]);
        assert!(matches!(result, Err(MirrorError::Config(_))));
    }
}
