//! Coverage file discovery

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Expands one pattern into absolute file paths.
///
/// The returned order defines the file index of every match, so callers use
/// it as-is: no sorting or deduplication is applied on top. An empty result
/// is a normal outcome.
pub trait PatternMatcher: Send + Sync {
    fn expand(&self, pattern: &str) -> impl Future<Output = Result<Vec<PathBuf>>> + Send;
}

/// Glob-backed matcher; relative patterns resolve against `root`
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    root: PathBuf,
}

impl GlobMatcher {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl PatternMatcher for GlobMatcher {
    async fn expand(&self, pattern: &str) -> Result<Vec<PathBuf>> {
        let root = self.root.clone();
        let pattern = pattern.to_string();

        tokio::task::spawn_blocking(move || glob_files(&root, &pattern))
            .await
            .context("Pattern expansion task failed")?
    }
}

fn glob_files(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let full_pattern = if Path::new(pattern).is_absolute() {
        PathBuf::from(pattern)
    } else {
        root.join(pattern)
    };
    let full_pattern_str = full_pattern.to_string_lossy();

    let entries = glob::glob(&full_pattern_str)
        .with_context(|| format!("Invalid coverage file pattern «{}»", pattern))?;

    let mut files = Vec::new();
    for entry in entries {
        // Unreadable entries are skipped, like an unreadable directory would be
        if let Ok(path) = entry {
            if path.is_file() {
                files.push(path);
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_relative_pattern_resolves_against_root() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("coverage")).unwrap();
        fs::write(dir.path().join("coverage/b.lcov"), "").unwrap();
        fs::write(dir.path().join("coverage/a.lcov"), "").unwrap();
        fs::write(dir.path().join("coverage/c.xml"), "").unwrap();

        let matcher = GlobMatcher::new(dir.path());
        let files = matcher.expand("coverage/*.lcov").await.unwrap();

        assert_eq!(
            files,
            vec![
                dir.path().join("coverage/a.lcov"),
                dir.path().join("coverage/b.lcov"),
            ]
        );
        assert!(files.iter().all(|f| f.is_absolute()));
    }

    #[tokio::test]
    async fn test_directories_are_not_matched() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("reports.lcov")).unwrap();
        fs::write(dir.path().join("unit.lcov"), "").unwrap();

        let files = GlobMatcher::new(dir.path()).expand("*.lcov").await.unwrap();
        assert_eq!(files, vec![dir.path().join("unit.lcov")]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let dir = tempdir().unwrap();
        let files = GlobMatcher::new(dir.path()).expand("**/*.junit").await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_an_error() {
        let dir = tempdir().unwrap();
        let err = GlobMatcher::new(dir.path()).expand("[").await.unwrap_err();
        assert!(err.to_string().contains("«[»"));
    }
}
