use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ReportError, Result};

/// Artifact names of the memoized producers.
pub const CI_RESULTS: &str = "ci_results";
pub const CHECKS: &str = "checks";
pub const SKIPPED_PACKAGES: &str = "skipped_packages";

pub const ARTIFACTS: [&str; 3] = [CI_RESULTS, CHECKS, SKIPPED_PACKAGES];

/// Decides whether an existing artifact may be reused.
pub trait Freshness {
    fn is_fresh(&self, path: &Path) -> bool;
}

/// Any artifact on disk is fresh. Stale data is only dropped by deleting it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exists;

impl Freshness for Exists {
    fn is_fresh(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// File-backed memoization of expensive producers.
///
/// Each producer is stored as `{dir}/{name}.json` holding its raw JSON value.
/// There is no locking: two runs sharing a directory race on the files.
pub struct ArtifactCache<F = Exists> {
    dir: PathBuf,
    freshness: F,
    refresh: bool,
}

impl ArtifactCache<Exists> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_freshness(dir, Exists)
    }
}

impl<F: Freshness> ArtifactCache<F> {
    pub fn with_freshness(dir: impl Into<PathBuf>, freshness: F) -> Self {
        Self {
            dir: dir.into(),
            freshness,
            refresh: false,
        }
    }

    /// Recompute every producer and overwrite existing artifacts.
    #[must_use]
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Returns the stored value of `name`, or runs `producer` and stores its result.
    ///
    /// # Errors
    ///
    /// Fails if the producer fails, if the artifact exists but cannot be
    /// decoded, or if the new artifact cannot be written.
    pub async fn load_or_compute<T, P, Fut>(&self, name: &str, producer: P) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let path = self.artifact_path(name);

        if !self.refresh && self.freshness.is_fresh(&path) {
            debug!("Found cached {}, using that", path.display());
            let content = fs::read_to_string(&path)?;
            return serde_json::from_str(&content)
                .map_err(|source| ReportError::Cache { path, source });
        }

        info!("No usable {}, computing it", path.display());
        let value = producer().await?;

        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serde_json::to_string(&value)?)?;
        debug!("Saved {}", path.display());

        Ok(value)
    }

    /// Removes the named artifacts, returning how many existed.
    pub fn clear(&self, names: &[&str]) -> Result<usize> {
        let mut removed = 0;
        for name in names {
            let path = self.artifact_path(name);
            if path.exists() {
                fs::remove_file(&path)?;
                info!("Cache cleared: {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    async fn counted(calls: &AtomicUsize) -> Result<BTreeMap<String, u32>> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(BTreeMap::from([("pkgA".to_string(), 1)]))
    }

    #[tokio::test]
    async fn test_producer_runs_once() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp_dir.path());
        let calls = AtomicUsize::new(0);

        let first = cache.load_or_compute("x", || counted(&calls)).await.unwrap();
        let second = cache.load_or_compute("x", || counted(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first, second);
        assert!(temp_dir.path().join("x.json").exists());
    }

    #[tokio::test]
    async fn test_deleted_artifact_is_recomputed() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp_dir.path());
        let calls = AtomicUsize::new(0);

        cache.load_or_compute("x", || counted(&calls)).await.unwrap();
        fs::remove_file(cache.artifact_path("x")).unwrap();
        cache.load_or_compute("x", || counted(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_existing_artifact_is_returned_as_is() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("checks.json"), r#"{"pkgB": 7}"#).unwrap();
        let cache = ArtifactCache::new(temp_dir.path());
        let calls = AtomicUsize::new(0);

        let value: BTreeMap<String, u32> = cache
            .load_or_compute(CHECKS, || counted(&calls))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(value, BTreeMap::from([("pkgB".to_string(), 7)]));
    }

    #[tokio::test]
    async fn test_refresh_overwrites_artifact() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("x.json"), r#"{"stale": 0}"#).unwrap();
        let cache = ArtifactCache::new(temp_dir.path()).refresh(true);
        let calls = AtomicUsize::new(0);

        let value = cache.load_or_compute("x", || counted(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(value.contains_key("pkgA"));
        let stored = fs::read_to_string(temp_dir.path().join("x.json")).unwrap();
        assert!(stored.contains("pkgA"));
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("x.json"), "{not json").unwrap();
        let cache = ArtifactCache::new(temp_dir.path());
        let calls = AtomicUsize::new(0);

        let err = cache
            .load_or_compute("x", || counted(&calls))
            .await
            .unwrap_err();

        assert!(matches!(err, ReportError::Cache { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failing_producer_leaves_no_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp_dir.path());

        let result: Result<u32> = cache
            .load_or_compute("x", || async {
                Err(ReportError::Evaluation("nix exited with 1".into()))
            })
            .await;

        assert!(result.is_err());
        assert!(!cache.artifact_path("x").exists());
    }

    #[tokio::test]
    async fn test_custom_freshness_policy() {
        struct Never;
        impl Freshness for Never {
            fn is_fresh(&self, _path: &Path) -> bool {
                false
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let cache = ArtifactCache::with_freshness(temp_dir.path(), Never);
        let calls = AtomicUsize::new(0);

        cache.load_or_compute("x", || counted(&calls)).await.unwrap();
        cache.load_or_compute("x", || counted(&calls)).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_clear_removes_existing_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp_dir.path());
        fs::write(cache.artifact_path(CI_RESULTS), "{}").unwrap();
        fs::write(cache.artifact_path(CHECKS), "{}").unwrap();

        assert_eq!(cache.clear(&ARTIFACTS).unwrap(), 2);
        assert!(!cache.artifact_path(CI_RESULTS).exists());
        assert_eq!(cache.clear(&ARTIFACTS).unwrap(), 0);
    }
}
