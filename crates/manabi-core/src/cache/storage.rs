//! Cache storage: named generations of request-keyed assets.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::StorageError;

/// Index file kept in every on-disk generation directory.
const INDEX_FILE: &str = "index.json";

/// An asset as held in the cache, keyed by its absolute request URL.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAsset {
    pub key: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub cached_at: DateTime<Utc>,
}

impl CachedAsset {
    pub fn new(key: String, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            key,
            content_type,
            body,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Key-value asset store with named generations.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Names of all stored generations.
    async fn generations(&self) -> Result<Vec<String>, StorageError>;

    /// Add assets to a generation, creating it if needed. Either every asset
    /// is stored or the generation is left as it was.
    async fn put_all(&self, generation: &str, assets: Vec<CachedAsset>) -> Result<(), StorageError>;

    async fn lookup(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>, StorageError>;

    /// Delete a generation. Returns false if it did not exist.
    async fn delete(&self, generation: &str) -> Result<bool, StorageError>;
}

// ============================================================================
// In-memory storage
// ============================================================================

/// Generations held in memory. Used in tests and when no cache directory
/// is available.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    generations: RwLock<BTreeMap<String, HashMap<String, CachedAsset>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn generations(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn put_all(&self, generation: &str, assets: Vec<CachedAsset>) -> Result<(), StorageError> {
        let mut generations = self.generations.write().await;
        let entries = generations.entry(generation.to_string()).or_default();
        for asset in assets {
            entries.insert(asset.key.clone(), asset);
        }
        Ok(())
    }

    async fn lookup(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>, StorageError> {
        Ok(self
            .generations
            .read()
            .await
            .get(generation)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    async fn delete(&self, generation: &str) -> Result<bool, StorageError> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }
}

// ============================================================================
// On-disk storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    file: String,
    content_type: Option<String>,
    cached_at: DateTime<Utc>,
}

type Index = BTreeMap<String, IndexEntry>;

/// Where the body of a merged entry comes from while a generation is rebuilt.
enum Body {
    Stored(PathBuf),
    Fresh(Vec<u8>),
}

/// One directory per generation under `root`, each holding the asset bodies
/// and an `index.json` that maps request keys to body files.
///
/// Writes rebuild the whole generation in a hidden staging directory and
/// swap it in by rename. A directory without an index is a leftover from an
/// interrupted write and is not a generation.
pub struct DiskCacheStorage {
    root: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl DiskCacheStorage {
    pub fn new(root: PathBuf) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn generation_dir(&self, generation: &str) -> Result<PathBuf, StorageError> {
        let valid = !generation.is_empty()
            && !generation.starts_with('.')
            && !generation.contains(['/', '\\']);
        if !valid {
            return Err(StorageError::InvalidGeneration(generation.to_string()));
        }
        Ok(self.root.join(generation))
    }

    fn staging_dir(&self, generation: &str) -> PathBuf {
        self.root.join(format!(".{}.staging", generation))
    }

    fn retired_dir(&self, generation: &str) -> PathBuf {
        self.root.join(format!(".{}.old", generation))
    }

    async fn read_index(dir: &Path) -> Result<Option<Index>, StorageError> {
        let path = dir.join(INDEX_FILE);
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(Some(serde_json::from_slice(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_dir_if_present(dir: &Path) -> Result<(), StorageError> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the merged generation into `staging`. Body files are named by
    /// their position in the index, so no two keys share a file.
    async fn build_staging(
        staging: &Path,
        current: Option<(&Path, Index)>,
        assets: Vec<CachedAsset>,
    ) -> Result<(), StorageError> {
        Self::remove_dir_if_present(staging).await?;
        tokio::fs::create_dir_all(staging).await?;

        let mut merged: BTreeMap<String, (Body, Option<String>, DateTime<Utc>)> = BTreeMap::new();
        if let Some((dir, index)) = current {
            for (key, entry) in index {
                let body = Body::Stored(dir.join(&entry.file));
                merged.insert(key, (body, entry.content_type, entry.cached_at));
            }
        }
        for asset in assets {
            merged.insert(
                asset.key,
                (Body::Fresh(asset.body), asset.content_type, asset.cached_at),
            );
        }

        let mut index = Index::new();
        for (position, (key, (body, content_type, cached_at))) in merged.into_iter().enumerate() {
            let file = format!("asset-{:05}.bin", position);
            let target = staging.join(&file);
            match body {
                Body::Stored(path) => {
                    tokio::fs::copy(&path, &target).await?;
                }
                Body::Fresh(bytes) => tokio::fs::write(&target, bytes).await?,
            }
            index.insert(
                key,
                IndexEntry {
                    file,
                    content_type,
                    cached_at,
                },
            );
        }

        let contents = serde_json::to_vec_pretty(&index)?;
        tokio::fs::write(staging.join(INDEX_FILE), contents).await?;
        Ok(())
    }

    /// Replace the generation directory with `staging`. The previous
    /// directory is moved aside first and removed once the new one is in place.
    async fn swap_in(&self, generation: &str, staging: &Path, dir: &Path) -> Result<(), StorageError> {
        let retired = self.retired_dir(generation);
        let had_previous = tokio::fs::try_exists(dir).await?;
        if had_previous {
            Self::remove_dir_if_present(&retired).await?;
            tokio::fs::rename(dir, &retired).await?;
        }

        if let Err(e) = tokio::fs::rename(staging, dir).await {
            if had_previous {
                let _ = tokio::fs::rename(&retired, dir).await;
            }
            return Err(e.into());
        }

        if had_previous {
            if let Err(e) = Self::remove_dir_if_present(&retired).await {
                warn!(generation, error = %e, "Failed to remove replaced generation");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn generations(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type().await?.is_dir() {
                continue;
            }
            if tokio::fs::try_exists(entry.path().join(INDEX_FILE)).await? {
                names.push(name);
            } else {
                debug!(directory = %name, "Skipping cache directory without index");
            }
        }
        names.sort();
        Ok(names)
    }

    async fn put_all(&self, generation: &str, assets: Vec<CachedAsset>) -> Result<(), StorageError> {
        let dir = self.generation_dir(generation)?;
        let staging = self.staging_dir(generation);
        let _guard = self.write_lock.lock().await;

        let current = Self::read_index(&dir).await?;
        let count = assets.len();

        let result = match Self::build_staging(&staging, current.map(|index| (dir.as_path(), index)), assets).await {
            Ok(()) => self.swap_in(generation, &staging, &dir).await,
            Err(e) => Err(e),
        };
        match &result {
            Ok(()) => debug!(generation, count, "Stored cache generation"),
            Err(e) => {
                warn!(generation, error = %e, "Failed to store cache generation, previous contents kept");
                let _ = tokio::fs::remove_dir_all(&staging).await;
            }
        }
        result
    }

    async fn lookup(&self, generation: &str, key: &str) -> Result<Option<CachedAsset>, StorageError> {
        let dir = self.generation_dir(generation)?;
        let Some(index) = Self::read_index(&dir).await? else {
            return Ok(None);
        };
        let Some(entry) = index.get(key) else {
            return Ok(None);
        };

        let body = tokio::fs::read(dir.join(&entry.file)).await?;
        Ok(Some(CachedAsset {
            key: key.to_string(),
            content_type: entry.content_type.clone(),
            body,
            cached_at: entry.cached_at,
        }))
    }

    async fn delete(&self, generation: &str) -> Result<bool, StorageError> {
        let dir = self.generation_dir(generation)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
