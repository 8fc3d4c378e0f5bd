use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use reqwest::Url;
use tracing::{debug, info, warn};

use super::{
    Asset, AssetFetcher, CacheError, CacheInstallError, CacheStorage, CachedAsset, FetchError,
};

/// Maximum concurrent asset fetches during install.
const MAX_CONCURRENT_FETCHES: usize = 4;

/// Lifecycle of one cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePhase {
    /// Created, nothing fetched yet.
    Parsed,
    Installing,
    /// Every manifest asset is stored.
    Installed,
    /// Older generations are gone; requests are served cache-first.
    Activated,
    /// Install failed. This generation will never serve requests.
    Redundant,
}

/// Ordered list of absolute asset URLs to persist at install time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheManifest {
    entries: Vec<Url>,
}

impl CacheManifest {
    /// Resolve manifest entries against the site URL. Relative paths such as
    /// `./style.css` are joined onto `base`; absolute URLs pass through.
    pub fn resolve<S: AsRef<str>>(base: &Url, entries: &[S]) -> Result<Self, CacheInstallError> {
        let entries = entries
            .iter()
            .map(|entry| {
                let entry = entry.as_ref();
                base.join(entry).map_err(|e| CacheInstallError::InvalidUrl {
                    entry: entry.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Url] {
        &self.entries
    }
}

/// Cache-first asset layer in front of the network.
///
/// `install`, `activate` and `intercept` are the three lifecycle handlers;
/// `register` runs the first two the way a page registers its worker.
pub struct OfflineCache {
    generation: String,
    manifest: CacheManifest,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn AssetFetcher>,
    phase: Mutex<CachePhase>,
}

impl OfflineCache {
    pub fn new(
        generation: impl Into<String>,
        manifest: CacheManifest,
        storage: Arc<dyn CacheStorage>,
        network: Arc<dyn AssetFetcher>,
    ) -> Self {
        Self {
            generation: generation.into(),
            manifest,
            storage,
            network,
            phase: Mutex::new(CachePhase::Parsed),
        }
    }

    pub fn phase(&self) -> CachePhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: CachePhase) {
        debug!(generation = %self.generation, ?phase, "Cache phase change");
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }

    /// Fetch every manifest asset and store them as this generation.
    ///
    /// All-or-nothing: if any asset is unreachable nothing is stored and the
    /// generation becomes redundant.
    pub async fn install(&self) -> Result<usize, CacheInstallError> {
        match self.phase() {
            CachePhase::Parsed => {}
            other => return Err(CacheInstallError::WrongPhase(other)),
        }
        self.set_phase(CachePhase::Installing);
        info!(generation = %self.generation, assets = self.manifest.entries().len(), "Installing offline cache");

        let fetched: Result<Vec<CachedAsset>, CacheInstallError> =
            stream::iter(self.manifest.entries())
                .map(|url| async move {
                    let asset = self.network.fetch(url).await.map_err(|source| {
                        CacheInstallError::Unreachable {
                            url: url.to_string(),
                            source,
                        }
                    })?;
                    Ok::<_, CacheInstallError>(CachedAsset::new(
                        url.as_str().to_string(),
                        asset.content_type,
                        asset.body,
                    ))
                })
                .buffer_unordered(MAX_CONCURRENT_FETCHES)
                .try_collect()
                .boxed()
                .await;

        let result = match fetched {
            Ok(assets) => {
                let count = assets.len();
                self.storage
                    .put_all(&self.generation, assets)
                    .await
                    .map(|()| count)
                    .map_err(CacheInstallError::from)
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(count) => {
                info!(generation = %self.generation, count, "Offline cache installed");
                self.set_phase(CachePhase::Installed);
            }
            Err(e) => {
                warn!(generation = %self.generation, error = %e, "Offline cache install failed");
                self.set_phase(CachePhase::Redundant);
            }
        }
        result
    }

    /// Delete every stored generation other than this one.
    ///
    /// Returns the names that were deleted.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        match self.phase() {
            CachePhase::Installed | CachePhase::Activated => {}
            other => return Err(CacheError::WrongPhase(other)),
        }

        let mut deleted = Vec::new();
        for name in self.storage.generations().await? {
            if name != self.generation && self.storage.delete(&name).await? {
                info!(generation = %name, "Deleted stale cache generation");
                deleted.push(name);
            }
        }

        self.set_phase(CachePhase::Activated);
        Ok(deleted)
    }

    /// Answer an asset request: cache first, network on a miss.
    ///
    /// Misses are not written back; the cache only changes at install time.
    /// Until activation the page is not controlled and everything goes to
    /// the network.
    pub async fn intercept(&self, url: &Url) -> Result<Asset, FetchError> {
        if self.phase() != CachePhase::Activated {
            return self.network.fetch(url).await;
        }

        match self.lookup(url).await {
            Some(cached) => {
                debug!(%url, "Served from offline cache");
                Ok(Asset {
                    url: url.clone(),
                    content_type: cached.content_type,
                    body: cached.body,
                })
            }
            None => {
                debug!(%url, "Cache miss, forwarding to network");
                self.network.fetch(url).await
            }
        }
    }

    /// Search this generation, then any other that is still stored.
    async fn lookup(&self, url: &Url) -> Option<CachedAsset> {
        let key = url.as_str();
        let mut names = vec![self.generation.clone()];
        match self.storage.generations().await {
            Ok(all) => names.extend(all.into_iter().filter(|n| *n != self.generation)),
            Err(e) => warn!(error = %e, "Failed to list cache generations"),
        }

        for name in names {
            match self.storage.lookup(&name, key).await {
                Ok(Some(cached)) => return Some(cached),
                Ok(None) => {}
                Err(e) => warn!(generation = %name, %url, error = %e, "Cache lookup failed"),
            }
        }
        None
    }

    /// Take control right away if this generation was installed by an
    /// earlier run. Returns whether the cache is now active.
    pub async fn resume(&self) -> bool {
        if self.phase() != CachePhase::Parsed {
            return self.phase() == CachePhase::Activated;
        }
        match self.storage.generations().await {
            Ok(names) if names.contains(&self.generation) => {
                info!(generation = %self.generation, "Resuming installed offline cache");
                self.set_phase(CachePhase::Activated);
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!(error = %e, "Failed to list cache generations");
                false
            }
        }
    }

    /// Install and activate. Failures are logged and otherwise ignored: the
    /// app keeps working online-only. Returns whether the cache is active.
    ///
    /// Registering an already active generation does nothing.
    pub async fn register(&self) -> bool {
        if self.phase() == CachePhase::Activated {
            debug!(generation = %self.generation, "Offline cache already active");
            return true;
        }
        if let Err(e) = self.install().await {
            warn!(error = %e, "Offline cache registration failed");
            return false;
        }
        match self.activate().await {
            Ok(deleted) => {
                debug!(?deleted, "Offline cache activated");
                true
            }
            Err(e) => {
                warn!(error = %e, "Offline cache activation failed");
                false
            }
        }
    }

    /// How long ago this generation was installed, for status display.
    pub async fn installed_age(&self) -> Option<String> {
        let first = self.manifest.entries().first()?;
        match self.storage.lookup(&self.generation, first.as_str()).await {
            Ok(cached) => cached.map(|c| c.age_display()),
            Err(e) => {
                debug!(error = %e, "Failed to load cache entry for age display");
                None
            }
        }
    }
}

#[async_trait]
impl AssetFetcher for OfflineCache {
    async fn fetch(&self, url: &Url) -> Result<Asset, FetchError> {
        self.intercept(url).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::cache::{DiskCacheStorage, HttpFetcher, MemoryCacheStorage};

    const SITE: &str = "https://quiz.example.org/walk/";

    /// Network stand-in that counts every request it receives.
    #[derive(Default)]
    struct CountingNetwork {
        assets: HashMap<String, &'static str>,
        calls: AtomicUsize,
    }

    impl CountingNetwork {
        fn serving(urls: &[&str]) -> Self {
            Self {
                assets: urls.iter().map(|u| (u.to_string(), "asset body")).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AssetFetcher for CountingNetwork {
        async fn fetch(&self, url: &Url) -> Result<Asset, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.assets.get(url.as_str()) {
                Some(body) => Ok(Asset {
                    url: url.clone(),
                    content_type: None,
                    body: body.as_bytes().to_vec(),
                }),
                None => Err(FetchError::NotFound(url.to_string())),
            }
        }
    }

    fn manifest() -> CacheManifest {
        let base = Url::parse(SITE).unwrap();
        CacheManifest::resolve(
            &base,
            &[
                "./",
                "./index.html",
                "./style.css",
                "./data/places.geojson",
                "https://unpkg.com/leaflet/dist/leaflet.js",
            ],
        )
        .unwrap()
    }

    fn full_network() -> CountingNetwork {
        CountingNetwork::serving(&[
            "https://quiz.example.org/walk/",
            "https://quiz.example.org/walk/index.html",
            "https://quiz.example.org/walk/style.css",
            "https://quiz.example.org/walk/data/places.geojson",
            "https://unpkg.com/leaflet/dist/leaflet.js",
            "https://quiz.example.org/walk/extra.png",
        ])
    }

    #[test]
    fn test_manifest_resolution() {
        let m = manifest();
        let urls: Vec<_> = m.entries().iter().map(Url::as_str).collect();
        assert_eq!(urls[0], "https://quiz.example.org/walk/");
        assert_eq!(urls[3], "https://quiz.example.org/walk/data/places.geojson");
        assert_eq!(urls[4], "https://unpkg.com/leaflet/dist/leaflet.js");
    }

    #[tokio::test]
    async fn test_install_stores_every_asset() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let cache = OfflineCache::new("manabi-v1", manifest(), storage.clone(), Arc::new(full_network()));

        assert_eq!(cache.install().await.unwrap(), 5);
        assert_eq!(cache.phase(), CachePhase::Installed);
        assert!(storage
            .lookup("manabi-v1", "https://quiz.example.org/walk/style.css")
            .await
            .unwrap()
            .is_some());
        assert_eq!(cache.installed_age().await.as_deref(), Some("just now"));
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let storage = Arc::new(MemoryCacheStorage::new());
        // leaflet.js is unreachable
        let network = CountingNetwork::serving(&[
            "https://quiz.example.org/walk/",
            "https://quiz.example.org/walk/index.html",
            "https://quiz.example.org/walk/style.css",
            "https://quiz.example.org/walk/data/places.geojson",
        ]);
        let cache = OfflineCache::new("manabi-v1", manifest(), storage.clone(), Arc::new(network));

        let err = cache.install().await.unwrap_err();
        assert!(matches!(err, CacheInstallError::Unreachable { .. }));
        assert_eq!(cache.phase(), CachePhase::Redundant);
        assert!(storage.generations().await.unwrap().is_empty());

        // A redundant generation cannot be activated
        assert!(matches!(cache.activate().await, Err(CacheError::WrongPhase(_))));
    }

    #[tokio::test]
    async fn test_activate_deletes_stale_generations() {
        let storage = Arc::new(MemoryCacheStorage::new());
        storage
            .put_all(
                "manabi-v0",
                vec![CachedAsset::new("https://quiz.example.org/walk/".into(), None, b"old".to_vec())],
            )
            .await
            .unwrap();

        let cache = OfflineCache::new("manabi-v1", manifest(), storage.clone(), Arc::new(full_network()));
        cache.install().await.unwrap();

        let mut before = storage.generations().await.unwrap();
        before.sort();
        assert_eq!(before, vec!["manabi-v0", "manabi-v1"]);

        let deleted = cache.activate().await.unwrap();
        assert_eq!(deleted, vec!["manabi-v0"]);
        assert_eq!(storage.generations().await.unwrap(), vec!["manabi-v1"]);
        assert_eq!(cache.phase(), CachePhase::Activated);
    }

    #[tokio::test]
    async fn test_intercept_cached_asset_skips_network() {
        let network = Arc::new(full_network());
        let cache = OfflineCache::new(
            "manabi-v1",
            manifest(),
            Arc::new(MemoryCacheStorage::new()),
            network.clone(),
        );
        assert!(cache.register().await);
        let after_install = network.calls();

        for url in manifest().entries() {
            let asset = cache.intercept(url).await.unwrap();
            assert_eq!(asset.body, b"asset body");
        }
        assert_eq!(network.calls(), after_install, "cached assets must not hit the network");

        // A miss goes to the network and is not written back
        let extra = Url::parse("https://quiz.example.org/walk/extra.png").unwrap();
        cache.intercept(&extra).await.unwrap();
        cache.intercept(&extra).await.unwrap();
        assert_eq!(network.calls(), after_install + 2);
    }

    #[tokio::test]
    async fn test_intercept_miss_propagates_network_failure() {
        let cache = OfflineCache::new(
            "manabi-v1",
            manifest(),
            Arc::new(MemoryCacheStorage::new()),
            Arc::new(full_network()),
        );
        assert!(cache.register().await);

        let missing = Url::parse("https://quiz.example.org/walk/missing.js").unwrap();
        assert!(matches!(
            cache.intercept(&missing).await,
            Err(FetchError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_resume_previous_install() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let first = OfflineCache::new("manabi-v1", manifest(), storage.clone(), Arc::new(full_network()));
        assert!(first.register().await);

        // Next run with the network down
        let offline = Arc::new(CountingNetwork::serving(&[]));
        let second = OfflineCache::new("manabi-v1", manifest(), storage.clone(), offline.clone());
        assert!(second.resume().await);
        assert!(second.register().await);

        let places = Url::parse("https://quiz.example.org/walk/data/places.geojson").unwrap();
        assert!(second.intercept(&places).await.is_ok());
        assert_eq!(offline.calls(), 0);

        // A new generation tag does not resume
        let third = OfflineCache::new("manabi-v2", manifest(), storage, offline);
        assert!(!third.resume().await);
    }

    #[tokio::test]
    async fn test_resume_ignores_interrupted_disk_write() {
        let root = std::env::temp_dir().join(format!("manabi-resume-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        let storage = Arc::new(DiskCacheStorage::new(root.clone()).unwrap());

        // Bodies on disk but no index: the previous run died mid-install
        std::fs::create_dir_all(root.join("manabi-v1")).unwrap();
        std::fs::write(root.join("manabi-v1").join("asset-00000.bin"), "partial").unwrap();

        let offline = Arc::new(CountingNetwork::serving(&[]));
        let cache = OfflineCache::new("manabi-v1", manifest(), storage.clone(), offline.clone());
        assert!(!cache.resume().await);
        assert_eq!(cache.phase(), CachePhase::Parsed);

        // Requests are not served from the half-written directory
        let url = Url::parse(SITE).unwrap();
        assert!(cache.intercept(&url).await.is_err());
        assert_eq!(offline.calls(), 1);

        // A full install over the leftover works and resumes next time
        let installer = OfflineCache::new("manabi-v1", manifest(), storage.clone(), Arc::new(full_network()));
        assert!(installer.register().await);
        let next = OfflineCache::new("manabi-v1", manifest(), storage, offline);
        assert!(next.resume().await);
        assert!(next.intercept(&url).await.is_ok());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn test_default_manifest_installs_from_shipped_site() {
        let site = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../site")
            .canonicalize()
            .unwrap();
        let base = Url::from_directory_path(&site).unwrap();
        let manifest = CacheManifest::resolve(&base, &crate::Config::default().manifest).unwrap();

        let storage = Arc::new(MemoryCacheStorage::new());
        let cache = OfflineCache::new(
            "manabi-v1",
            manifest,
            storage.clone(),
            Arc::new(HttpFetcher::new().unwrap()),
        );
        assert!(cache.register().await);

        let places = base.join("data/places.geojson").unwrap();
        let cached = storage.lookup("manabi-v1", places.as_str()).await.unwrap().unwrap();
        assert_eq!(cached.content_type.as_deref(), Some("application/geo+json"));
    }

    #[tokio::test]
    async fn test_register_failure_is_non_fatal() {
        let network = Arc::new(CountingNetwork::serving(&[]));
        let cache = OfflineCache::new(
            "manabi-v1",
            manifest(),
            Arc::new(MemoryCacheStorage::new()),
            network.clone(),
        );
        assert!(!cache.register().await);

        // Uncontrolled: requests still reach the network
        let url = Url::parse(SITE).unwrap();
        assert!(cache.intercept(&url).await.is_err());
        assert!(network.calls() > 0);
    }
}
