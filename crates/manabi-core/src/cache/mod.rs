//! Offline asset cache.
//!
//! Assets listed in the cache manifest are fetched once at install time into
//! a named cache generation. After activation, asset requests are answered
//! from the cache first and only go to the network on a miss. Installing a
//! new generation and activating it garbage-collects every older one.

pub mod error;
pub mod fetch;
pub mod manager;
pub mod storage;

pub use error::{CacheError, CacheInstallError, FetchError, StorageError};
pub use fetch::{Asset, AssetFetcher, HttpFetcher};
pub use manager::{CacheManifest, CachePhase, OfflineCache};
pub use storage::{CacheStorage, CachedAsset, DiskCacheStorage, MemoryCacheStorage};
