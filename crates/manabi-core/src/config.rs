//! Application configuration management.
//!
//! Configuration is stored at `~/.config/manabi/config.json`. Every field has
//! a default, so a missing or partial file is fine. Two environment variables
//! override it: `MANABI_SITE_URL` and `MANABI_POSITION` (`"lat,lng"`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::models::LatLng;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "manabi";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const SITE_URL_ENV: &str = "MANABI_SITE_URL";
const POSITION_ENV: &str = "MANABI_POSITION";

/// Assets persisted for offline use, relative to the site URL. These are
/// the files shipped under `site/`.
const DEFAULT_MANIFEST: [&str; 3] = ["./", "./index.html", "./data/places.geojson"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the quiz site. Defaults to the current directory.
    pub site_url: Option<String>,
    /// Checkpoint GeoJSON, relative to the site URL.
    pub checkpoints_path: String,
    /// Current cache generation tag. Bump it to replace the offline cache.
    pub cache_generation: String,
    pub manifest: Vec<String>,
    pub map_center: LatLng,
    pub map_zoom: u8,
    /// Start in tap mode instead of sensor mode.
    pub tap_mode: bool,
    /// Position reported by the fixed sensor. No sensor when unset.
    pub sensor_position: Option<LatLng>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: None,
            checkpoints_path: "data/places.geojson".to_string(),
            cache_generation: "manabi-v1".to_string(),
            manifest: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
            map_center: LatLng::new(36.34, 139.45),
            map_zoom: 15,
            tap_mode: false,
            sensor_position: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_json(&contents)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).context("Failed to parse config file")
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        Ok(self.cache_dir()?.join("logs"))
    }

    /// Site base URL: `MANABI_SITE_URL`, then `site_url`, then the current
    /// directory as a `file://` URL. Always ends with a slash so relative
    /// manifest entries resolve inside it.
    pub fn site_base(&self) -> Result<Url> {
        let configured = std::env::var(SITE_URL_ENV).ok().or_else(|| self.site_url.clone());
        let mut url = match configured {
            Some(raw) => {
                Url::parse(&raw).with_context(|| format!("Invalid site URL: {}", raw))?
            }
            None => {
                let cwd = std::env::current_dir().context("Could not read current directory")?;
                Url::from_directory_path(&cwd)
                    .map_err(|_| anyhow::anyhow!("Invalid site directory: {}", cwd.display()))?
            }
        };
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn checkpoints_url(&self) -> Result<Url> {
        let base = self.site_base()?;
        base.join(&self.checkpoints_path)
            .with_context(|| format!("Invalid checkpoints path: {}", self.checkpoints_path))
    }

    /// Position for the fixed sensor: `MANABI_POSITION`, then the config.
    pub fn sensor_position(&self) -> Result<Option<LatLng>> {
        match std::env::var(POSITION_ENV) {
            Ok(raw) => raw
                .parse::<LatLng>()
                .map(Some)
                .map_err(|e| anyhow::anyhow!("Invalid {}: {}", POSITION_ENV, e)),
            Err(_) => Ok(self.sensor_position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.cache_generation, "manabi-v1");
        assert_eq!(config.manifest, vec!["./", "./index.html", "./data/places.geojson"]);
        assert_eq!(config.map_zoom, 15);
        assert!(!config.tap_mode);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_json(r#"{"tap_mode": true, "cache_generation": "manabi-v2"}"#)
            .unwrap();
        assert!(config.tap_mode);
        assert_eq!(config.cache_generation, "manabi-v2");
        assert_eq!(config.checkpoints_path, "data/places.geojson");
        assert_eq!(config.map_center, LatLng::new(36.34, 139.45));
    }

    #[test]
    fn test_sensor_position_from_config() {
        let config = Config::from_json(r#"{"sensor_position": {"lat": 36.3401, "lng": 139.4502}}"#)
            .unwrap();
        assert_eq!(config.sensor_position, Some(LatLng::new(36.3401, 139.4502)));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("manabi-config-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join(APP_NAME).join(CONFIG_FILE);

        // Missing file means defaults
        let mut config = Config::load_from(&path).unwrap();
        assert!(!config.tap_mode);

        config.tap_mode = true;
        config.sensor_position = Some(LatLng::new(36.3401, 139.4502));
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert!(reloaded.tap_mode);
        assert_eq!(reloaded.sensor_position, Some(LatLng::new(36.3401, 139.4502)));
        assert_eq!(reloaded.manifest, config.manifest);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_manifest_matches_shipped_site() {
        let site = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../site");
        for entry in Config::default().manifest {
            let relative = entry.trim_start_matches("./");
            let path = if relative.is_empty() {
                site.join("index.html")
            } else {
                site.join(relative)
            };
            assert!(path.is_file(), "{} is not shipped", path.display());
        }
    }
}
