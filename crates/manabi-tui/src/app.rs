//! Application state management for the walking quiz TUI.
//!
//! `App` owns the quiz session, the locator and the offline cache, and
//! coordinates the background tasks (location fixes, cache registration)
//! whose results come back over an mpsc channel.

use std::cell::Cell;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use ratatui::layout::Rect;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use manabi_core::cache::{
    CacheManifest, CacheStorage, DiskCacheStorage, HttpFetcher, MemoryCacheStorage, OfflineCache,
};
use manabi_core::location::{FixedSensor, NoSensor, PositionSensor};
use manabi_core::{CheckpointSource, Config, LatLng, LocationError, LocationMode, Locator, QuizSession};

use crate::ui::map::Viewport;

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Zoom used after a fix, close enough to see checkpoint radii.
const FIX_ZOOM: u8 = 17;

// ============================================================================
// State Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    Quitting,
}

/// Results sent back from background tasks.
#[derive(Debug)]
pub enum BackgroundResult {
    Located {
        request: u64,
        result: Result<LatLng, LocationError>,
    },
    CacheRegistered {
        active: bool,
        age: Option<String>,
    },
}

/// Offline cache status shown in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    Installing,
    Ready(Option<String>),
    OnlineOnly,
}

impl CacheStatus {
    pub fn label(&self) -> String {
        match self {
            CacheStatus::Installing => "offline: installing".to_string(),
            CacheStatus::Ready(Some(age)) => format!("offline: ready ({})", age),
            CacheStatus::Ready(None) => "offline: ready".to_string(),
            CacheStatus::OnlineOnly => "offline: unavailable".to_string(),
        }
    }
}

/// Tracks location requests so only the most recent one is applied.
///
/// Starting a request supersedes any pending one. A superseded request
/// resolves later (a re-armed tap resolves as `Cancelled`) and its result
/// is dropped without touching the status bar.
#[derive(Debug, Default)]
pub struct LocateRequests {
    pending: Option<u64>,
    next: u64,
}

impl LocateRequests {
    /// Start a new request and return its id.
    pub fn begin(&mut self) -> u64 {
        self.next += 1;
        self.pending = Some(self.next);
        self.next
    }

    /// Settle a finished request. Returns true when its result should be
    /// applied, false when it was superseded or already settled.
    pub fn finish(&mut self, request: u64) -> bool {
        if self.pending == Some(request) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub config: Config,
    pub session: QuizSession,
    locator: Arc<Locator>,
    cache: Arc<OfflineCache>,

    pub state: AppState,
    pub viewport: Viewport,
    pub place_selection: usize,
    pub reveal_answers: bool,

    locate_requests: LocateRequests,

    tx: mpsc::Sender<BackgroundResult>,
    rx: mpsc::Receiver<BackgroundResult>,

    pub status_message: Option<String>,
    pub status_is_error: bool,
    pub cache_status: CacheStatus,

    /// Inner map area from the last draw, for turning clicks into coordinates.
    pub map_area: Cell<Option<Rect>>,
}

impl App {
    /// Create a new application instance: load config, bring up the offline
    /// cache and load checkpoints through it.
    pub async fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };

        let site = config.site_base()?;
        debug!(%site, "Site base configured");

        let storage: Arc<dyn CacheStorage> = match Self::disk_storage(&config) {
            Ok(storage) => Arc::new(storage),
            Err(e) => {
                warn!(error = %e, "Disk cache unavailable, using memory");
                Arc::new(MemoryCacheStorage::new())
            }
        };
        let manifest = CacheManifest::resolve(&site, &config.manifest)?;
        let network = Arc::new(HttpFetcher::new()?);
        let cache = Arc::new(OfflineCache::new(
            config.cache_generation.clone(),
            manifest,
            storage,
            network,
        ));
        let resumed = cache.resume().await;

        let sensor: Arc<dyn PositionSensor> = match config.sensor_position()? {
            Some(position) => Arc::new(FixedSensor::new(position)),
            None => Arc::new(NoSensor),
        };
        let locator = Arc::new(Locator::new(sensor));

        let mode = if config.tap_mode {
            LocationMode::Manual
        } else {
            LocationMode::Sensor
        };
        let source = CheckpointSource::Url(config.checkpoints_url()?);
        let session = QuizSession::start(&source, cache.as_ref(), mode).await;

        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        let cache_status = if resumed {
            CacheStatus::Ready(cache.installed_age().await)
        } else {
            CacheStatus::Installing
        };

        Ok(Self {
            viewport: Viewport::new(config.map_center, config.map_zoom),
            config,
            session,
            locator,
            cache,

            state: AppState::Normal,
            place_selection: 0,
            reveal_answers: false,

            locate_requests: LocateRequests::default(),

            tx,
            rx,

            status_message: None,
            status_is_error: false,
            cache_status,

            map_area: Cell::new(None),
        })
    }

    fn disk_storage(config: &Config) -> Result<DiskCacheStorage> {
        let dir: PathBuf = config.cache_dir()?.join("assets");
        Ok(DiskCacheStorage::new(dir)?)
    }

    /// Register the offline cache in the background. Failures are logged
    /// only; the app keeps working online.
    pub fn register_cache(&self) {
        let cache = self.cache.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let active = cache.register().await;
            let age = if active { cache.installed_age().await } else { None };
            Self::send_result(&tx, BackgroundResult::CacheRegistered { active, age }).await;
        });
    }

    /// Helper to send background results, logging any channel errors
    async fn send_result(tx: &mpsc::Sender<BackgroundResult>, result: BackgroundResult) {
        if let Err(e) = tx.send(result).await {
            error!(error = %e, "Failed to send background result - channel closed");
        }
    }

    // ===== Location =====

    /// Start acquiring a location with the current mode.
    ///
    /// A new request supersedes one still pending; its late result is ignored.
    pub fn start_locate(&mut self) {
        let mode = self.session.mode();
        if mode == LocationMode::Sensor && !self.locator.has_sensor() {
            self.set_error(LocationError::SensorAbsent.user_message());
            return;
        }

        let request = self.locate_requests.begin();

        let locator = self.locator.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = locator.locate(mode).await;
            Self::send_result(&tx, BackgroundResult::Located { request, result }).await;
        });

        self.set_status(match mode {
            LocationMode::Sensor => "Getting your location...",
            LocationMode::Manual => "Tap the map to use that spot as your location.",
        });
    }

    pub fn is_locating(&self) -> bool {
        self.locate_requests.is_pending()
    }

    pub fn is_tap_armed(&self) -> bool {
        self.locator.manual().is_armed()
    }

    /// Switch between sensor and tap mode. The choice is saved so the next
    /// run starts in the same mode.
    pub fn toggle_mode(&mut self) {
        let mode = self.session.toggle_mode();
        self.config.tap_mode = mode == LocationMode::Manual;
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save location mode");
        }
        self.set_status(format!("Location mode: {}", mode.label()));
    }

    /// A click on the map. Only used while a tap request is armed.
    pub fn map_clicked(&mut self, column: u16, row: u16) {
        let Some(area) = self.map_area.get() else {
            return;
        };
        let Some(at) = self.viewport.unproject(area, column, row) else {
            return;
        };
        if self.locator.manual().pointer(at) {
            debug!(position = %at, "Map tap delivered");
        }
    }

    fn apply_fix(&mut self, fix: LatLng) {
        let unlocked = self.session.record_fix(fix).unlocked().len();
        self.viewport.center = fix;
        self.viewport.zoom = FIX_ZOOM;
        self.reveal_answers = false;
        if unlocked > 0 {
            self.set_status(format!("{} quiz(zes) unlocked!", unlocked));
        } else {
            self.set_status("Location updated.");
        }
    }

    // ===== Background results =====

    /// Drain completed background tasks.
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.rx.try_recv() {
            match result {
                BackgroundResult::Located { request, result } => {
                    if !self.locate_requests.finish(request) {
                        debug!(request, "Ignoring superseded location result");
                        continue;
                    }
                    match result {
                        Ok(fix) => self.apply_fix(fix),
                        Err(e) => self.set_error(e.user_message()),
                    }
                }
                BackgroundResult::CacheRegistered { active, age } => {
                    info!(active, "Offline cache registration finished");
                    self.cache_status = if active {
                        CacheStatus::Ready(age)
                    } else {
                        CacheStatus::OnlineOnly
                    };
                }
            }
        }
    }

    // ===== Places =====

    pub fn select_next_place(&mut self) {
        let count = self.session.checkpoints().len();
        if count > 0 {
            self.place_selection = (self.place_selection + 1) % count;
        }
    }

    pub fn select_prev_place(&mut self) {
        let count = self.session.checkpoints().len();
        if count > 0 {
            self.place_selection = (self.place_selection + count - 1) % count;
        }
    }

    /// Center the map on the selected checkpoint.
    pub fn show_selected_place(&mut self) {
        if let Some(cp) = self.session.checkpoints().get(self.place_selection) {
            self.viewport.center = cp.location;
            self.set_status(format!("{} ({})", cp.name, cp.radius_label()));
        }
    }

    /// Center the map on the last fix, or the configured start view.
    pub fn recenter(&mut self) {
        match self.session.last_fix() {
            Some(fix) => self.viewport.center = fix,
            None => {
                self.viewport.center = self.config.map_center;
                self.viewport.zoom = self.config.map_zoom;
            }
        }
    }

    // ===== Status =====

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_is_error = false;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_is_error = true;
    }
}
