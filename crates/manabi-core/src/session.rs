//! Quiz session: the loaded checkpoints, the chosen location mode and the
//! last fix, owned in one place and handed to whoever needs them.

use tracing::{info, warn};

use crate::cache::AssetFetcher;
use crate::checkpoints::{self, CheckpointSource, LoadError};
use crate::location::LocationMode;
use crate::models::{Checkpoint, LatLng};
use crate::proximity::QuizView;

pub struct QuizSession {
    checkpoints: Vec<Checkpoint>,
    load_error: Option<LoadError>,
    mode: LocationMode,
    last_fix: Option<LatLng>,
}

impl QuizSession {
    pub fn new(loaded: Result<Vec<Checkpoint>, LoadError>, mode: LocationMode) -> Self {
        let (checkpoints, load_error) = match loaded {
            Ok(checkpoints) => (checkpoints, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        Self {
            checkpoints,
            load_error,
            mode,
            last_fix: None,
        }
    }

    /// Load checkpoints and start a session. A load failure leaves the
    /// session usable with the quiz disabled.
    pub async fn start(
        source: &CheckpointSource,
        fetcher: &dyn AssetFetcher,
        mode: LocationMode,
    ) -> Self {
        let loaded = checkpoints::load(source, fetcher).await;
        if let Err(ref e) = loaded {
            warn!(error = %e, "Checkpoints failed to load, quiz disabled");
        }
        Self::new(loaded, mode)
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn load_error(&self) -> Option<&LoadError> {
        self.load_error.as_ref()
    }

    pub fn quiz_enabled(&self) -> bool {
        self.load_error.is_none()
    }

    pub fn mode(&self) -> LocationMode {
        self.mode
    }

    pub fn toggle_mode(&mut self) -> LocationMode {
        self.mode = self.mode.toggled();
        info!(mode = self.mode.label(), "Location mode changed");
        self.mode
    }

    pub fn last_fix(&self) -> Option<LatLng> {
        self.last_fix
    }

    /// Replace the current fix and evaluate it against the checkpoints.
    pub fn record_fix(&mut self, fix: LatLng) -> QuizView<'_> {
        self.last_fix = Some(fix);
        let view = QuizView::for_location(fix, &self.checkpoints);
        info!(position = %fix, unlocked = view.unlocked().len(), "Location evaluated");
        view
    }

    /// Quiz view for the current fix, if there is one.
    pub fn view(&self) -> Option<QuizView<'_>> {
        self.last_fix
            .map(|fix| QuizView::for_location(fix, &self.checkpoints))
    }
}
