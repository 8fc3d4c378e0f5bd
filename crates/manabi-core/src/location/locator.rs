use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::models::LatLng;

use super::{LocationError, ManualPicker, PositionOptions, PositionSensor};

/// Which strategy produces the next fix. Toggled by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationMode {
    #[default]
    Sensor,
    Manual,
}

impl LocationMode {
    pub fn toggled(self) -> Self {
        match self {
            LocationMode::Sensor => LocationMode::Manual,
            LocationMode::Manual => LocationMode::Sensor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LocationMode::Sensor => "GPS",
            LocationMode::Manual => "Tap",
        }
    }
}

/// Resolves the user's location using either strategy.
///
/// Shared behind an `Arc` between the UI loop, which feeds map taps into
/// `manual()`, and the task awaiting `locate`.
pub struct Locator {
    sensor: Arc<dyn PositionSensor>,
    manual: ManualPicker,
    options: PositionOptions,
}

impl Locator {
    pub fn new(sensor: Arc<dyn PositionSensor>) -> Self {
        Self {
            sensor,
            manual: ManualPicker::new(),
            options: PositionOptions::default(),
        }
    }

    pub fn manual(&self) -> &ManualPicker {
        &self.manual
    }

    pub fn has_sensor(&self) -> bool {
        self.sensor.is_available()
    }

    /// Acquire one fix with the given strategy.
    ///
    /// Nothing is retried; on error the user has to trigger another attempt.
    pub async fn locate(&self, mode: LocationMode) -> Result<LatLng, LocationError> {
        match mode {
            LocationMode::Manual => {
                debug!("Waiting for map tap");
                let rx = self.manual.arm();
                let at = rx.await.map_err(|_| LocationError::Cancelled)?;
                info!(position = %at, "Location chosen on map");
                Ok(at)
            }
            LocationMode::Sensor => {
                if !self.sensor.is_available() {
                    warn!("No location sensor available");
                    return Err(LocationError::SensorAbsent);
                }

                let query = self.sensor.current_position(&self.options);
                let result = match tokio::time::timeout(self.options.timeout, query).await {
                    Ok(result) => result.map_err(LocationError::from),
                    Err(_) => Err(LocationError::Timeout),
                };

                match &result {
                    Ok(at) => info!(position = %at, "Sensor fix acquired"),
                    Err(e) => warn!(error = %e, "Sensor fix failed"),
                }
                result
            }
        }
    }
}
