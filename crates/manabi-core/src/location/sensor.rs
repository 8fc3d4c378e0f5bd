use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::models::LatLng;

use super::SensorFailure;

/// How long a one-shot fix may take before it is abandoned.
pub const SENSOR_TIMEOUT: Duration = Duration::from_secs(15);

/// Options for a one-shot position query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the sensor may return. Zero means always a fresh fix.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: SENSOR_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

/// A device location sensor answering one-shot queries.
#[async_trait]
pub trait PositionSensor: Send + Sync {
    /// Whether the device has a location capability at all.
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self, options: &PositionOptions) -> Result<LatLng, SensorFailure>;
}

/// The device has no location capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSensor;

#[async_trait]
impl PositionSensor for NoSensor {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(&self, _options: &PositionOptions) -> Result<LatLng, SensorFailure> {
        Err(SensorFailure::PositionUnavailable)
    }
}

/// A sensor that always reports the same position, for desktops and demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedSensor {
    position: LatLng,
}

impl FixedSensor {
    pub fn new(position: LatLng) -> Self {
        Self { position }
    }
}

#[async_trait]
impl PositionSensor for FixedSensor {
    async fn current_position(&self, options: &PositionOptions) -> Result<LatLng, SensorFailure> {
        debug!(position = %self.position, ?options, "Fixed sensor fix");
        Ok(self.position)
    }
}
