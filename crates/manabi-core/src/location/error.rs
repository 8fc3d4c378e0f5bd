use thiserror::Error;

/// Failure reported by a location sensor for a one-shot query.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFailure {
    #[error("permission denied")]
    PermissionDenied,

    #[error("position unavailable")]
    PositionUnavailable,

    #[error("timed out")]
    Timeout,

    #[error("unknown sensor error")]
    Unknown,
}

impl SensorFailure {
    /// Map a W3C geolocation error code (1, 2, 3) to a failure.
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => SensorFailure::PermissionDenied,
            2 => SensorFailure::PositionUnavailable,
            3 => SensorFailure::Timeout,
            _ => SensorFailure::Unknown,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission was denied")]
    PermissionDenied,

    #[error("Location could not be determined")]
    PositionUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("This device has no location sensor")]
    SensorAbsent,

    #[error("Location error")]
    Unknown,

    #[error("Map selection was cancelled")]
    Cancelled,
}

impl From<SensorFailure> for LocationError {
    fn from(failure: SensorFailure) -> Self {
        match failure {
            SensorFailure::PermissionDenied => LocationError::PermissionDenied,
            SensorFailure::PositionUnavailable => LocationError::PositionUnavailable,
            SensorFailure::Timeout => LocationError::Timeout,
            SensorFailure::Unknown => LocationError::Unknown,
        }
    }
}

impl LocationError {
    /// Message shown to the user. The user has to trigger a new attempt.
    pub fn user_message(&self) -> String {
        match self {
            LocationError::SensorAbsent => {
                "This device does not support location. Switch to tap mode [t] and tap the map."
                    .to_string()
            }
            LocationError::Cancelled => "Map selection cancelled.".to_string(),
            _ => format!(
                "Location error: {}. Allow location access for this app and try again.",
                self
            ),
        }
    }
}
