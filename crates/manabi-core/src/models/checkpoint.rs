//! Domain model for quiz checkpoints.
//!
//! Checkpoints are built from the GeoJSON resource by the checkpoint store
//! and are read-only afterwards.

use serde::{Deserialize, Serialize};

use super::LatLng;

/// Trigger radius used when a feature does not carry one.
pub const DEFAULT_RADIUS_M: f64 = 120.0;

/// A named point of interest with its quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub name: String,
    pub location: LatLng,
    /// Trigger radius in meters, inclusive.
    pub radius_m: f64,
    pub quiz: String,
    pub answer: String,
}

impl Checkpoint {
    /// Radius label for place lists, e.g. "r=120m".
    pub fn radius_label(&self) -> String {
        if self.radius_m.fract() == 0.0 {
            format!("r={}m", self.radius_m as i64)
        } else {
            format!("r={:.1}m", self.radius_m)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(radius_m: f64) -> Checkpoint {
        Checkpoint {
            name: "Shrine gate".to_string(),
            location: LatLng::new(36.34, 139.45),
            radius_m,
            quiz: "How many lanterns?".to_string(),
            answer: "Eight".to_string(),
        }
    }

    #[test]
    fn test_radius_label() {
        assert_eq!(checkpoint(120.0).radius_label(), "r=120m");
        assert_eq!(checkpoint(82.5).radius_label(), "r=82.5m");
    }
}
