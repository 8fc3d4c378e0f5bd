//! Data models for the walking quiz.
//!
//! - `LatLng`: a coordinate in degrees, used both for checkpoints and fixes
//! - `Checkpoint`: a named point with a trigger radius and its quiz

pub mod checkpoint;
pub mod position;

pub use checkpoint::{Checkpoint, DEFAULT_RADIUS_M};
pub use position::LatLng;
