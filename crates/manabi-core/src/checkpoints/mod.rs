//! Checkpoint store.
//!
//! Checkpoints ship as a GeoJSON FeatureCollection of Point features whose
//! properties carry `name`, `radius`, `quiz` and `answer`. The store turns
//! that resource into `Checkpoint`s once at startup; a failure disables the
//! quiz but nothing else.

pub mod error;
pub mod store;

pub use error::LoadError;
pub use store::{load, parse, CheckpointSource};
