//! Manabi core library.
//!
//! Everything behind the walking quiz that is not drawing: the checkpoint
//! store, the proximity evaluator, location acquisition, the offline asset
//! cache and the quiz session that ties them together.

pub mod cache;
pub mod checkpoints;
pub mod config;
pub mod geo;
pub mod location;
pub mod models;
pub mod proximity;
pub mod session;

pub use checkpoints::{CheckpointSource, LoadError};
pub use config::Config;
pub use location::{LocationError, LocationMode, Locator};
pub use models::{Checkpoint, LatLng};
pub use proximity::{evaluate, InRange, QuizView};
pub use session::QuizSession;
