//! Location acquisition.
//!
//! A fix comes from one of two strategies, chosen by the user:
//!
//! - `Sensor`: a one-shot query against a `PositionSensor`
//! - `Manual`: the next map tap stands in for the user's position
//!
//! `Locator::locate` is the single entry point; it suspends until the chosen
//! strategy resolves.

pub mod error;
pub mod locator;
pub mod manual;
pub mod sensor;

pub use error::{LocationError, SensorFailure};
pub use locator::{LocationMode, Locator};
pub use manual::ManualPicker;
pub use sensor::{FixedSensor, NoSensor, PositionOptions, PositionSensor};
