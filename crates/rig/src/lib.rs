pub mod controller;
pub mod error;
pub mod hardware;

pub use controller::{MeasurementController, RigDevices};
pub use error::RigError;
