use sensor::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RigError {
    #[error("sensor transport error: {0}")]
    Transport(#[from] TransportError),

    /// A power-supply or elevator call failed. Aborts the current run
    /// only; the controller returns to idle.
    #[error("hardware call failed: {0}")]
    Hardware(String),
}
