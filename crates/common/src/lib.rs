use serde::Serialize;

pub mod config;
pub mod diagnostics;
pub mod resistance;

pub use config::RigConfig;
pub use diagnostics::DecodeStats;

/// One telemetry record, emitted once per controller tick.
///
/// Every field except the `final` tag is optional: a field is `None`
/// when the quantity is undefined for the current phase (e.g. no
/// voltage during retraction), never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevator_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_mm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage_v: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_a: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance_mohm_cm2: Option<f64>,
    #[serde(rename = "final")]
    pub is_final: bool,
}

impl TelemetrySample {
    /// Sample carrying only the elevator position, used during retraction.
    pub fn elevator_only(position_mm: f64) -> Self {
        Self {
            elevator_mm: Some(position_mm),
            compression_mm: None,
            voltage_v: None,
            current_a: None,
            resistance_mohm_cm2: None,
            is_final: false,
        }
    }
}

/// Phase of the measurement state machine. `repr(u8)` so the
/// controller can keep it in an atomic for the single-flight check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MeasurementState {
    Idle = 0,
    Approaching = 1,
    Dwelling = 2,
    Retracting = 3,
}

impl MeasurementState {
    pub fn from_u8(raw: u8) -> Self {
        match raw {
            1 => MeasurementState::Approaching,
            2 => MeasurementState::Dwelling,
            3 => MeasurementState::Retracting,
            _ => MeasurementState::Idle,
        }
    }
}

/// Round to a fixed number of decimals, matching the precision the
/// telemetry consumers display (3 for positions/voltages, 2 for
/// resistance).
pub fn round_dp(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_dp_truncates_to_requested_precision() {
        assert_eq!(round_dp(0.123456, 3), 0.123);
        assert_eq!(round_dp(2499.996, 2), 2500.0);
        assert_eq!(round_dp(-0.0005, 3), -0.001);
    }

    #[test]
    fn state_round_trips_through_u8() {
        for state in [
            MeasurementState::Idle,
            MeasurementState::Approaching,
            MeasurementState::Dwelling,
            MeasurementState::Retracting,
        ] {
            assert_eq!(MeasurementState::from_u8(state as u8), state);
        }
        assert_eq!(MeasurementState::from_u8(42), MeasurementState::Idle);
    }
}
