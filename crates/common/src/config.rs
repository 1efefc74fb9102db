use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Rig parameters. Defaults match the commissioning values of the
/// measurement stand; a TOML file can override any subset.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RigConfig {
    pub tick_period_ms: u64,
    pub settle_time_ms: u64,
    pub current_setpoint_a: f64,
    pub contact_threshold_mm: f64,
    pub contact_offset_mm: f64,
    pub approach_step_mm: f64,
    pub retract_step_mm: f64,
    pub contact_area_cm2: f64,
    pub baud_rate: u32,
    pub serial_port: Option<String>,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 50,
            settle_time_ms: 1000,
            current_setpoint_a: 1.0,
            contact_threshold_mm: 0.5,
            contact_offset_mm: 0.2,
            approach_step_mm: 0.01,
            retract_step_mm: 0.02,
            contact_area_cm2: 5.0,
            baud_rate: 115_200,
            serial_port: None,
        }
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<RigConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: RigConfig = toml::from_str(&contents)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults_for_missing_keys() {
        let config: RigConfig =
            toml::from_str("tick_period_ms = 10\nserial_port = \"COM3\"").unwrap();
        assert_eq!(config.tick_period_ms, 10);
        assert_eq!(config.serial_port.as_deref(), Some("COM3"));
        assert_eq!(config.settle_time_ms, 1000);
        assert_eq!(config.contact_threshold_mm, 0.5);
    }

    #[test]
    fn retract_is_faster_than_approach_by_default() {
        let config = RigConfig::default();
        assert!(config.retract_step_mm > config.approach_step_mm);
    }
}
