use crate::error::RigError;

/// Constant-current supply driving the test current through the
/// sample. Abstract capability, not a firmware protocol.
pub trait PowerSupply: Send {
    fn set_current(&mut self, amps: f64) -> Result<(), RigError>;
    fn set_output(&mut self, enabled: bool) -> Result<(), RigError>;
    fn read_current(&mut self) -> Result<f64, RigError>;
}

/// Vertical actuator carrying the sample holder. Advances on its own
/// while started; the controller only polls the position.
pub trait Elevator: Send {
    fn start_movement(&mut self) -> Result<(), RigError>;
    fn stop_movement(&mut self) -> Result<(), RigError>;
    fn reset_position(&mut self) -> Result<(), RigError>;
    /// Position in mm above the home point.
    fn position(&mut self) -> Result<f64, RigError>;
}

/// Voltage drop across the sample for a given compression.
pub trait Voltmeter: Send {
    fn meas_voltage(&mut self, compression_mm: f64) -> Result<f64, RigError>;
}

/// Supply stand-in: reads back the setpoint only while the output
/// stage is on.
#[derive(Debug, Default)]
pub struct SimulatedSupply {
    current_a: f64,
    output_on: bool,
}

impl SimulatedSupply {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PowerSupply for SimulatedSupply {
    fn set_current(&mut self, amps: f64) -> Result<(), RigError> {
        self.current_a = amps;
        Ok(())
    }

    fn set_output(&mut self, enabled: bool) -> Result<(), RigError> {
        self.output_on = enabled;
        Ok(())
    }

    fn read_current(&mut self) -> Result<f64, RigError> {
        Ok(if self.output_on { self.current_a } else { 0.0 })
    }
}

/// Elevator stand-in: advances one step per position poll while
/// started, mimicking the constant approach speed of the real axis.
#[derive(Debug)]
pub struct SimulatedElevator {
    position_mm: f64,
    running: bool,
    step_mm: f64,
}

impl SimulatedElevator {
    pub fn new(step_mm: f64) -> Self {
        Self {
            position_mm: 0.0,
            running: false,
            step_mm,
        }
    }
}

impl Elevator for SimulatedElevator {
    fn start_movement(&mut self) -> Result<(), RigError> {
        self.running = true;
        Ok(())
    }

    fn stop_movement(&mut self) -> Result<(), RigError> {
        self.running = false;
        Ok(())
    }

    fn reset_position(&mut self) -> Result<(), RigError> {
        self.position_mm = 0.0;
        self.running = false;
        Ok(())
    }

    fn position(&mut self) -> Result<f64, RigError> {
        if self.running {
            self.position_mm += self.step_mm;
        }
        Ok(self.position_mm)
    }
}

/// Contact-voltage model: the drop rises exponentially towards the
/// open-circuit voltage once the sample is compressed.
#[derive(Debug)]
pub struct ContactVoltmeter {
    open_circuit_v: f64,
    decay_rate: f64,
}

impl Default for ContactVoltmeter {
    fn default() -> Self {
        Self {
            open_circuit_v: 1.5,
            decay_rate: 3.0,
        }
    }
}

impl Voltmeter for ContactVoltmeter {
    fn meas_voltage(&mut self, compression_mm: f64) -> Result<f64, RigError> {
        if compression_mm > 0.0 {
            Ok(self.open_circuit_v * (1.0 - (-self.decay_rate * compression_mm).exp()))
        } else {
            Ok(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supply_reads_zero_while_output_is_off() {
        let mut supply = SimulatedSupply::new();
        supply.set_current(1.0).unwrap();
        assert_eq!(supply.read_current().unwrap(), 0.0);
        supply.set_output(true).unwrap();
        assert_eq!(supply.read_current().unwrap(), 1.0);
        supply.set_output(false).unwrap();
        assert_eq!(supply.read_current().unwrap(), 0.0);
    }

    #[test]
    fn elevator_advances_only_while_started() {
        let mut elevator = SimulatedElevator::new(0.01);
        assert_eq!(elevator.position().unwrap(), 0.0);
        elevator.start_movement().unwrap();
        assert!((elevator.position().unwrap() - 0.01).abs() < 1e-12);
        assert!((elevator.position().unwrap() - 0.02).abs() < 1e-12);
        elevator.stop_movement().unwrap();
        assert!((elevator.position().unwrap() - 0.02).abs() < 1e-12);
        elevator.reset_position().unwrap();
        assert_eq!(elevator.position().unwrap(), 0.0);
    }

    #[test]
    fn voltmeter_is_silent_before_contact() {
        let mut meter = ContactVoltmeter::default();
        assert_eq!(meter.meas_voltage(0.0).unwrap(), 0.0);
        assert_eq!(meter.meas_voltage(-0.1).unwrap(), 0.0);
        let shallow = meter.meas_voltage(0.1).unwrap();
        let deep = meter.meas_voltage(0.5).unwrap();
        assert!(shallow > 0.0);
        assert!(deep > shallow);
        assert!(deep < 1.5);
    }
}
