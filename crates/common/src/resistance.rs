/// Default contact area of the sample holder in cm².
pub const DEFAULT_CONTACT_AREA_CM2: f64 = 5.0;

/// Surface resistance in mΩ·cm², derived from the voltage drop across
/// the sample at a known test current.
///
/// Returns `None` while no current flows; the figure is undefined
/// then, not zero.
pub fn surface_resistance(voltage_v: f64, current_a: f64, area_cm2: f64) -> Option<f64> {
    if current_a <= 0.0 {
        return None;
    }
    Some(voltage_v / current_a * area_cm2 * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_ohms_to_milliohm_cm2() {
        let r = surface_resistance(0.5, 1.0, DEFAULT_CONTACT_AREA_CM2).unwrap();
        assert!((r - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn absent_without_current() {
        assert_eq!(surface_resistance(1.2, 0.0, DEFAULT_CONTACT_AREA_CM2), None);
        assert_eq!(surface_resistance(1.2, -1.0, DEFAULT_CONTACT_AREA_CM2), None);
    }

    #[test]
    fn halving_the_current_doubles_the_figure() {
        let full = surface_resistance(1.0, 1.0, 5.0).unwrap();
        let half = surface_resistance(1.0, 0.5, 5.0).unwrap();
        assert!((half - 2.0 * full).abs() < 1e-9);
    }
}
