//! Hydrogen density for the stored mass.
//!
//! Above the critical temperature the gas follows the Abel-Noble equation
//! `p (1/rho - b) = R_s T`; below it the tank holds saturated liquid.
//! Pressures are in MPa, temperatures in K and densities in kg/m^3.

use log::warn;

use crate::error::{DesignError, DesignResult};
use crate::numbers::interp;

/// Specific gas constant of hydrogen (J/(kg K)).
pub const GAS_CONSTANT: f64 = 4124.2;

/// Abel-Noble co-volume of hydrogen (m^3/kg).
pub const CO_VOLUME: f64 = 7.691e-3;

pub const CRITICAL_TEMPERATURE: f64 = 33.145;

/// Saturated liquid density of para hydrogen from the triple point up to
/// the critical point.
static SATURATED_LIQUID: [(f64, f64); 11] = [
    (13.957, 77.02),
    (16.0, 75.10),
    (18.0, 73.20),
    (20.0, 71.10),
    (22.0, 68.70),
    (24.0, 66.00),
    (26.0, 62.90),
    (28.0, 59.30),
    (30.0, 54.80),
    (32.0, 48.50),
    (CRITICAL_TEMPERATURE, 31.26),
];

/// Density of hydrogen at `pressure` (MPa) and `temperature` (K).
pub fn density(pressure: f64, temperature: f64) -> DesignResult<f64> {
    if !(temperature > 0.0) {
        return Err(DesignError::Configuration(format!(
            "temperature must be positive, got {} K",
            temperature
        )));
    }
    if !(pressure >= 0.0) {
        return Err(DesignError::Configuration(format!(
            "pressure must not be negative, got {} MPa",
            pressure
        )));
    }
    if temperature < CRITICAL_TEMPERATURE {
        if temperature < SATURATED_LIQUID[0].0 {
            warn!(
                "{} K lies below the triple point of hydrogen, using the triple point density",
                temperature
            );
        }
        let (t, rho): (Vec<f64>, Vec<f64>) = SATURATED_LIQUID.iter().cloned().unzip();
        return Ok(interp(temperature, &t, &rho));
    }
    let p = pressure * 1e6;
    Ok(p / (GAS_CONSTANT * temperature + CO_VOLUME * p))
}

/// Mass (kg) of hydrogen in `volume` (mm^3) filled to `max_fill` of the
/// volume.
pub fn stored_mass(pressure: f64, temperature: f64, volume: f64, max_fill: f64) -> DesignResult<f64> {
    if !(max_fill > 0.0 && max_fill <= 1.0) {
        return Err(DesignError::Configuration(format!(
            "maximum fill level must lie in (0, 1], got {}",
            max_fill
        )));
    }
    Ok(density(pressure, temperature)? * volume * 1e-9 * max_fill)
}

/// Hydrogen mass over hydrogen plus tank mass.
pub fn gravimetric_index(hydrogen_mass: f64, tank_mass: f64) -> f64 {
    hydrogen_mass / (hydrogen_mass + tank_mass)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_gas_at_room_temperature() {
        // about 40 kg/m^3 at 70 MPa and 15 C, 24 kg/m^3 at 35 MPa
        let rho = density(70.0, 288.15).unwrap();
        assert!(rho > 38.0 && rho < 42.0);
        let rho = density(35.0, 288.15).unwrap();
        assert!(rho > 22.0 && rho < 25.0);
    }

    #[test]
    fn ideal_gas_limit() {
        let rho = density(0.1, 300.0).unwrap();
        let ideal = 0.1e6 / (GAS_CONSTANT * 300.0);
        assert!((rho - ideal).abs() / ideal < 1e-3);
    }

    #[test]
    fn liquid_below_critical_point() {
        let rho = density(0.3, 20.0).unwrap();
        assert!((rho - 71.1).abs() < 1e-9);
        // pressure does not matter for the saturated liquid
        assert_eq!(density(1.0, 20.0).unwrap(), rho);
        assert_eq!(density(0.1, 10.0).unwrap(), 77.02);
    }

    #[test]
    fn stored_mass_of_a_litre_tank() {
        let volume = 1e6; // 1 l in mm^3
        let mass = stored_mass(70.0, 288.15, volume, 1.0).unwrap();
        assert!((mass - density(70.0, 288.15).unwrap() * 1e-3).abs() < 1e-12);
        assert!(stored_mass(70.0, 288.15, volume, 1.5).is_err());
        assert!(density(70.0, -1.0).is_err());
    }

    #[test]
    fn index() {
        assert!((gravimetric_index(1.0, 19.0) - 0.05).abs() < 1e-12);
    }
}
