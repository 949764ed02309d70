//! Sizing of an all metal tank for the same contour.
//!
//! Membrane stresses of the pressurised shell are compared by von Mises
//! with the ultimate strength of the metal. The cylinder and the domes get
//! one wall thickness each.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::contour::{Liner, Side};
use crate::error::{DesignError, DesignResult};
use crate::solver::curvature_radii;
use crate::winding::MandrelNodes;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalMaterial {
    #[serde(default)]
    pub name: String,
    /// g/cm^3
    pub density: f64,
    /// MPa
    pub yield_strength: f64,
    /// MPa
    pub ultimate_strength: f64,
}

lazy_static! {
    pub static ref METALS: BTreeMap<&'static str, MetalMaterial> = {
        let mut metals = BTreeMap::new();
        for &(name, density, yield_strength, ultimate_strength) in [
            ("alu6061T6", 2.70, 276.0, 310.0),
            ("alu7075T6", 2.81, 503.0, 572.0),
            ("steel34CrMo4", 7.85, 800.0, 1000.0),
            ("steel316L", 8.00, 220.0, 520.0),
            ("titaniumTi6Al4V", 4.43, 880.0, 950.0),
        ]
        .iter()
        {
            metals.insert(
                name,
                MetalMaterial {
                    name: name.to_string(),
                    density,
                    yield_strength,
                    ultimate_strength,
                },
            );
        }
        metals
    };
}

pub fn get_metal(name: &str) -> DesignResult<MetalMaterial> {
    METALS.get(name).cloned().ok_or_else(|| {
        DesignError::Configuration(format!(
            "unknown metal '{}'. Use --list to see the available metals",
            name
        ))
    })
}

pub fn metal_names() -> Vec<&'static str> {
    METALS.keys().cloned().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetalTank {
    pub cylinder_thickness: f64,
    /// thickness of each dome, side one first
    pub dome_thickness: [f64; 2],
    /// kg
    pub mass: f64,
    /// mm^3
    pub inner_volume: f64,
    pub outer_length: f64,
    pub outer_diameter: f64,
}

fn von_mises(n1: f64, n2: f64) -> f64 {
    (n1 * n1 - n1 * n2 + n2 * n2).sqrt()
}

/// Largest von Mises membrane resultant (N/mm) over the dome of one side.
fn dome_resultant(liner: &Liner, side: Side, pressure: f64, dome_points: usize) -> f64 {
    let (x, r) = liner.dome(side).get_contour(dome_points.max(3));
    let nodes = MandrelNodes::new(x, r, 0);
    let curvature = curvature_radii(&nodes.element_radii(), &nodes.element_slopes(), &nodes.element_positions());
    curvature
        .iter()
        .map(|&(r1, r2)| {
            let n1 = 0.5 * pressure * r2;
            let n2 = pressure * r2 * (1.0 - r2 / (2.0 * r1));
            von_mises(n1, n2)
        })
        .filter(|n| n.is_finite())
        .fold(0.0, f64::max)
}

/// Wall thicknesses and mass of a metal tank with the inner contour of
/// `liner` bursting at `burst_pressure`.
pub fn size_metal_tank(
    liner: &Liner,
    material: &MetalMaterial,
    burst_pressure: f64,
    dome_points: usize,
) -> DesignResult<MetalTank> {
    if !(burst_pressure > 0.0) {
        return Err(DesignError::Configuration(format!(
            "burst pressure must be positive, got {}",
            burst_pressure
        )));
    }
    if !(material.ultimate_strength > 0.0 && material.density > 0.0) {
        return Err(DesignError::Configuration(format!(
            "metal '{}' needs a positive strength and density",
            material.name
        )));
    }
    let strength = material.ultimate_strength;
    let r_cyl = liner.r_cyl();
    // hoop pR/t and axial pR/2t
    let cylinder_thickness = von_mises(burst_pressure * r_cyl, 0.5 * burst_pressure * r_cyl) / strength;

    let mut dome_thickness = [0.0; 2];
    let mut dome_volume = 0.0;
    for side in [Side::One, Side::Two].iter().cloned() {
        let t = dome_resultant(liner, side, burst_pressure, dome_points) / strength;
        dome_thickness[side.index()] = t;
        let dome = liner.dome(side);
        dome_volume += dome.resized(t)?.volume() - dome.volume();
    }
    let cylinder_volume = PI * ((r_cyl + cylinder_thickness).powi(2) - r_cyl.powi(2)) * liner.lcyl();
    let mass = (cylinder_volume + dome_volume) * material.density * 1e-6;
    debug!(
        "metal tank: cylinder {:.3} mm, domes {:.3}/{:.3} mm, {:.3} kg",
        cylinder_thickness, dome_thickness[0], dome_thickness[1], mass
    );

    Ok(MetalTank {
        cylinder_thickness,
        dome_thickness,
        mass,
        inner_volume: liner.volume(),
        outer_length: liner.length() + dome_thickness[0] + dome_thickness[1],
        outer_diameter: 2.0 * (r_cyl + cylinder_thickness),
    })
}
