//! Winding adapter.
//!
//! The design loop talks to a winding simulator only through the
//! `WindingEngine` trait: set the angle or hoop shift of layer k, run the
//! simulation, then read polar openings, mandrel geometry and ply
//! thickness distributions. `ReferenceWinder` is the geodesic netting
//! implementation shipped with the crate.

use std::f64::consts::PI;
use std::fmt;

use crate::contour::{arc_lengths, make_monotone, offset_nodes, shift_on_contour, Side};
use crate::error::DesignResult;
use crate::numbers::{argmax, interp};

pub mod reference;

pub use self::reference::ReferenceWinder;

/// Meridian nodes from the cylinder midpoint to the polar opening.
#[derive(Debug, Clone, PartialEq)]
pub struct MandrelNodes {
    pub x: Vec<f64>,
    pub r: Vec<f64>,
    /// contour length from the cylinder midpoint
    pub l: Vec<f64>,
    /// node index where the cylinder meets the dome
    pub cylinder_end: usize,
}

impl MandrelNodes {
    pub fn new(x: Vec<f64>, r: Vec<f64>, cylinder_end: usize) -> MandrelNodes {
        let l = arc_lengths(&x, &r);
        MandrelNodes { x, r, l, cylinder_end }
    }

    pub fn element_count(&self) -> usize {
        self.x.len().saturating_sub(1)
    }

    pub fn r_cyl(&self) -> f64 {
        self.r[0]
    }

    pub fn polar_opening(&self) -> f64 {
        self.r[self.r.len() - 1]
    }

    pub fn contour_length(&self) -> f64 {
        self.l[self.l.len() - 1]
    }

    pub fn cylinder_end_length(&self) -> f64 {
        self.l[self.cylinder_end]
    }

    pub fn element_radii(&self) -> Vec<f64> {
        self.r.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    pub fn element_lengths(&self) -> Vec<f64> {
        self.l.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Contour length at the element midpoints.
    pub fn element_positions(&self) -> Vec<f64> {
        self.l.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect()
    }

    /// Meridian slope angle of each element (radians, negative on the dome).
    pub fn element_slopes(&self) -> Vec<f64> {
        self.x
            .windows(2)
            .zip(self.r.windows(2))
            .map(|(xs, rs)| (rs[1] - rs[0]).atan2(xs[1] - xs[0]))
            .collect()
    }

    /// Contour length where the dome passes `radius`. Radii at or above
    /// the cylinder map to the cylinder end.
    pub fn length_at_radius(&self, radius: f64) -> f64 {
        let (mut r, mut l): (Vec<f64>, Vec<f64>) = self.r[self.cylinder_end..]
            .iter()
            .cloned()
            .zip(self.l[self.cylinder_end..].iter().cloned())
            .unzip();
        r.reverse();
        l.reverse();
        interp(radius, &r, &l)
    }

    /// Outer surface after adding a layer with the given element thickness.
    pub fn offset(&self, element_thickness: &[f64]) -> MandrelNodes {
        let n = self.x.len();
        let node_thickness: Vec<f64> = (0..n)
            .map(|i| match (i.checked_sub(1).and_then(|j| element_thickness.get(j)), element_thickness.get(i)) {
                (Some(a), Some(b)) => 0.5 * (a + b),
                (Some(a), None) => *a,
                (None, Some(b)) => *b,
                (None, None) => 0.0,
            })
            .collect();
        let (mut x, mut r) = offset_nodes(&self.x, &self.r, &node_thickness);
        // the midpoint stays on the symmetry plane
        x[0] = self.x[0];
        make_monotone(&mut x, &mut r);
        MandrelNodes::new(x, r, self.cylinder_end)
    }
}

pub trait WindingEngine: Send + Sync {
    fn symmetric(&self) -> bool;

    fn layer_count(&self) -> usize;

    /// Append a layer and return its index. The layer is simulated on the
    /// next call to `run_winding_simulation`.
    fn add_layer(&mut self, angle: f64, shift: f64) -> usize;

    fn set_layer_angle(&mut self, k: usize, angle: f64) -> DesignResult<()>;

    fn set_hoop_layer_shift(&mut self, k: usize, shift: f64) -> DesignResult<()>;

    fn set_layer_friction(&mut self, k: usize, friction: f64) -> DesignResult<()>;

    /// Simulate layers 0..=through.
    fn run_winding_simulation(&mut self, through: usize) -> DesignResult<()>;

    fn polar_opening_radius(&self, k: usize, side: Side) -> f64;

    fn polar_opening_radius_band_middle(&self, k: usize, side: Side) -> f64;

    fn bare_mandrel(&self, side: Side) -> &MandrelNodes;

    /// Outer surface after layer k.
    fn mandrel_nodes(&self, k: usize, side: Side) -> &MandrelNodes;

    /// Thickness of layer k per element of the bare mandrel.
    fn layer_thickness(&self, k: usize, side: Side) -> &[f64];

    /// Local fibre angle of layer k per element (degrees).
    fn layer_angles(&self, k: usize, side: Side) -> &[f64];

    fn layer_angle(&self, k: usize) -> f64;

    fn layer_shift(&self, k: usize) -> f64;

    fn layer_friction(&self, k: usize) -> f64;

    fn band_width(&self, k: usize) -> f64;

    /// Fibre mass of layer k over the whole vessel (kg).
    fn layer_fibre_mass(&self, k: usize) -> f64;

    fn inner_clone(&self) -> Box<dyn WindingEngine>;
}

impl Clone for Box<dyn WindingEngine> {
    fn clone(&self) -> Self {
        self.inner_clone()
    }
}

impl fmt::Debug for dyn WindingEngine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "WindingEngine with {} layers", self.layer_count())
    }
}

/// Sides that carry distinct results.
pub fn sides(engine: &dyn WindingEngine) -> Vec<Side> {
    if engine.symmetric() {
        vec![Side::One]
    } else {
        vec![Side::One, Side::Two]
    }
}

/// The surface layer k is wound on.
pub fn winding_surface(engine: &dyn WindingEngine, k: usize, side: Side) -> &MandrelNodes {
    if k == 0 {
        engine.bare_mandrel(side)
    } else {
        engine.mandrel_nodes(k - 1, side)
    }
}

/// Polar opening of a helical layer used for the angle search: the band
/// middle polar opening moved half a band width along the winding surface.
pub fn effective_polar_opening(engine: &dyn WindingEngine, k: usize, side: Side) -> DesignResult<f64> {
    let surface = winding_surface(engine, k, side);
    let band_middle = engine.polar_opening_radius_band_middle(k, side);
    shift_on_contour(
        &surface.r,
        &surface.l,
        surface.r_cyl(),
        band_middle,
        0.5 * engine.band_width(k),
    )
}

/// Distance between the thickness maximum of helical layer k and its
/// turning zone, relative to the mandrel contour length.
pub fn thickness_peak_deviation(engine: &dyn WindingEngine, k: usize, side: Side) -> f64 {
    let surface = winding_surface(engine, k, side);
    let bare = engine.bare_mandrel(side);
    let positions = bare.element_positions();
    let peak = match argmax(engine.layer_thickness(k, side)) {
        Some((i, _)) => positions[i],
        None => return f64::INFINITY,
    };
    let expected_radius = engine.polar_opening_radius_band_middle(k, side) + 0.5 * engine.band_width(k);
    let expected = surface.length_at_radius(expected_radius);
    (peak - expected).abs() / surface.contour_length()
}

pub fn fibre_mass(engine: &dyn WindingEngine) -> f64 {
    (0..engine.layer_count()).map(|k| engine.layer_fibre_mass(k)).sum()
}

/// Mass (kg) of a layer over one vessel half from its element thickness.
pub fn half_layer_fibre_mass(
    bare: &MandrelNodes,
    thickness: &[f64],
    fibre_volume_fraction: f64,
    fibre_density: f64,
) -> f64 {
    let volume: f64 = bare
        .element_radii()
        .iter()
        .zip(bare.element_lengths())
        .zip(thickness)
        .map(|((r, dl), t)| 2.0 * PI * r * dl * t)
        .sum();
    // mm^3 * g/cm^3 -> kg
    volume * fibre_volume_fraction * fibre_density * 1e-6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cylinder_offset_grows_radius() {
        let nodes = MandrelNodes::new(vec![0.0, 10.0, 20.0], vec![100.0, 100.0, 100.0], 2);
        let outer = nodes.offset(&[1.0, 1.0]);
        assert!(outer.r.iter().all(|&r| (r - 101.0).abs() < 1e-12));
        assert!((outer.contour_length() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn length_at_radius_on_dome() {
        let x = vec![0.0, 10.0, 20.0, 30.0];
        let r = vec![100.0, 100.0, 90.0, 80.0];
        let nodes = MandrelNodes::new(x, r, 1);
        assert!((nodes.length_at_radius(150.0) - 10.0).abs() < 1e-12);
        let mid = nodes.length_at_radius(85.0);
        assert!(mid > nodes.l[2] && mid < nodes.l[3]);
    }

    #[test]
    fn cylinder_mass() {
        let nodes = MandrelNodes::new(vec![0.0, 100.0], vec![100.0, 100.0], 1);
        let mass = half_layer_fibre_mass(&nodes, &[1.0], 0.6, 1.8);
        let expected = 2.0 * PI * 100.0 * 100.0 * 0.6 * 1.8 * 1e-6;
        assert!((mass - expected).abs() < 1e-12);
    }
}
