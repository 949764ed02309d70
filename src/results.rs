//! Results of a finished design.
//!
//! Masses, volume and hydrogen capacity of the wound vessel plus the
//! tables and plots written into the run directory.

use std::path::Path;

use log::info;

use crate::contour::{Liner, Side};
use crate::design::LayerDesign;
use crate::error::DesignResult;
use crate::evaluate::{element_radii, Criterion, FailureField};
use crate::hydrogen;
use crate::io::{write_columns, write_table};
use crate::laminate::{Laminate, LayerKind, PlyTemplate};
use crate::metal::MetalTank;
use crate::plot;
use crate::winding::{sides, WindingEngine};

/// Where the stored hydrogen mass comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum HydrogenMass {
    Given(f64),
    /// filled at `pressure` (MPa) and `temperature` (K) up to `max_fill`
    /// of the inner volume
    Stored {
        pressure: f64,
        temperature: f64,
        max_fill: f64,
    },
}

impl HydrogenMass {
    /// Mass (kg) held in `volume` (mm^3).
    pub fn mass(&self, volume: f64) -> DesignResult<f64> {
        match *self {
            HydrogenMass::Given(mass) => Ok(mass),
            HydrogenMass::Stored {
                pressure,
                temperature,
                max_fill,
            } => hydrogen::stored_mass(pressure, temperature, volume, max_fill),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultInputs {
    pub liner_thickness: f64,
    /// g/cm^3
    pub liner_density: f64,
    pub hydrogen: HydrogenMass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VesselResults {
    pub layers: usize,
    pub helical_layers: usize,
    pub hoop_layers: usize,
    /// composite thickness on the cylinder (mm)
    pub cylinder_thickness: f64,
    pub outer_diameter: f64,
    /// kg
    pub fibre_mass: f64,
    pub composite_mass: f64,
    pub liner_mass: f64,
    pub total_mass: f64,
    /// inner volume (mm^3)
    pub volume: f64,
    /// liner surface (mm^2)
    pub area: f64,
    pub puck_max: f64,
    pub reserve_factor: f64,
    /// largest fibre stress in hoop plies over the largest in helical
    /// plies on the cylinder
    pub cylinder_stress_ratio: Option<f64>,
    pub hydrogen_mass: f64,
    pub gravimetric_index: f64,
}

impl VesselResults {
    pub fn entries(&self) -> Vec<(String, String)> {
        let ratio = self
            .cylinder_stress_ratio
            .map(|r| format!("{:.4}", r))
            .unwrap_or_else(|| "-".to_string());
        vec![
            ("numberOfLayers".to_string(), self.layers.to_string()),
            ("numberOfHelicalLayers".to_string(), self.helical_layers.to_string()),
            ("numberOfHoopLayers".to_string(), self.hoop_layers.to_string()),
            ("cylinderThickness [mm]".to_string(), format!("{:.4}", self.cylinder_thickness)),
            ("outerDiameter [mm]".to_string(), format!("{:.3}", self.outer_diameter)),
            ("fibreMass [kg]".to_string(), format!("{:.4}", self.fibre_mass)),
            ("compositeMass [kg]".to_string(), format!("{:.4}", self.composite_mass)),
            ("linerMass [kg]".to_string(), format!("{:.4}", self.liner_mass)),
            ("totalMass [kg]".to_string(), format!("{:.4}", self.total_mass)),
            ("volume [dm^3]".to_string(), format!("{:.4}", self.volume * 1e-6)),
            ("area [m^2]".to_string(), format!("{:.4}", self.area * 1e-6)),
            ("puckMax".to_string(), format!("{:.4}", self.puck_max)),
            ("reserveFactor".to_string(), format!("{:.4}", self.reserve_factor)),
            ("cylinderStressRatio".to_string(), ratio),
            ("h2Mass [kg]".to_string(), format!("{:.4}", self.hydrogen_mass)),
            ("gravimetricIndex".to_string(), format!("{:.4}", self.gravimetric_index)),
        ]
    }
}

/// Report lines of a metal tank.
pub fn metal_entries(tank: &MetalTank, hydrogen_mass: f64) -> Vec<(String, String)> {
    vec![
        ("cylinderThickness [mm]".to_string(), format!("{:.4}", tank.cylinder_thickness)),
        ("domeThickness [mm]".to_string(), format!("{:.4}", tank.dome_thickness[0])),
        ("dome2Thickness [mm]".to_string(), format!("{:.4}", tank.dome_thickness[1])),
        ("outerDiameter [mm]".to_string(), format!("{:.3}", tank.outer_diameter)),
        ("outerLength [mm]".to_string(), format!("{:.3}", tank.outer_length)),
        ("totalMass [kg]".to_string(), format!("{:.4}", tank.mass)),
        ("volume [dm^3]".to_string(), format!("{:.4}", tank.inner_volume * 1e-6)),
        ("h2Mass [kg]".to_string(), format!("{:.4}", hydrogen_mass)),
        (
            "gravimetricIndex".to_string(),
            format!("{:.4}", hydrogen::gravimetric_index(hydrogen_mass, tank.mass)),
        ),
    ]
}

/// Fibre mass over composite mass of a ply.
pub fn fibre_mass_fraction(template: &PlyTemplate, resin_density: f64) -> f64 {
    let fibre = template.fibre_volume_fraction() * template.fibre_density;
    let resin = (1.0 - template.fibre_volume_fraction()) * resin_density;
    fibre / (fibre + resin)
}

fn composite_mass(engine: &dyn WindingEngine, laminate: &Laminate) -> f64 {
    let resin_density = laminate.material().resin_density;
    laminate
        .plies()
        .iter()
        .enumerate()
        .map(|(k, ply)| engine.layer_fibre_mass(k) / fibre_mass_fraction(&ply.template, resin_density))
        .sum()
}

fn cylinder_stress_ratio(engine: &dyn WindingEngine, laminate: &Laminate, field: &FailureField) -> Option<f64> {
    let r_cyl = engine.bare_mandrel(Side::One).r_cyl();
    let mut hoop_max = f64::NEG_INFINITY;
    let mut helical_max = f64::NEG_INFINITY;
    for (radius, row) in element_radii(engine).iter().zip(&field.results.s11) {
        if *radius < r_cyl * (1.0 - 1e-9) {
            continue;
        }
        for (ply, &s11) in laminate.plies().iter().zip(row) {
            if ply.is_hoop() {
                hoop_max = hoop_max.max(s11);
            } else {
                helical_max = helical_max.max(s11);
            }
        }
    }
    if hoop_max.is_finite() && helical_max > 0.0 {
        Some(hoop_max / helical_max)
    } else {
        None
    }
}

/// Evaluate the final laminate and collect the vessel figures. `liner`
/// is the outer liner surface the composite is wound on.
pub fn summarise(
    design: &LayerDesign,
    liner: &Liner,
    inputs: &ResultInputs,
) -> DesignResult<(VesselResults, FailureField)> {
    let engine = design.engine();
    let laminate = design.laminate();
    let criterion = design.settings().criterion;
    let field = design.evaluate(None)?;
    let puck_max = field.peak(criterion).value;

    let inner = liner.resized(-inputs.liner_thickness)?;
    let volume = inner.volume();
    let liner_mass = (liner.volume() - volume) * inputs.liner_density * 1e-6;
    let fibre_mass = crate::winding::fibre_mass(engine);
    let composite_mass = composite_mass(engine, laminate);
    let total_mass = composite_mass + liner_mass;
    let hydrogen_mass = inputs.hydrogen.mass(volume)?;

    let outer = match engine.layer_count() {
        0 => engine.bare_mandrel(Side::One),
        n => engine.mandrel_nodes(n - 1, Side::One),
    };
    let results = VesselResults {
        layers: laminate.len(),
        helical_layers: laminate.count(LayerKind::Helical),
        hoop_layers: laminate.count(LayerKind::Hoop),
        cylinder_thickness: outer.r_cyl() - engine.bare_mandrel(Side::One).r_cyl(),
        outer_diameter: 2.0 * outer.r_cyl(),
        fibre_mass,
        composite_mass,
        liner_mass,
        total_mass,
        volume,
        area: liner.area(),
        puck_max,
        reserve_factor: if puck_max > 0.0 { 1.0 / puck_max } else { f64::INFINITY },
        cylinder_stress_ratio: cylinder_stress_ratio(engine, laminate, &field),
        hydrogen_mass,
        gravimetric_index: hydrogen::gravimetric_index(hydrogen_mass, total_mass),
    };
    info!(
        "final laminate: {} layers, {:.4} kg composite, max {} {:.4}",
        results.layers, composite_mass, criterion, puck_max
    );
    Ok((results, field))
}

/// Per element values of every distinct side in evaluation order. Side
/// one of an unsymmetric vessel is reversed; with `negate_first` its
/// values change sign too, which turns contour positions into a
/// coordinate running from one polar opening to the other.
fn in_evaluation_order<F>(engine: &dyn WindingEngine, values: F, negate_first: bool) -> Vec<f64>
where
    F: Fn(Side) -> Vec<f64>,
{
    let mut all = Vec::new();
    for side in sides(engine) {
        let v = values(side);
        if side == Side::One && !engine.symmetric() {
            let sign = if negate_first { -1.0 } else { 1.0 };
            all.extend(v.into_iter().rev().map(|x| sign * x));
        } else {
            all.extend(v);
        }
    }
    all
}

pub fn element_positions(engine: &dyn WindingEngine) -> Vec<f64> {
    in_evaluation_order(engine, |side| engine.bare_mandrel(side).element_positions(), true)
}

/// Total wound thickness per element in evaluation order.
pub fn element_thickness(engine: &dyn WindingEngine) -> Vec<f64> {
    in_evaluation_order(
        engine,
        |side| {
            let n = engine.bare_mandrel(side).element_count();
            (0..engine.layer_count()).fold(vec![0.0; n], |mut total, k| {
                for (t, layer) in total.iter_mut().zip(engine.layer_thickness(k, side)) {
                    *t += layer;
                }
                total
            })
        },
        false,
    )
}

pub const ELEMENTAL_HEADER: [&str; 12] = [
    "element",
    "position",
    "radius",
    "thickness",
    "ffMax",
    "iffMax",
    "epsAxialBot",
    "epsAxialTop",
    "epsCircBot",
    "epsCircTop",
    "strainDiffAxial",
    "strainDiffCirc",
];

pub fn elemental_rows(engine: &dyn WindingEngine, field: &FailureField) -> Vec<Vec<f64>> {
    let positions = element_positions(engine);
    let radii = element_radii(engine);
    let thickness = element_thickness(engine);
    let ff = field.element_max(Criterion::FibreFailure);
    let iff = field.element_max(Criterion::InterFibreFailure);
    let r = &field.results;
    (0..field.element_count())
        .map(|i| {
            vec![
                i as f64,
                positions[i],
                radii[i],
                thickness[i],
                ff[i],
                iff[i],
                r.eps_axial_bot[i],
                r.eps_axial_top[i],
                r.eps_circ_bot[i],
                r.eps_circ_top[i],
                field.strain_diff_axial[i],
                field.strain_diff_circ[i],
            ]
        })
        .collect()
}

pub const NODAL_HEADER: [&str; 6] = ["side", "x", "r", "l", "xOuter", "rOuter"];

pub fn nodal_rows(engine: &dyn WindingEngine) -> Vec<Vec<f64>> {
    let mut rows = Vec::new();
    for side in sides(engine) {
        let bare = engine.bare_mandrel(side);
        let outer = match engine.layer_count() {
            0 => bare,
            n => engine.mandrel_nodes(n - 1, side),
        };
        for i in 0..bare.x.len() {
            rows.push(vec![
                (side.index() + 1) as f64,
                bare.x[i],
                bare.r[i],
                bare.l[i],
                outer.x[i],
                outer.r[i],
            ]);
        }
    }
    rows
}

pub const LAYER_BOOK_HEADER: [&str; 8] = [
    "layer",
    "angle",
    "hoopShift1",
    "hoopShift2",
    "plyThickness",
    "layerThickness",
    "polarOpening",
    "vesselDiameter",
];

/// One row per layer: angle, hoop shifts of both sides, single ply and
/// wound layer thickness on the cylinder, polar opening radius and the
/// vessel diameter after the layer.
pub fn layer_book_rows(engine: &dyn WindingEngine, laminate: &Laminate) -> Vec<Vec<f64>> {
    let other = if engine.symmetric() { Side::One } else { Side::Two };
    laminate
        .plies()
        .iter()
        .enumerate()
        .map(|(k, ply)| {
            let shift = if ply.is_hoop() { engine.layer_shift(k) } else { 0.0 };
            vec![
                k as f64,
                ply.angle,
                // hoop shifts act on both domes alike
                shift,
                shift,
                ply.template.thickness,
                engine.layer_thickness(k, Side::One).first().cloned().unwrap_or(0.0),
                engine
                    .polar_opening_radius(k, Side::One)
                    .max(engine.polar_opening_radius(k, other)),
                2.0 * engine.mandrel_nodes(k, Side::One).r_cyl(),
            ]
        })
        .collect()
}

/// Write the result tables, and the plots when `plots` is set, into `dir`.
pub fn write_artifacts(
    dir: &Path,
    design: &LayerDesign,
    field: &FailureField,
    liner: &Liner,
    plots: bool,
) -> DesignResult<()> {
    let engine = design.engine();
    write_table(&dir.join("nodalResults.csv"), &NODAL_HEADER, &nodal_rows(engine))?;
    write_table(&dir.join("elementalResults.csv"), &ELEMENTAL_HEADER, &elemental_rows(engine, field))?;
    write_columns(
        &dir.join("layerBook.txt"),
        &LAYER_BOOK_HEADER,
        &layer_book_rows(engine, design.laminate()),
    )?;
    if plots {
        let criterion = design.settings().criterion;
        plot::puck_exposure(
            &dir.join("puckExposure.svg"),
            &element_positions(engine),
            field.exposure(criterion),
            &criterion.to_string(),
        )?;
        let mut contours = vec![liner.full_contour()];
        if engine.layer_count() > 0 {
            contours.push(outer_contour(engine));
        }
        plot::contour(&dir.join("contour.svg"), &contours)?;
    }
    Ok(())
}

/// Outer surface of the wound vessel along the axis, side two mirrored.
fn outer_contour(engine: &dyn WindingEngine) -> (Vec<f64>, Vec<f64>) {
    let last = engine.layer_count() - 1;
    let one = engine.mandrel_nodes(last, Side::One);
    let two = engine.mandrel_nodes(last, if engine.symmetric() { Side::One } else { Side::Two });
    let mut x: Vec<f64> = two.x.iter().rev().map(|x| -x).collect();
    let mut r: Vec<f64> = two.r.iter().rev().cloned().collect();
    x.extend(one.x.iter().cloned());
    r.extend(one.r.iter().cloned());
    (x, r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(thickness: f64) -> PlyTemplate {
        PlyTemplate {
            thickness,
            roving_width: 3.175,
            rovings: 4,
            tex: 446.0,
            fibre_density: 1.78,
        }
    }

    #[test]
    fn mass_fraction_of_pure_fibre_is_one() {
        // tex chosen so the fibre volume fraction is exactly one
        let t = PlyTemplate {
            thickness: 0.1,
            roving_width: 1.0,
            rovings: 1,
            tex: 178.0,
            fibre_density: 1.78,
        };
        assert!((fibre_mass_fraction(&t, 1.2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mass_fraction_above_volume_fraction() {
        let t = template(0.125);
        let phi = t.fibre_volume_fraction();
        let fraction = fibre_mass_fraction(&t, 1.17);
        assert!(fraction > phi && fraction < 1.0);
    }

    #[test]
    fn given_hydrogen_mass() {
        assert_eq!(HydrogenMass::Given(5.6).mass(1e9).unwrap(), 5.6);
        let stored = HydrogenMass::Stored {
            pressure: 70.0,
            temperature: 288.15,
            max_fill: 1.0,
        };
        assert!((stored.mass(1e9).unwrap() - hydrogen::density(70.0, 288.15).unwrap()).abs() < 1e-9);
    }
}
