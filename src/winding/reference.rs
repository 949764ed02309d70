//! Geodesic netting winding model.
//!
//! Helical layers follow Clairaut's relation r sin(a) = r_bm, so the band
//! middle turns at r_bm = R sin(a_cyl). Fibre conservation gives the
//! thickness t(r) = t_cyl R cos(a_cyl) / (r cos(a(r))) down to half a band
//! width outside the turning point. Closer in the band overlaps itself and
//! the thickness stays at that peak value down to the band middle; inside
//! the band middle the layer is empty.
//!
//! Hoop layers cover the cylinder up to the shifted edge with a linear
//! taper one band wide. Every layer grows the mandrel by its thickness
//! along the surface normal.

use log::debug;

use super::{half_layer_fibre_mass, MandrelNodes, WindingEngine};
use crate::contour::{Liner, Side};
use crate::error::{DesignError, DesignResult};
use crate::laminate::{Laminate, LayerKind, PlyTemplate};

/// Smallest band middle polar opening relative to the cylinder radius.
pub const MIN_RELATIVE_POLAR_OPENING: f64 = 0.01;

#[derive(Debug, Clone)]
struct LayerPlan {
    angle: f64,
    shift: f64,
    friction: f64,
}

impl LayerPlan {
    fn kind(&self) -> LayerKind {
        LayerKind::of_angle(self.angle)
    }
}

#[derive(Debug, Clone)]
struct LayerResult {
    outer: MandrelNodes,
    thickness: Vec<f64>,
    angles: Vec<f64>,
    polar_opening: f64,
    band_middle: f64,
}

impl LayerResult {
    // Placeholder for a layer that has not been simulated yet.
    fn unwound(surface: &MandrelNodes) -> LayerResult {
        let n = surface.element_count();
        LayerResult {
            outer: surface.clone(),
            thickness: vec![0.0; n],
            angles: vec![0.0; n],
            polar_opening: surface.polar_opening(),
            band_middle: surface.polar_opening(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceWinder {
    bare: Vec<MandrelNodes>,
    helical: PlyTemplate,
    hoop: PlyTemplate,
    layers: Vec<LayerPlan>,
    results: Vec<Vec<LayerResult>>,
    stale: Vec<bool>,
}

impl ReferenceWinder {
    /// Winder on the bare liner with about `dome_points` nodes per dome.
    pub fn new(liner: &Liner, dome_points: usize, helical: PlyTemplate, hoop: PlyTemplate) -> ReferenceWinder {
        let mut sides = vec![Side::One];
        if !liner.symmetric() {
            sides.push(Side::Two);
        }
        let bare = sides
            .iter()
            .map(|&side| {
                let (x, r, cylinder_end) = liner.meridian(side, dome_points);
                MandrelNodes::new(x, r, cylinder_end)
            })
            .collect();
        ReferenceWinder {
            bare,
            helical,
            hoop,
            layers: vec![],
            results: vec![],
            stale: vec![],
        }
    }

    /// Winder carrying the layers and templates of a laminate.
    pub fn from_laminate(liner: &Liner, dome_points: usize, laminate: &Laminate) -> ReferenceWinder {
        let mut winder = ReferenceWinder::new(
            liner,
            dome_points,
            laminate.template(LayerKind::Helical).clone(),
            laminate.template(LayerKind::Hoop).clone(),
        );
        for ply in laminate.plies() {
            let k = winder.add_layer(ply.angle, ply.hoop_shift);
            winder.layers[k].friction = ply.friction;
        }
        winder
    }

    fn side_index(&self, side: Side) -> usize {
        if self.bare.len() == 1 {
            0
        } else {
            side.index()
        }
    }

    fn template(&self, kind: LayerKind) -> &PlyTemplate {
        match kind {
            LayerKind::Helical => &self.helical,
            LayerKind::Hoop => &self.hoop,
        }
    }

    fn check_layer(&self, k: usize) -> DesignResult<()> {
        if k < self.layers.len() {
            Ok(())
        } else {
            Err(DesignError::Winding {
                layer: k,
                message: format!("only {} layers exist", self.layers.len()),
            })
        }
    }

    fn mark_stale(&mut self, k: usize) {
        for flag in self.stale.iter_mut().skip(k) {
            *flag = true;
        }
    }

    fn wind_helical(&self, k: usize, surface: &MandrelNodes) -> DesignResult<LayerResult> {
        let plan = &self.layers[k];
        let template = &self.helical;
        let band = template.band_width();
        let r_cyl = surface.r_cyl();
        let band_middle = r_cyl * plan.angle.to_radians().sin();

        if band_middle <= surface.polar_opening() {
            return Err(DesignError::Winding {
                layer: k,
                message: format!(
                    "band middle path at radius {:.3} crosses the mandrel polar opening {:.3}",
                    band_middle,
                    surface.polar_opening()
                ),
            });
        }
        if band_middle / r_cyl < MIN_RELATIVE_POLAR_OPENING {
            return Err(DesignError::Winding {
                layer: k,
                message: format!(
                    "polar opening {:.3} is too small for the cylinder radius {:.3}",
                    band_middle, r_cyl
                ),
            });
        }

        let edge = (band_middle - 0.5 * band).max(0.0);
        let peak = band_middle + 0.5 * band;
        let t_cyl = template.layer_thickness();
        let cos_cyl = plan.angle.to_radians().cos();
        let conserved = |r: f64| t_cyl * r_cyl * cos_cyl / (r * (1.0 - (band_middle / r).powi(2)).sqrt());
        let t_peak = conserved(peak);

        let radii = surface.element_radii();
        let mut thickness = Vec::with_capacity(radii.len());
        let mut angles = Vec::with_capacity(radii.len());
        for &r in &radii {
            let t = if r >= peak {
                conserved(r)
            } else if r >= band_middle {
                t_peak
            } else {
                0.0
            };
            if !t.is_finite() || t < 0.0 {
                return Err(DesignError::Winding {
                    layer: k,
                    message: format!("thickness integration diverged at radius {:.3}", r),
                });
            }
            thickness.push(t);
            angles.push(if r > band_middle {
                (band_middle / r).asin().to_degrees()
            } else {
                90.0
            });
        }

        Ok(LayerResult {
            outer: surface.offset(&thickness),
            thickness,
            angles,
            polar_opening: edge,
            band_middle,
        })
    }

    fn wind_hoop(&self, k: usize, surface: &MandrelNodes) -> DesignResult<LayerResult> {
        let plan = &self.layers[k];
        let template = &self.hoop;
        let band = template.band_width();
        let edge = surface.cylinder_end_length() + plan.shift;
        if edge <= 0.5 * band {
            return Err(DesignError::Winding {
                layer: k,
                message: format!("hoop layer with shift {:.3} covers less than one band", plan.shift),
            });
        }
        if edge > surface.contour_length() {
            return Err(DesignError::Winding {
                layer: k,
                message: format!("hoop layer with shift {:.3} runs past the polar opening", plan.shift),
            });
        }
        let t_layer = template.layer_thickness();
        let (full, end) = (edge - 0.5 * band, edge + 0.5 * band);
        let thickness: Vec<f64> = surface
            .element_positions()
            .iter()
            .map(|&l| {
                if l <= full {
                    t_layer
                } else if l < end {
                    t_layer * (end - l) / band
                } else {
                    0.0
                }
            })
            .collect();
        let angles = vec![90.0; thickness.len()];
        let radius = crate::numbers::interp(edge, &surface.l, &surface.r);
        Ok(LayerResult {
            outer: surface.offset(&thickness),
            thickness,
            angles,
            polar_opening: radius,
            band_middle: radius,
        })
    }
}

impl WindingEngine for ReferenceWinder {
    fn symmetric(&self) -> bool {
        self.bare.len() == 1
    }

    fn layer_count(&self) -> usize {
        self.layers.len()
    }

    fn add_layer(&mut self, angle: f64, shift: f64) -> usize {
        let plan = LayerPlan {
            angle,
            shift: if LayerKind::of_angle(angle) == LayerKind::Hoop { shift } else { 0.0 },
            friction: 0.0,
        };
        self.layers.push(plan);
        let placeholders: Vec<LayerResult> = (0..self.bare.len())
            .map(|i| {
                let surface = match self.results.last() {
                    Some(previous) => &previous[i].outer,
                    None => &self.bare[i],
                };
                LayerResult::unwound(surface)
            })
            .collect();
        self.results.push(placeholders);
        self.stale.push(true);
        self.layers.len() - 1
    }

    fn set_layer_angle(&mut self, k: usize, angle: f64) -> DesignResult<()> {
        self.check_layer(k)?;
        if (self.layers[k].angle - angle).abs() > 0.0 {
            self.layers[k].angle = angle;
            if self.layers[k].kind() == LayerKind::Helical {
                self.layers[k].shift = 0.0;
            }
            self.mark_stale(k);
        }
        Ok(())
    }

    fn set_hoop_layer_shift(&mut self, k: usize, shift: f64) -> DesignResult<()> {
        self.check_layer(k)?;
        if self.layers[k].kind() != LayerKind::Hoop {
            return Err(DesignError::Winding {
                layer: k,
                message: format!("layer with angle {} takes no hoop shift", self.layers[k].angle),
            });
        }
        if (self.layers[k].shift - shift).abs() > 0.0 {
            self.layers[k].shift = shift;
            self.mark_stale(k);
        }
        Ok(())
    }

    fn set_layer_friction(&mut self, k: usize, friction: f64) -> DesignResult<()> {
        self.check_layer(k)?;
        self.layers[k].friction = friction;
        self.mark_stale(k);
        Ok(())
    }

    fn run_winding_simulation(&mut self, through: usize) -> DesignResult<()> {
        self.check_layer(through)?;
        let first = match (0..=through).find(|&k| self.stale[k]) {
            Some(k) => k,
            None => return Ok(()),
        };
        for k in first..=through {
            let mut layer_results = Vec::with_capacity(self.bare.len());
            for i in 0..self.bare.len() {
                let surface = if k == 0 { &self.bare[i] } else { &self.results[k - 1][i].outer };
                let result = match self.layers[k].kind() {
                    LayerKind::Helical => self.wind_helical(k, surface)?,
                    LayerKind::Hoop => self.wind_hoop(k, surface)?,
                };
                layer_results.push(result);
            }
            self.results[k] = layer_results;
            self.stale[k] = false;
        }
        // outer layers sit on a changed surface now
        for flag in self.stale.iter_mut().skip(through + 1) {
            *flag = true;
        }
        debug!("wound layers {}..={}", first, through);
        Ok(())
    }

    fn polar_opening_radius(&self, k: usize, side: Side) -> f64 {
        self.results[k][self.side_index(side)].polar_opening
    }

    fn polar_opening_radius_band_middle(&self, k: usize, side: Side) -> f64 {
        self.results[k][self.side_index(side)].band_middle
    }

    fn bare_mandrel(&self, side: Side) -> &MandrelNodes {
        &self.bare[self.side_index(side)]
    }

    fn mandrel_nodes(&self, k: usize, side: Side) -> &MandrelNodes {
        &self.results[k][self.side_index(side)].outer
    }

    fn layer_thickness(&self, k: usize, side: Side) -> &[f64] {
        &self.results[k][self.side_index(side)].thickness
    }

    fn layer_angles(&self, k: usize, side: Side) -> &[f64] {
        &self.results[k][self.side_index(side)].angles
    }

    fn layer_angle(&self, k: usize) -> f64 {
        self.layers[k].angle
    }

    fn layer_shift(&self, k: usize) -> f64 {
        self.layers[k].shift
    }

    fn layer_friction(&self, k: usize) -> f64 {
        self.layers[k].friction
    }

    fn band_width(&self, k: usize) -> f64 {
        self.template(self.layers[k].kind()).band_width()
    }

    fn layer_fibre_mass(&self, k: usize) -> f64 {
        let template = self.template(self.layers[k].kind());
        let fvf = template.fibre_volume_fraction();
        let halves: f64 = self
            .bare
            .iter()
            .zip(&self.results[k])
            .map(|(bare, result)| half_layer_fibre_mass(bare, &result.thickness, fvf, template.fibre_density))
            .sum();
        if self.symmetric() {
            2.0 * halves
        } else {
            halves
        }
    }

    fn inner_clone(&self) -> Box<dyn WindingEngine> {
        Box::new(self.clone())
    }
}
