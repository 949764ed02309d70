//! Ply and laminate model with classical lamination theory stiffness.
//!
//! Angles are in degrees measured from the meridian. A wound layer is a
//! pair of plies (+angle/-angle for helical layers, two passes for hoop
//! layers), so its thickness is twice the single ply thickness.

use std::sync::Arc;

use log::warn;
use nalgebra::{Matrix3, SMatrix};

use crate::error::{DesignError, DesignResult};
use crate::material::Material;

pub type Matrix6 = SMatrix<f64, 6, 6>;

/// Plies steeper than this are hoop plies.
pub const HOOP_ANGLE_LIMIT: f64 = 89.0;

pub const FVF_RANGE: (f64, f64) = (0.5, 0.7);

/// Roving and thickness data shared by all plies of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct PlyTemplate {
    /// single ply thickness (mm)
    pub thickness: f64,
    /// width of one roving (mm)
    pub roving_width: f64,
    pub rovings: usize,
    /// fibre linear density (g/km)
    pub tex: f64,
    /// fibre density (g/cm^3)
    pub fibre_density: f64,
}

impl PlyTemplate {
    pub fn band_width(&self) -> f64 {
        self.roving_width * self.rovings as f64
    }

    pub fn fibre_volume_fraction(&self) -> f64 {
        self.tex / (1000.0 * self.fibre_density * self.roving_width * self.thickness)
    }

    pub fn layer_thickness(&self) -> f64 {
        2.0 * self.thickness
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Helical,
    Hoop,
}

impl LayerKind {
    pub fn of_angle(angle: f64) -> LayerKind {
        if angle > HOOP_ANGLE_LIMIT {
            LayerKind::Hoop
        } else {
            LayerKind::Helical
        }
    }
}

#[derive(Debug, Clone)]
pub struct Ply {
    pub angle: f64,
    /// Hoop layer edge shift from the cylinder end, zero for helical plies.
    pub hoop_shift: f64,
    pub friction: f64,
    pub template: PlyTemplate,
    pub material: Arc<Material>,
}

impl Ply {
    pub fn kind(&self) -> LayerKind {
        LayerKind::of_angle(self.angle)
    }

    pub fn is_hoop(&self) -> bool {
        self.kind() == LayerKind::Hoop
    }
}

/// Reduced stiffness rotated by `angle` degrees.
pub fn transformed_stiffness(q: &Matrix3<f64>, angle: f64) -> Matrix3<f64> {
    let (n, m) = angle.to_radians().sin_cos();
    let (m2, n2) = (m * m, n * n);
    let (q11, q12, q22, q66) = (q[(0, 0)], q[(0, 1)], q[(1, 1)], q[(2, 2)]);

    let qb11 = q11 * m2 * m2 + 2.0 * (q12 + 2.0 * q66) * m2 * n2 + q22 * n2 * n2;
    let qb22 = q11 * n2 * n2 + 2.0 * (q12 + 2.0 * q66) * m2 * n2 + q22 * m2 * m2;
    let qb12 = (q11 + q22 - 4.0 * q66) * m2 * n2 + q12 * (m2 * m2 + n2 * n2);
    let qb66 = (q11 + q22 - 2.0 * q12 - 2.0 * q66) * m2 * n2 + q66 * (m2 * m2 + n2 * n2);
    let qb16 = (q11 - q12 - 2.0 * q66) * m2 * m * n + (q12 - q22 + 2.0 * q66) * m * n2 * n;
    let qb26 = (q11 - q12 - 2.0 * q66) * m * n2 * n + (q12 - q22 + 2.0 * q66) * m2 * m * n;

    Matrix3::new(qb11, qb12, qb16, qb12, qb22, qb26, qb16, qb26, qb66)
}

/// Smeared stiffness of a balanced +angle/-angle pair.
pub fn balanced_stiffness(q: &Matrix3<f64>, angle: f64) -> Matrix3<f64> {
    let mut qb = transformed_stiffness(q, angle);
    qb[(0, 2)] = 0.0;
    qb[(2, 0)] = 0.0;
    qb[(1, 2)] = 0.0;
    qb[(2, 1)] = 0.0;
    qb
}

/// ABD matrix of a stack given innermost first as (stiffness, thickness).
/// z is measured from the mid surface.
pub fn abd(stack: &[(Matrix3<f64>, f64)]) -> Matrix6 {
    let total: f64 = stack.iter().map(|(_, t)| t).sum();
    let mut a = Matrix3::zeros();
    let mut b = Matrix3::zeros();
    let mut d = Matrix3::zeros();
    let mut z0 = -0.5 * total;
    for (qb, t) in stack {
        let z1 = z0 + t;
        a += qb * (z1 - z0);
        b += qb * (0.5 * (z1 * z1 - z0 * z0));
        d += qb * ((z1.powi(3) - z0.powi(3)) / 3.0);
        z0 = z1;
    }
    let mut result = Matrix6::zeros();
    result.fixed_view_mut::<3, 3>(0, 0).copy_from(&a);
    result.fixed_view_mut::<3, 3>(0, 3).copy_from(&b);
    result.fixed_view_mut::<3, 3>(3, 0).copy_from(&b);
    result.fixed_view_mut::<3, 3>(3, 3).copy_from(&d);
    result
}

/// Check both templates against the admissible fibre volume range and
/// against each other. Each finding is logged and returned.
pub fn fibre_volume_warnings(helical: &PlyTemplate, hoop: &PlyTemplate) -> Vec<String> {
    let mut warnings = Vec::new();
    let fvf_helical = helical.fibre_volume_fraction();
    let fvf_hoop = hoop.fibre_volume_fraction();
    for (label, fvf) in [("helical", fvf_helical), ("hoop", fvf_hoop)].iter() {
        if *fvf < FVF_RANGE.0 || *fvf > FVF_RANGE.1 {
            warnings.push(format!(
                "fibre volume fraction of the {} plies is {:.2}, outside [{}, {}]",
                label, fvf, FVF_RANGE.0, FVF_RANGE.1
            ));
        }
    }
    if (fvf_hoop - fvf_helical).abs() > 0.05 * fvf_helical.max(fvf_hoop) {
        warnings.push(format!(
            "fibre volume fractions of hoop ({:.2}) and helical ({:.2}) plies differ by more than 5%",
            fvf_hoop, fvf_helical
        ));
    }
    for w in &warnings {
        warn!("***Warning: {}", w);
    }
    warnings
}

#[derive(Debug, Clone)]
pub struct Laminate {
    material: Arc<Material>,
    helical: PlyTemplate,
    hoop: PlyTemplate,
    plies: Vec<Ply>,
    abd_cache: Option<Matrix6>,
    warnings: Vec<String>,
}

impl Laminate {
    pub fn new(material: Arc<Material>, helical: PlyTemplate, hoop: PlyTemplate) -> Laminate {
        let warnings = fibre_volume_warnings(&helical, &hoop);
        Laminate {
            material,
            helical,
            hoop,
            plies: vec![],
            abd_cache: None,
            warnings,
        }
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn template(&self, kind: LayerKind) -> &PlyTemplate {
        match kind {
            LayerKind::Helical => &self.helical,
            LayerKind::Hoop => &self.hoop,
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn plies(&self) -> &[Ply] {
        &self.plies
    }

    pub fn len(&self) -> usize {
        self.plies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plies.is_empty()
    }

    /// Append a layer and return its index.
    pub fn append(&mut self, angle: f64, shift: f64) -> usize {
        let kind = LayerKind::of_angle(angle);
        self.plies.push(Ply {
            angle,
            hoop_shift: if kind == LayerKind::Hoop { shift } else { 0.0 },
            friction: 0.0,
            template: self.template(kind).clone(),
            material: self.material.clone(),
        });
        self.abd_cache = None;
        self.plies.len() - 1
    }

    fn ply_mut(&mut self, k: usize) -> DesignResult<&mut Ply> {
        let n = self.plies.len();
        self.abd_cache = None;
        self.plies
            .get_mut(k)
            .ok_or_else(|| DesignError::Configuration(format!("layer {} does not exist ({} layers)", k, n)))
    }

    /// Set the winding angle. A change between helical and hoop also
    /// switches the ply template.
    pub fn set_angle(&mut self, k: usize, angle: f64) -> DesignResult<()> {
        let template = self.template(LayerKind::of_angle(angle)).clone();
        let ply = self.ply_mut(k)?;
        ply.angle = angle;
        ply.template = template;
        if !ply.is_hoop() {
            ply.hoop_shift = 0.0;
        }
        Ok(())
    }

    pub fn set_hoop_shift(&mut self, k: usize, shift: f64) -> DesignResult<()> {
        let ply = self.ply_mut(k)?;
        if !ply.is_hoop() {
            return Err(DesignError::Configuration(format!(
                "layer {} with angle {} is not a hoop layer",
                k, ply.angle
            )));
        }
        ply.hoop_shift = shift;
        Ok(())
    }

    pub fn set_friction(&mut self, k: usize, friction: f64) -> DesignResult<()> {
        self.ply_mut(k)?.friction = friction;
        Ok(())
    }

    pub fn angles_shifts(&self) -> Vec<(f64, f64)> {
        self.plies.iter().map(|p| (p.angle, p.hoop_shift)).collect()
    }

    /// Nominal laminate thickness on the cylinder.
    pub fn thickness(&self) -> f64 {
        self.plies.iter().map(|p| p.template.layer_thickness()).sum()
    }

    /// ABD matrix of the nominal cylinder laminate.
    pub fn abd(&mut self) -> Matrix6 {
        if let Some(abd) = self.abd_cache {
            return abd;
        }
        let q = self.material.reduced_stiffness();
        let stack: Vec<(Matrix3<f64>, f64)> = self
            .plies
            .iter()
            .map(|p| (balanced_stiffness(&q, p.angle), p.template.layer_thickness()))
            .collect();
        let result = abd(&stack);
        self.abd_cache = Some(result);
        result
    }

    pub fn count(&self, kind: LayerKind) -> usize {
        self.plies.iter().filter(|p| p.kind() == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(thickness: f64) -> PlyTemplate {
        PlyTemplate {
            thickness,
            roving_width: 8.0,
            rovings: 1,
            tex: 800.0,
            fibre_density: 1.78,
        }
    }

    #[test]
    fn identical_hoop_plies_have_no_shear_coupling() {
        let mut laminate = Laminate::new(Arc::new(Material::default()), template(0.09), template(0.09));
        for _ in 0..4 {
            laminate.append(90.0, 0.0);
        }
        let abd = laminate.abd();
        assert!(abd[(0, 2)].abs() < 1e-12);
        assert!(abd[(1, 2)].abs() < 1e-12);
        // symmetric stack
        assert!(abd.fixed_view::<3, 3>(0, 3).norm() < 1e-6);
    }

    #[test]
    fn transformed_stiffness_at_zero_and_ninety() {
        let q = Material::default().reduced_stiffness();
        let q0 = transformed_stiffness(&q, 0.0);
        assert!((q0 - q).norm() < 1e-6);
        let q90 = transformed_stiffness(&q, 90.0);
        assert!((q90[(0, 0)] - q[(1, 1)]).abs() < 1e-6);
        assert!((q90[(1, 1)] - q[(0, 0)]).abs() < 1e-6);
        assert!(q90[(0, 2)].abs() < 1e-6);
    }

    #[test]
    fn hoop_on_helical_couples_bending() {
        let mut laminate = Laminate::new(Arc::new(Material::default()), template(0.09), template(0.09));
        laminate.append(20.0, 0.0);
        let before = laminate.abd();
        laminate.append(90.0, 10.0);
        let after = laminate.abd();
        assert!(after[(0, 0)] > before[(0, 0)]);
        assert!(after.fixed_view::<3, 3>(0, 3).norm() > 1.0);
    }

    #[test]
    fn fibre_volume_fraction_warning() {
        let helical = template(0.5);
        let hoop = template(0.05);
        assert!((hoop.fibre_volume_fraction() - 1.1236).abs() < 1e-3);
        let warnings = fibre_volume_warnings(&helical, &hoop);
        assert!(warnings.iter().any(|w| w.contains("1.12")));
        assert!(warnings.iter().any(|w| w.contains("differ")));
    }

    #[test]
    fn setting_shift_on_helical_layer_fails() {
        let mut laminate = Laminate::new(Arc::new(Material::default()), template(0.09), template(0.09));
        let k = laminate.append(15.0, 0.0);
        assert!(laminate.set_hoop_shift(k, 3.0).is_err());
        laminate.set_angle(k, 90.0).unwrap();
        laminate.set_hoop_shift(k, 3.0).unwrap();
        assert_eq!(laminate.angles_shifts(), vec![(90.0, 3.0)]);
        assert!(laminate.set_angle(5, 10.0).is_err());
    }
}
