#![allow(clippy::unreadable_literal)]

//! Orthotropic ply materials with Puck failure parameters.
//!
//! Units are MPa for stiffness and strength, g/cm^3 for densities.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::{DesignError, DesignResult};

pub static DEFAULT_MATERIAL: &str = "CFRP_HyPo_T700";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strength {
    #[serde(rename = "R1t")]
    pub r1t: f64,
    #[serde(rename = "R1c")]
    pub r1c: f64,
    #[serde(rename = "R2t")]
    pub r2t: f64,
    #[serde(rename = "R2c")]
    pub r2c: f64,
    #[serde(rename = "R21")]
    pub r21: f64,
}

/// Inclination parameters of the Puck fracture envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuckParameters {
    pub p21_plus: f64,
    pub p21_minus: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "E1")]
    pub e1: f64,
    #[serde(rename = "E2")]
    pub e2: f64,
    pub nu12: f64,
    #[serde(rename = "G12")]
    pub g12: f64,
    pub strength: Strength,
    pub puck: PuckParameters,
    pub fibre_density: f64,
    #[serde(default = "default_resin_density")]
    pub resin_density: f64,
}

fn default_resin_density() -> f64 {
    1.17
}

impl Default for Material {
    fn default() -> Self {
        MATERIALS[DEFAULT_MATERIAL].clone()
    }
}

impl Material {
    pub fn nu21(&self) -> f64 {
        self.nu12 * self.e2 / self.e1
    }

    /// Reduced in-plane stiffness in the ply axes.
    pub fn reduced_stiffness(&self) -> Matrix3<f64> {
        let denom = 1.0 - self.nu12 * self.nu21();
        let q11 = self.e1 / denom;
        let q22 = self.e2 / denom;
        let q12 = self.nu12 * self.e2 / denom;
        Matrix3::new(q11, q12, 0.0, q12, q22, 0.0, 0.0, 0.0, self.g12)
    }

    pub fn check(&self) -> DesignResult<()> {
        let positive = [
            ("E1", self.e1),
            ("E2", self.e2),
            ("G12", self.g12),
            ("R1t", self.strength.r1t),
            ("R1c", self.strength.r1c),
            ("R2t", self.strength.r2t),
            ("R2c", self.strength.r2c),
            ("R21", self.strength.r21),
            ("fibreDensity", self.fibre_density),
        ];
        for (label, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(DesignError::Configuration(format!(
                    "material '{}' needs a positive {} but has {}",
                    self.name, label, value
                )));
            }
        }
        if self.nu12 * self.nu21() >= 1.0 {
            return Err(DesignError::Configuration(format!(
                "material '{}' has inadmissible Poisson ratios",
                self.name
            )));
        }
        Ok(())
    }

    /// Read a material description from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> DesignResult<Material> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut material: Material = serde_json::from_reader(reader)?;
        if material.name.is_empty() {
            material.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
        }
        material.check()?;
        Ok(material)
    }
}

/// Look up a material by its database name or load it from a `.json` file.
pub fn get_material(name: &str) -> DesignResult<Material> {
    if name.ends_with(".json") {
        return Material::from_file(name);
    }
    MATERIALS.get(name).cloned().ok_or_else(|| {
        DesignError::Configuration(format!(
            "unknown material '{}'. Use --list to see the available materials",
            name
        ))
    })
}

pub fn material_names() -> Vec<&'static str> {
    MATERIALS.keys().cloned().collect()
}

lazy_static! {
    pub static ref MATERIALS: BTreeMap<&'static str, Material> = {
        let mut materials = BTreeMap::new();

        let mut name = "CFRP_HyPo_T700";
        materials.insert(
            name,
            Material {
                name: name.to_string(),
                e1: 130000.0,
                e2: 8300.0,
                nu12: 0.3,
                g12: 4400.0,
                strength: Strength { r1t: 2200.0, r1c: 1200.0, r2t: 50.0, r2c: 180.0, r21: 80.0 },
                puck: PuckParameters { p21_plus: 0.3, p21_minus: 0.25 },
                fibre_density: 1.80,
                resin_density: 1.17,
            },
        );

        name = "CFRP_T700SC_LY556";
        materials.insert(
            name,
            Material {
                name: name.to_string(),
                e1: 126000.0,
                e2: 8400.0,
                nu12: 0.31,
                g12: 4200.0,
                strength: Strength { r1t: 2100.0, r1c: 1150.0, r2t: 48.0, r2c: 170.0, r21: 75.0 },
                puck: PuckParameters { p21_plus: 0.3, p21_minus: 0.25 },
                fibre_density: 1.80,
                resin_density: 1.17,
            },
        );

        name = "CFRP_T300_914C";
        materials.insert(
            name,
            Material {
                name: name.to_string(),
                e1: 138000.0,
                e2: 11000.0,
                nu12: 0.28,
                g12: 5500.0,
                strength: Strength { r1t: 1500.0, r1c: 900.0, r2t: 27.0, r2c: 200.0, r21: 80.0 },
                puck: PuckParameters { p21_plus: 0.35, p21_minus: 0.3 },
                fibre_density: 1.76,
                resin_density: 1.23,
            },
        );

        name = "GFRP_EGlass_LY556";
        materials.insert(
            name,
            Material {
                name: name.to_string(),
                e1: 53480.0,
                e2: 17700.0,
                nu12: 0.278,
                g12: 5830.0,
                strength: Strength { r1t: 1140.0, r1c: 570.0, r2t: 35.0, r2c: 114.0, r21: 72.0 },
                puck: PuckParameters { p21_plus: 0.3, p21_minus: 0.25 },
                fibre_density: 2.60,
                resin_density: 1.17,
            },
        );

        materials
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempdir::TempDir;

    #[test]
    fn database_entries_are_admissible() {
        for name in material_names() {
            let material = get_material(name).unwrap();
            assert!(material.check().is_ok(), "{}", name);
            assert_eq!(material.name, name);
        }
    }

    #[test]
    fn reduced_stiffness_is_symmetric() {
        let q = Material::default().reduced_stiffness();
        assert!((q[(0, 1)] - q[(1, 0)]).abs() < 1e-9);
        assert!(q[(0, 0)] > q[(1, 1)]);
    }

    #[test]
    fn unknown_material_is_a_configuration_error() {
        match get_material("unobtainium") {
            Err(DesignError::Configuration(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn reads_json_material() {
        let dir = TempDir::new("material").unwrap();
        let path = dir.path().join("my_cfrp.json");
        let mut file = File::create(&path).unwrap();
        write!(
            file,
            r#"{{"E1": 120000, "E2": 8000, "nu12": 0.3, "G12": 4000,
               "strength": {{"R1t": 2000, "R1c": 1000, "R2t": 40, "R2c": 150, "R21": 70}},
               "puck": {{"p21Plus": 0.3, "p21Minus": 0.25}},
               "fibreDensity": 1.78}}"#
        )
        .unwrap();

        let material = get_material(path.to_str().unwrap()).unwrap();
        assert_eq!(material.name, "my_cfrp");
        assert!((material.e1 - 120000.0).abs() < 1e-9);
        assert!((material.resin_density - 1.17).abs() < 1e-12);
        assert!((material.puck.p21_minus - 0.25).abs() < 1e-12);
    }
}
