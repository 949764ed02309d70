//! copv
//! A library for the layer-by-layer winding design of composite
//! overwrapped pressure vessels.

pub static COMMENT: &str = "#  ";

extern crate svg;
extern crate log;

#[macro_use]
extern crate lazy_static;

pub mod contour;
pub mod design;
pub mod error;
pub mod evaluate;
pub mod hydrogen;
pub mod io;
pub mod laminate;
pub mod material;
pub mod metal;
pub mod numbers;
pub mod optimise;
pub mod plot;
pub mod puck;
pub mod results;
pub mod solver;
pub mod target;
pub mod winding;
