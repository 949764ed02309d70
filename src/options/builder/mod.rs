pub mod design;
pub mod geometry;
