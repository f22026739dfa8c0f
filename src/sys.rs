//! Geometry and the host boundary.

pub mod geometry;
pub mod headless;
pub mod host;
