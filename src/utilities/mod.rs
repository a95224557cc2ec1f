//! Geometry helpers, reference formulas and spectral post-processing

pub mod analytical;
pub mod geometry;
pub mod spectrum;
