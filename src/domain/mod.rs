//! Physics of the FDTD engine: materials, boundaries, sources and solvers

pub mod boundary;
pub mod dispersion;
pub mod frequency;
pub mod iteration;
pub mod material;
pub mod maxwell;
pub mod source;

pub use maxwell::{Engine, EngineState, SimulationSetup};
