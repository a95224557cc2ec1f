//! cdhsim - FDTD simulation of periodic metamaterial unit cells
//!
//! This library drives Yee-grid time-domain simulations with Lorentz/Drude
//! dispersive materials, Bloch and PML boundaries and complex volume
//! currents, plus a CW frequency-domain solver, and records the demodulated
//! volume-averaged fields needed for current-driven homogenisation.

pub mod config;
pub mod domain;
pub mod domain_decomposition;
pub mod engine;
pub mod error;
pub mod grid;
pub mod models;
pub mod monitor;
pub mod output;
pub mod simulation;
pub mod utilities;

// Re-export commonly used types
pub use domain::maxwell::{Engine, SimulationSetup};
pub use engine::array::Complex64;
pub use error::{Error, Result};

pub mod prelude {
    //! Common imports for setting up and running simulations
    pub use crate::domain::boundary::{Boundaries, PmlProfile};
    pub use crate::domain::material::{LorentzPole, Material};
    pub use crate::domain::maxwell::{Engine, EngineState, RunSummary, SimulationSetup};
    pub use crate::domain::source::{PlaneWavePhase, Region, Source, TimeProfile};
    pub use crate::domain_decomposition::CancelToken;
    pub use crate::engine::array::Complex64;
    pub use crate::error::{Error, Result};
    pub use crate::grid::{Component, Direction, Grid, SPEED_OF_LIGHT};
    pub use crate::models::{Model, ModelConfig};
    pub use crate::monitor::AmplitudeMonitor;
    pub use crate::simulation::{build_engine, run_cdh, LogNotifier, Notifier};
}
