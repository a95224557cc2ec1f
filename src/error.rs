//! Error types for the simulation engine

use thiserror::Error;

/// Errors raised while configuring or running a simulation
#[derive(Debug, Error)]
pub enum Error {
    /// Inconsistent or missing setup (conflicting boundaries, bad grid, ...)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A dispersive pole cannot be made stable without changing the material
    #[error("material '{material}' is unstable on this grid: {reason}")]
    Stability { material: String, reason: String },

    /// The CW solver did not reach the requested tolerance
    #[error("CW solver did not converge after {iterations} iterations (residual {residual:.3e})")]
    NonConvergence { iterations: usize, residual: f64 },

    /// A recorded field value became NaN or infinite
    #[error("field diverged at t = {time:.6e} s")]
    Diverged { time: f64 },

    /// Operation not allowed in the current engine state
    #[error("invalid engine state: {0}")]
    State(String),

    /// The run was cancelled between two steps
    #[error("run cancelled at t = {time:.6e} s")]
    Cancelled { time: f64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
