//! Dispersive materials
//!
//! A material is a static permittivity/permeability plus a sum of Lorentzian
//! poles, placed on the grid by a membership function returning a weight in
//! `[0, 1]` for each position. The susceptibility of one pole is
//!
//! ```text
//! χ(ω) = σ / (ω0² − ω² − iγω)
//! ```
//!
//! with `σ` the oscillator strength in rad²/s². A Drude pole has `ω0 = 0`.

use crate::engine::array::Complex64;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Spatial membership: position (m) to weight in `[0, 1]`
pub type Membership = Arc<dyn Fn([f64; 3]) -> f64 + Send + Sync>;

/// Largest relative change of a pole's susceptibility at the cutoff that
/// folding it into the static permittivity may cause
pub const MAX_CLIP_DEVIATION: f64 = 0.25;

/// One damped-oscillator term of the susceptibility
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorentzPole {
    /// Oscillator strength (rad²/s²)
    pub sigma: f64,
    /// Resonance angular frequency (rad/s)
    pub omega0: f64,
    /// Damping rate (rad/s)
    pub gamma: f64,
}

impl LorentzPole {
    pub fn new(sigma: f64, omega0: f64, gamma: f64) -> Self {
        Self {
            sigma,
            omega0,
            gamma,
        }
    }

    /// Lorentz oscillator adding `delta_epsilon` to the static permittivity
    pub fn lorentz(delta_epsilon: f64, omega0: f64, gamma: f64) -> Self {
        Self::new(delta_epsilon * omega0 * omega0, omega0, gamma)
    }

    /// Drude free-electron term with plasma frequency `omega_p`
    pub fn drude(omega_p: f64, gamma: f64) -> Self {
        Self::new(omega_p * omega_p, 0.0, gamma)
    }

    /// Susceptibility at angular frequency `omega`
    pub fn susceptibility(&self, omega: f64) -> Complex64 {
        let denom = Complex64::new(self.omega0 * self.omega0 - omega * omega, -self.gamma * omega);
        Complex64::new(self.sigma, 0.0) / denom
    }

    /// Zero-frequency susceptibility `σ/ω0²`; `None` for a Drude pole
    pub fn static_susceptibility(&self) -> Option<f64> {
        (self.omega0 > 0.0).then(|| self.sigma / (self.omega0 * self.omega0))
    }

    /// The same pole with its strength scaled by a fill weight
    pub fn scaled(&self, weight: f64) -> Self {
        Self {
            sigma: self.sigma * weight,
            ..*self
        }
    }
}

/// A material placed on the grid
#[derive(Clone)]
pub struct Material {
    pub name: String,
    /// High-frequency relative permittivity ε∞
    pub epsilon: f64,
    /// Relative permeability
    pub mu: f64,
    pub poles: Vec<LorentzPole>,
    membership: Membership,
}

impl fmt::Debug for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("epsilon", &self.epsilon)
            .field("mu", &self.mu)
            .field("poles", &self.poles)
            .finish_non_exhaustive()
    }
}

impl Material {
    /// A non-dispersive material filling the whole grid
    pub fn new(name: impl Into<String>, epsilon: f64) -> Self {
        Self {
            name: name.into(),
            epsilon,
            mu: 1.0,
            poles: Vec::new(),
            membership: Arc::new(|_| 1.0),
        }
    }

    pub fn with_mu(mut self, mu: f64) -> Self {
        self.mu = mu;
        self
    }

    pub fn with_pole(mut self, pole: LorentzPole) -> Self {
        self.poles.push(pole);
        self
    }

    pub fn with_poles(mut self, poles: impl IntoIterator<Item = LorentzPole>) -> Self {
        self.poles.extend(poles);
        self
    }

    /// Restrict the material to where `membership` is nonzero
    pub fn with_membership<F>(mut self, membership: F) -> Self
    where
        F: Fn([f64; 3]) -> f64 + Send + Sync + 'static,
    {
        self.membership = Arc::new(membership);
        self
    }

    /// Fill weight at `position`, clamped to `[0, 1]`
    pub fn weight(&self, position: [f64; 3]) -> f64 {
        let w = (self.membership)(position);
        if w.is_finite() {
            w.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn is_dispersive(&self) -> bool {
        self.poles.iter().any(|p| p.sigma != 0.0)
    }

    /// Complex relative permittivity at angular frequency `omega`
    pub fn permittivity(&self, omega: f64) -> Complex64 {
        self.poles
            .iter()
            .fold(Complex64::new(self.epsilon, 0.0), |acc, p| {
                acc + p.susceptibility(omega)
            })
    }
}

/// A pole changed by [`fix_stability`]
#[derive(Debug, Clone, PartialEq)]
pub struct AlteredPole {
    /// Position of the pole in the material's original list
    pub index: usize,
    pub omega0: f64,
    /// Static permittivity moved into ε∞
    pub folded_epsilon: f64,
}

/// Outcome of the stability pass on one material
#[derive(Debug, Clone, PartialEq)]
pub struct StabilityReport {
    pub material: String,
    /// Cutoff angular frequency (rad/s)
    pub cutoff: f64,
    pub altered: Vec<AlteredPole>,
}

impl StabilityReport {
    pub fn altered_count(&self) -> usize {
        self.altered.len()
    }
}

/// Highest pole resonance the time stepper accepts: half the Nyquist frequency
pub fn stability_cutoff(dt: f64) -> f64 {
    PI / (2.0 * dt)
}

/// Make a material's poles safe for time step `dt`
///
/// Poles resonating at or below [`stability_cutoff`] are kept as they are.
/// A pole above it cannot be resolved by the grid; it is removed and its
/// static susceptibility added to ε∞, which keeps the low-frequency response.
/// When that substitution changes the pole's susceptibility at the cutoff by
/// more than [`MAX_CLIP_DEVIATION`] the material is rejected and left
/// untouched.
pub fn fix_stability(material: &mut Material, dt: f64) -> Result<StabilityReport> {
    if !(dt.is_finite() && dt > 0.0) {
        return Err(Error::Configuration(format!("invalid time step {dt}")));
    }
    let cutoff = stability_cutoff(dt);

    let mut altered = Vec::new();
    for (index, pole) in material.poles.iter().enumerate() {
        if pole.omega0 <= cutoff {
            continue;
        }
        let exact = pole.susceptibility(cutoff);
        let folded = pole.static_susceptibility().unwrap_or(0.0);
        let deviation = (exact - folded).norm() / exact.norm().max(f64::MIN_POSITIVE);
        if deviation > MAX_CLIP_DEVIATION {
            return Err(Error::Stability {
                material: material.name.clone(),
                reason: format!(
                    "pole {index} at {:.4e} Hz is above the cutoff {:.4e} Hz but too close to \
                     fold into the static permittivity ({:.0}% change at cutoff); \
                     use a finer resolution",
                    pole.omega0 / (2.0 * PI),
                    cutoff / (2.0 * PI),
                    100.0 * deviation
                ),
            });
        }
        altered.push(AlteredPole {
            index,
            omega0: pole.omega0,
            folded_epsilon: folded,
        });
    }

    for a in altered.iter().rev() {
        material.poles.remove(a.index);
        material.epsilon += a.folded_epsilon;
        warn!(
            "material '{}': pole {} at {:.4e} Hz above cutoff {:.4e} Hz folded into epsilon (+{:.4})",
            material.name,
            a.index,
            a.omega0 / (2.0 * PI),
            cutoff / (2.0 * PI),
            a.folded_epsilon
        );
    }

    Ok(StabilityReport {
        material: material.name.clone(),
        cutoff,
        altered,
    })
}
