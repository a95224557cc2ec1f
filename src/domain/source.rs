//! Volume current sources
//!
//! A source drives one electric component inside an axis-aligned region with
//! the current `J(r, t) = s(t) · A(r − r_centre)`. The time dependence `s` is
//! a [`TimeProfile`]; the spatial factor `A` is any [`AmplitudeProfile`]
//! object handed to the source directly.

use crate::engine::array::Complex64;
use crate::error::{Error, Result};
use crate::grid::Component;
use num_traits::Zero;
use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Complex spatial amplitude of a source, evaluated relative to its centre
pub trait AmplitudeProfile: Send + Sync {
    fn amplitude(&self, position: [f64; 3]) -> Complex64;
}

impl<F> AmplitudeProfile for F
where
    F: Fn([f64; 3]) -> Complex64 + Send + Sync,
{
    fn amplitude(&self, position: [f64; 3]) -> Complex64 {
        self(position)
    }
}

/// Constant unit amplitude
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl AmplitudeProfile for Uniform {
    fn amplitude(&self, _position: [f64; 3]) -> Complex64 {
        Complex64::new(1.0, 0.0)
    }
}

/// Forced plane-wave phase `exp(−i K·r)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneWavePhase {
    /// Wavevector (rad/m)
    pub k: [f64; 3],
}

impl AmplitudeProfile for PlaneWavePhase {
    fn amplitude(&self, r: [f64; 3]) -> Complex64 {
        let phase = self.k[0] * r[0] + self.k[1] * r[1] + self.k[2] * r[2];
        Complex64::from_polar(1.0, -phase)
    }
}

/// Time dependence of a source (frequencies in Hz, times in s)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeProfile {
    /// Sinc pulse of flat spectrum `[f0 − w/2, f0 + w/2]`, windowed to `[0, cutoff]`
    BandLimited {
        frequency: f64,
        bandwidth: f64,
        cutoff: f64,
    },
    /// Gaussian pulse of spectral width `fwidth`, peaking `cutoff` widths after t = 0
    Gaussian {
        frequency: f64,
        fwidth: f64,
        cutoff: f64,
    },
    /// Monochromatic wave switched on smoothly over `ramp` seconds
    Continuous { frequency: f64, ramp: f64 },
}

impl TimeProfile {
    pub fn band_limited(frequency: f64, bandwidth: f64, cutoff: f64) -> Self {
        TimeProfile::BandLimited {
            frequency,
            bandwidth,
            cutoff,
        }
    }

    pub fn gaussian(frequency: f64, fwidth: f64) -> Self {
        TimeProfile::Gaussian {
            frequency,
            fwidth,
            cutoff: 5.0,
        }
    }

    pub fn continuous(frequency: f64) -> Self {
        TimeProfile::Continuous {
            frequency,
            ramp: 0.0,
        }
    }

    /// Centre or carrier frequency (Hz)
    pub fn frequency(&self) -> f64 {
        match *self {
            TimeProfile::BandLimited { frequency, .. }
            | TimeProfile::Gaussian { frequency, .. }
            | TimeProfile::Continuous { frequency, .. } => frequency,
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, TimeProfile::Continuous { .. })
    }

    /// Time after which the source is identically zero, if any
    pub fn end_time(&self) -> Option<f64> {
        match *self {
            TimeProfile::BandLimited { cutoff, .. } => Some(cutoff),
            TimeProfile::Gaussian { fwidth, cutoff, .. } => Some(2.0 * cutoff / fwidth),
            TimeProfile::Continuous { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            TimeProfile::BandLimited {
                frequency,
                bandwidth,
                cutoff,
            } => frequency.is_finite() && bandwidth > 0.0 && cutoff > 0.0,
            TimeProfile::Gaussian {
                frequency,
                fwidth,
                cutoff,
            } => frequency.is_finite() && fwidth > 0.0 && cutoff > 0.0,
            TimeProfile::Continuous { frequency, ramp } => frequency > 0.0 && ramp >= 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::Configuration(format!("invalid source time profile {self:?}")))
        }
    }

    /// Complex source value at time `t`
    pub fn value(&self, t: f64) -> Complex64 {
        match *self {
            TimeProfile::BandLimited {
                frequency,
                bandwidth,
                cutoff,
            } => {
                let tau = t - 0.5 * cutoff;
                if tau.abs() >= 0.5 * cutoff {
                    return Complex64::zero();
                }
                let window = (PI * tau / cutoff).cos().powi(2);
                Complex64::from_polar(sinc(bandwidth * tau) * window, -2.0 * PI * frequency * tau)
            }
            TimeProfile::Gaussian {
                frequency,
                fwidth,
                cutoff,
            } => {
                let width = 1.0 / fwidth;
                let tau = t - cutoff * width;
                if tau.abs() >= cutoff * width {
                    return Complex64::zero();
                }
                let envelope = (-0.5 * (tau / width).powi(2)).exp();
                Complex64::from_polar(envelope, -2.0 * PI * frequency * tau)
            }
            TimeProfile::Continuous { frequency, ramp } => {
                if t < 0.0 {
                    return Complex64::zero();
                }
                let envelope = if ramp > 0.0 && t < ramp {
                    (0.5 * PI * t / ramp).sin().powi(2)
                } else {
                    1.0
                };
                Complex64::from_polar(envelope, -2.0 * PI * frequency * t)
            }
        }
    }
}

/// Normalised sinc, `sin(πx)/(πx)`
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Axis-aligned box (m)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Region {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// The box `[−size/2, size/2]` on every axis
    pub fn centered(size: [f64; 3]) -> Self {
        Self {
            min: [-0.5 * size[0], -0.5 * size[1], -0.5 * size[2]],
            max: [0.5 * size[0], 0.5 * size[1], 0.5 * size[2]],
        }
    }

    pub fn center(&self) -> [f64; 3] {
        [
            0.5 * (self.min[0] + self.max[0]),
            0.5 * (self.min[1] + self.max[1]),
            0.5 * (self.min[2] + self.max[2]),
        ]
    }

    /// Closed-interval containment
    pub fn contains(&self, r: [f64; 3]) -> bool {
        (0..3).all(|a| r[a] >= self.min[a] && r[a] <= self.max[a])
    }
}

/// A volume current source on one electric component
#[derive(Clone)]
pub struct Source {
    pub component: Component,
    pub region: Region,
    pub time_profile: TimeProfile,
    pub amplitude: Arc<dyn AmplitudeProfile>,
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("component", &self.component)
            .field("region", &self.region)
            .field("time_profile", &self.time_profile)
            .finish_non_exhaustive()
    }
}

impl Source {
    /// Source with unit amplitude everywhere in `region`
    pub fn new(component: Component, region: Region, time_profile: TimeProfile) -> Self {
        Self {
            component,
            region,
            time_profile,
            amplitude: Arc::new(Uniform),
        }
    }

    pub fn with_amplitude<A: AmplitudeProfile + 'static>(mut self, amplitude: A) -> Self {
        self.amplitude = Arc::new(amplitude);
        self
    }

    /// Spatial amplitude at absolute position `r`
    pub fn amplitude_at(&self, r: [f64; 3]) -> Complex64 {
        let c = self.region.center();
        self.amplitude
            .amplitude([r[0] - c[0], r[1] - c[1], r[2] - c[2]])
    }

    pub fn validate(&self) -> Result<()> {
        if !self.component.is_electric() {
            return Err(Error::Configuration(format!(
                "sources drive electric components only, got {}",
                self.component
            )));
        }
        self.time_profile.validate()
    }
}
