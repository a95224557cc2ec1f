//! Spectral post-processing of recorded waveforms
//!
//! Transforms use the `e^{−iωt}` convention of the sources:
//! `X(ω) = Σ x(t_n) e^{iωt_n} dt`, so a source oscillating as `e^{−iω0 t}`
//! appears at positive frequency `ω0`.

use crate::domain::source::TimeProfile;
use crate::engine::array::Complex64;
use crate::error::{Error, Result};
use crate::grid::SPEED_OF_LIGHT;
use crate::utilities::analytical::{discrete_vacuum_wavenumber, discrete_wavenumber_squared};
use num_traits::Zero;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Complex spectrum on non-negative frequencies (Hz)
#[derive(Debug, Clone, Default)]
pub struct Spectrum {
    pub frequencies: Vec<f64>,
    pub values: Vec<Complex64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the bin nearest to `frequency`
    pub fn value_at(&self, frequency: f64) -> Option<Complex64> {
        let f0 = *self.frequencies.first()?;
        let df = self.frequencies.get(1)? - f0;
        let i = ((frequency - f0) / df).round();
        if i < 0.0 {
            return None;
        }
        self.values.get(i as usize).copied()
    }

    /// Bins with `fmin <= f <= fmax`
    pub fn band(&self, fmin: f64, fmax: f64) -> impl Iterator<Item = (f64, Complex64)> + '_ {
        self.frequencies
            .iter()
            .zip(&self.values)
            .filter(move |(f, _)| **f >= fmin && **f <= fmax)
            .map(|(f, v)| (*f, *v))
    }
}

/// Uniform sampling step of `times`
fn sampling_step(times: &[f64]) -> Result<f64> {
    if times.len() < 2 {
        return Err(Error::Configuration(
            "a spectrum needs at least two samples".into(),
        ));
    }
    let dt = times[1] - times[0];
    let uniform = times
        .windows(2)
        .all(|w| ((w[1] - w[0]) - dt).abs() <= 1e-6 * dt);
    if !(dt > 0.0 && uniform) {
        return Err(Error::Configuration(
            "samples must be uniformly spaced in time".into(),
        ));
    }
    Ok(dt)
}

/// Spectrum of a uniformly sampled waveform, zero padded to `padding` times its length
pub fn spectrum(times: &[f64], values: &[Complex64], padding: usize) -> Result<Spectrum> {
    if times.len() != values.len() {
        return Err(Error::Configuration(format!(
            "{} times for {} values",
            times.len(),
            values.len()
        )));
    }
    let dt = sampling_step(times)?;
    let n = values.len() * padding.max(1);

    let mut buffer = vec![Complex64::zero(); n];
    buffer[..values.len()].copy_from_slice(values);
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_inverse(n);
    fft.process(&mut buffer);

    let t0 = times[0];
    let (frequencies, values) = buffer
        .iter()
        .take(n / 2 + 1)
        .enumerate()
        .map(|(k, v)| {
            let f = k as f64 / (n as f64 * dt);
            (f, v * Complex64::from_polar(dt, 2.0 * PI * f * t0))
        })
        .unzip();
    Ok(Spectrum {
        frequencies,
        values,
    })
}

/// Displacement field driven by a uniform current at each recorded time
///
/// `times` must lie on the step grid `n·dt`; the value at step `n` is
/// `−c·dt·Σ_{m<n} s(m·dt + dt/2)`, the exact accumulation of the injection.
pub fn source_flux(profile: &TimeProfile, times: &[f64], dt: f64) -> Vec<Complex64> {
    let cdt = SPEED_OF_LIGHT * dt;
    let mut out = Vec::with_capacity(times.len());
    let mut accumulated = Complex64::zero();
    let mut step = 0usize;
    for &t in times {
        let target = (t / dt).round().max(0.0) as usize;
        while step < target {
            accumulated -= profile.value((step as f64 + 0.5) * dt) * cdt;
            step += 1;
        }
        out.push(accumulated);
    }
    out
}

/// Effective permittivity from a current-driven run
///
/// `e_values` is the demodulated average of the driven electric component,
/// `k` the forced wavevector (perpendicular to that component). With the
/// grid-consistent wavenumbers of the leapfrog the retrieval
/// `ε(ω) = D_J(ω)/E(ω) + k²/k0²` is exact for a homogeneous medium.
pub fn effective_permittivity(
    times: &[f64],
    e_values: &[Complex64],
    profile: &TimeProfile,
    k: [f64; 3],
    dt: f64,
    resolution: f64,
    padding: usize,
) -> Result<Spectrum> {
    let flux = source_flux(profile, times, dt);
    let d = spectrum(times, &flux, padding)?;
    let e = spectrum(times, e_values, padding)?;
    let k_squared: f64 = k
        .iter()
        .map(|&ka| discrete_wavenumber_squared(ka, resolution))
        .sum();

    let (frequencies, values) = d
        .frequencies
        .iter()
        .zip(d.values.iter().zip(&e.values))
        .skip(1)
        .map(|(&f, (dv, ev))| {
            let k0 = discrete_vacuum_wavenumber(2.0 * PI * f, dt);
            (f, dv / ev + k_squared / (k0 * k0))
        })
        .unzip();
    Ok(Spectrum {
        frequencies,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_tone_lands_on_its_bin() {
        let dt = 1e-3;
        let n = 1000;
        let f0 = 50.0;
        let times: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
        let values: Vec<Complex64> = times
            .iter()
            .map(|&t| Complex64::from_polar(1.0, -2.0 * PI * f0 * t))
            .collect();
        let s = spectrum(&times, &values, 1).unwrap();
        assert_relative_eq!(s.frequencies[50], f0, max_relative = 1e-12);
        assert_relative_eq!(s.value_at(f0).unwrap().norm(), 1.0, max_relative = 1e-9);
        assert!(s.value_at(2.0 * f0).unwrap().norm() < 1e-9);
    }

    #[test]
    fn test_padding_refines_bins() {
        let times: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let values = vec![Complex64::new(1.0, 0.0); 8];
        let s = spectrum(&times, &values, 4).unwrap();
        assert_eq!(s.len(), 17);
        assert_relative_eq!(s.frequencies[1], 1.0 / 32.0);
        assert_relative_eq!(s.values[0].re, 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nonuniform_sampling_rejected() {
        let times = [0.0, 1.0, 3.0];
        let values = [Complex64::zero(); 3];
        assert!(spectrum(&times, &values, 1).is_err());
    }

    #[test]
    fn test_source_flux_accumulates() {
        let profile = TimeProfile::continuous(0.0);
        let dt = 1e-15;
        let times = [dt, 2.0 * dt, 4.0 * dt];
        let flux = source_flux(&profile, &times, dt);
        let cdt = SPEED_OF_LIGHT * dt;
        assert_relative_eq!(flux[0].re, -cdt, max_relative = 1e-12);
        assert_relative_eq!(flux[2].re, -4.0 * cdt, max_relative = 1e-12);
    }
}
