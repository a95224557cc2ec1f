//! Effective permittivity retrieved from current-driven runs


use approx::assert_relative_eq;
use cdhsim::models::{materials, Model};
use cdhsim::simulation::{run_cdh, LogNotifier};
use cdhsim::utilities::spectrum::{effective_permittivity, spectrum};
use cdhsim::grid::SPEED_OF_LIGHT;
use cdhsim::Complex64;
use test_utils::*;

fn uniform_model(epsilon: f64) -> Model {
    driven_model(epsilon, [0.0; 3], 400)
}

fn driven_model(epsilon: f64, k: [f64; 3], steps: usize) -> Model {
    Model {
        simulation_name: "uniform".into(),
        size: [3e-6; 3],
        resolution: RESOLUTION,
        simtime: steps as f64 * default_dt(),
        src_freq: 1e14,
        src_width: 1.5e14,
        k,
        materials: vec![materials::dielectric(epsilon)],
        frequency_domain: false,
        frequency: 0.0,
        max_tol: 1e-3,
        max_iter: 100,
        bicgstab: 2,
        parameters: Vec::new(),
    }
}

fn retrieved(epsilon: f64) -> Vec<(f64, Complex64)> {
    retrieved_from(uniform_model(epsilon), 0.4)
}

fn retrieved_from(model: Model, half_band: f64) -> Vec<(f64, Complex64)> {
    let result = run_cdh(&model, 0.5, None, &LogNotifier, None).unwrap();
    let eps = effective_permittivity(
        &result.times,
        &result.values,
        &model.time_profile(),
        model.k,
        result.dt,
        model.resolution,
        2,
    )
    .unwrap();
    let band_low = model.src_freq - half_band * model.src_width;
    let band_high = model.src_freq + half_band * model.src_width;
    eps.band(band_low, band_high).collect()
}

#[test]
fn test_vacuum_is_retrieved_as_unity() {
    let band = retrieved(1.0);
    assert!(!band.is_empty());
    for (f, eps) in band {
        assert_relative_eq!(eps.re, 1.0, max_relative = 1e-8);
        assert!(eps.im.abs() < 1e-8, "{f:e} Hz: {eps}");
    }
}

#[test]
fn test_uniform_dielectric_is_retrieved() {
    for (f, eps) in retrieved(3.0) {
        assert_relative_eq!(eps.re, 3.0, max_relative = 1e-8);
        assert!(eps.im.abs() < 3e-8, "{f:e} Hz: {eps}");
    }
}

#[test]
fn test_recorded_pulse_lies_in_source_band() {
    let model = uniform_model(1.0);
    let result = run_cdh(&model, 0.5, None, &LogNotifier, None).unwrap();
    let s = spectrum(&result.times, &result.values, 1).unwrap();
    let inside = s.value_at(model.src_freq).unwrap().norm();
    let outside = s.value_at(model.src_freq + model.src_width).unwrap().norm();
    assert!(inside > 5.0 * outside, "{inside:e} vs {outside:e}");
}

#[test]
fn test_oblique_wavevector_is_removed_from_retrieval() {
    // the cell mode rings undamped at K ≠ 0, so the record must be long
    let model = driven_model(3.0, [0.0, 5e5, 0.0], 16000);
    let band = retrieved_from(model, 0.3);
    assert!(!band.is_empty());
    for (f, eps) in band {
        assert_relative_eq!(eps.re, 3.0, max_relative = 1e-2);
        assert!(eps.im.abs() < 3e-2, "{f:e} Hz: {eps}");
    }
}

/// Samples at or above half the peak magnitude
fn samples_above_half_maximum(series: &[Complex64]) -> usize {
    let max = series.iter().map(|v| v.norm()).fold(0.0, f64::max);
    series.iter().filter(|v| v.norm() >= 0.5 * max).count()
}

#[test]
fn test_vacuum_pulse_follows_integrated_current() {
    // a uniform current in vacuum gives E(t) = −c ∫ s dt on every node
    let steps = 12000;
    let model = Model {
        simulation_name: "vacuum".into(),
        size: [2e-6; 3],
        resolution: RESOLUTION,
        simtime: steps as f64 * default_dt(),
        src_freq: 2e13,
        src_width: 5e12,
        k: [0.0; 3],
        materials: Vec::new(),
        frequency_domain: false,
        frequency: 0.0,
        max_tol: 1e-3,
        max_iter: 100,
        bicgstab: 2,
        parameters: Vec::new(),
    };
    let profile = model.time_profile();
    let result = run_cdh(&model, 0.5, None, &LogNotifier, None).unwrap();
    let dt = result.dt;
    assert_eq!(result.values.len(), steps);

    // fine quadrature of the continuous integral at every recorded time
    let substeps = 16;
    let h = dt / substeps as f64;
    let mut integral = Complex64::new(0.0, 0.0);
    let mut t = 0.0;
    let analytic: Vec<Complex64> = result
        .times
        .iter()
        .map(|&sample_time| {
            while t + 0.5 * h < sample_time {
                integral += profile.value(t + 0.5 * h) * h;
                t += h;
            }
            -SPEED_OF_LIGHT * integral
        })
        .collect();

    let scale = analytic.iter().map(|v| v.norm()).fold(0.0, f64::max);
    assert!(scale > 0.0);
    for (n, (recorded, expected)) in result.values.iter().zip(&analytic).enumerate() {
        assert!(
            (recorded - expected).norm() < 1e-2 * scale,
            "sample {n}: {recorded} vs {expected}"
        );
    }

    // the envelope peaks at the centre of the pulse, cutoff/2 = simtime/20
    let peak_time = result.times[peak_index(&result.values)];
    let centre = model.simtime / 20.0;
    assert!(
        (peak_time - centre).abs() < 5.0 * dt,
        "peak at {peak_time:e} s, pulse centre {centre:e} s"
    );

    // sinc envelope: full width at half maximum 1.2067/src_width
    let recorded_width = samples_above_half_maximum(&result.values) as f64 * dt;
    let analytic_width = samples_above_half_maximum(&analytic) as f64 * dt;
    assert!((recorded_width - analytic_width).abs() <= 3.0 * dt);
    assert_relative_eq!(recorded_width, 1.2067 / model.src_width, max_relative = 0.1);
}
