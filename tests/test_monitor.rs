//! Demodulated volume-average monitor


use approx::assert_relative_eq;
use cdhsim::models::{materials, Model};
use cdhsim::monitor::AmplitudeMonitor;
use cdhsim::prelude::*;
use cdhsim::simulation::build_engine;
use test_utils::*;

fn plane_wave_model(k: [f64; 3], steps: usize) -> Model {
    Model {
        simulation_name: "plane".into(),
        size: [5e-6, 6e-6, 4e-6],
        resolution: RESOLUTION,
        simtime: steps as f64 * default_dt(),
        src_freq: 2e13,
        src_width: 6e13,
        k,
        materials: vec![materials::dielectric(2.0)],
        frequency_domain: false,
        frequency: 0.0,
        max_tol: 1e-3,
        max_iter: 100,
        bicgstab: 2,
        parameters: Vec::new(),
    }
}

#[test]
fn test_exact_plane_wave_averages_to_its_amplitude() {
    let k = [0.0, 3e5, -2e5];
    let model = plane_wave_model(k, 10);
    let mut engine = build_engine(&model, 0.5, None).unwrap();
    let amplitude = Complex64::new(0.3, -1.2);
    engine
        .set_initial_field(Component::Ex, |r| {
            amplitude * Complex64::from_polar(1.0, -(k[1] * r[1] + k[2] * r[2]))
        })
        .unwrap();
    let monitor = AmplitudeMonitor::new(Component::Ex, model.size, k);
    let average = monitor.average_field(&engine);
    assert_relative_eq!(average.re, amplitude.re, epsilon = 1e-12);
    assert_relative_eq!(average.im, amplitude.im, epsilon = 1e-12);
}

#[test]
fn test_driven_field_is_constant_after_demodulation() {
    // a homogeneous cell driven by exp(−iK·r) keeps the same envelope on every node
    let k = [0.0, 4e5, 1e5];
    let model = plane_wave_model(k, 60);
    let mut engine = build_engine(&model, 0.5, Some(2)).unwrap();
    let mut monitor = AmplitudeMonitor::new(Component::Ex, model.size, k);
    engine.run(std::slice::from_mut(&mut monitor), None).unwrap();

    assert_eq!(monitor.len(), 60);
    let average = *monitor.values().last().unwrap();
    assert!(average.norm() > 0.0);
    let [nx, ny, nz] = engine.grid().cells;
    for i in 1..=nx {
        for j in 1..=ny {
            for kk in 1..=nz {
                let r = engine.grid().position(Component::Ex, [i, j, kk]);
                let phase = k[1] * r[1] + k[2] * r[2];
                let value = engine.fields().e.component(0).data[[i, j, kk]]
                    * Complex64::from_polar(1.0, phase);
                assert!(
                    (value - average).norm() <= 1e-9 * average.norm(),
                    "node {:?}: {value} vs {average}",
                    [i, j, kk]
                );
            }
        }
    }
}

#[test]
fn test_times_follow_steps() {
    let model = plane_wave_model([0.0; 3], 5);
    let mut engine = build_engine(&model, 0.5, None).unwrap();
    let mut monitor = AmplitudeMonitor::new(Component::Hy, model.size, model.k);
    engine.run(std::slice::from_mut(&mut monitor), None).unwrap();
    let dt = engine.dt();
    for (n, t) in monitor.times().iter().enumerate() {
        assert_relative_eq!(*t, (n + 1) as f64 * dt, max_relative = 1e-12);
    }
    // magnetic samples are paired up onto the electric time grid
    let (times, values) = monitor.waveforms();
    assert_eq!(times.len(), 4);
    assert_eq!(values.len(), 4);
}
