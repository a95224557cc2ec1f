//! Bloch and PML boundary tests


use cdhsim::prelude::*;
use std::f64::consts::PI;
use test_utils::*;

fn driven_engine(boundaries: Boundaries) -> Engine {
    let source = Source::new(
        Component::Ey,
        Region::new([-1.5e-6, -1.5e-6, -1e-6], [0.5e-6, 1e-6, 1e-6]),
        TimeProfile::gaussian(4e13, 6e13),
    );
    let setup = setup([5, 4, 3], boundaries, 60).with_source(source);
    Engine::new(setup).unwrap()
}

#[test]
fn test_full_period_bloch_phase_matches_periodic() {
    // k L = 2π on every axis wraps with a unit phase
    let k = [
        2.0 * PI / (5.0 * RESOLUTION),
        2.0 * PI / (4.0 * RESOLUTION),
        -2.0 * PI / (3.0 * RESOLUTION),
    ];
    let mut periodic = driven_engine(Boundaries::bloch([0.0; 3]));
    let mut shifted = driven_engine(Boundaries::bloch(k));
    periodic.run(&mut [], None).unwrap();
    shifted.run(&mut [], None).unwrap();

    let scale = periodic.fields().e.norm_squared().sqrt();
    assert!(scale > 0.0);
    for a in 0..3 {
        let diff = &periodic.fields().e.component(a).data - &shifted.fields().e.component(a).data;
        let err = diff.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
        assert!(err < 1e-10 * scale, "component {a}: {err:e}");
    }
}

#[test]
fn test_bloch_field_carries_phase_across_cell() {
    // a plane wave current excites a plane wave field
    let length = 8.0 * RESOLUTION;
    let k = 2.0 * PI / length * 1.5;
    let grid = Grid::from_cells([1, 8, 1], RESOLUTION).unwrap();
    let source = Source::new(
        Component::Ex,
        Region::centered([2.0 * length; 3]),
        TimeProfile::gaussian(2e13, 4e13),
    )
    .with_amplitude(PlaneWavePhase { k: [0.0, k, 0.0] });
    let setup = SimulationSetup::new(grid, 80.0 * default_dt())
        .with_boundaries(Boundaries::bloch([0.0, -k, 0.0]))
        .with_source(source);
    let mut engine = Engine::new(setup).unwrap();
    engine.run(&mut [], None).unwrap();

    let first = engine.fields().e.component(0).data[[1, 1, 1]];
    assert!(first.norm() > 0.0);
    for j in 2..=8 {
        let value = engine.fields().e.component(0).data[[1, j, 1]];
        let expected = first * Complex64::from_polar(1.0, -k * (j - 1) as f64 * RESOLUTION);
        assert!((value - expected).norm() < 1e-9 * first.norm());
    }
}

#[test]
fn test_pml_absorbs_outgoing_pulse() {
    let fwidth = 1.0 / (20.0 * default_dt());
    let frequency = SPEED_OF_LIGHT / (20.0 * RESOLUTION);
    let setup = setup([1, 1, 120], slab_boundaries(16), 600).with_source(Source::new(
        Component::Ex,
        sheet(0.0),
        TimeProfile::gaussian(frequency, fwidth),
    ));
    let mut engine = Engine::new(setup).unwrap();

    let mut peak: f64 = 0.0;
    while engine.state() != EngineState::Finished {
        engine.step().unwrap();
        peak = peak.max(engine.electromagnetic_energy());
    }
    assert!(peak > 0.0);
    let left = engine.electromagnetic_energy();
    assert!(left < 1e-4 * peak, "{:e} of the peak energy left", left / peak);
}

#[test]
fn test_conflicting_boundaries_rejected() {
    let mut boundaries = Boundaries::bloch([0.0; 3]);
    assert!(boundaries
        .apply_pml(Direction::Z, PmlProfile::new(8))
        .is_err());

    let mut thick = Boundaries::new();
    thick.apply_pml(Direction::X, PmlProfile::new(8)).unwrap();
    let result = Engine::new(setup([16, 2, 2], thick, 10));
    assert!(matches!(result, Err(Error::Configuration(_))));
}
