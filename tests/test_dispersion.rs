//! Dispersive materials inside the engine


use approx::assert_relative_eq;
use cdhsim::domain::material::stability_cutoff;
use cdhsim::prelude::*;
use test_utils::*;

fn engine_with(material: Material, steps: usize) -> Result<Engine> {
    Engine::new(setup([2, 2, 2], Boundaries::bloch([0.0; 3]), steps).with_material(material))
}

#[test]
fn test_unresolvable_pole_is_folded() {
    let cutoff = stability_cutoff(default_dt());
    let material = Material::new("uv", 2.0)
        .with_pole(LorentzPole::lorentz(1.5, 10.0 * cutoff, 0.1 * cutoff))
        .with_pole(LorentzPole::lorentz(0.5, 0.1 * cutoff, 0.01 * cutoff));
    let engine = engine_with(material, 10).unwrap();

    let report = &engine.stability_reports()[0];
    assert_eq!(report.altered_count(), 1);
    assert_eq!(report.altered[0].index, 0);
    assert_relative_eq!(report.altered[0].folded_epsilon, 1.5, max_relative = 1e-12);

    // the resolved pole is still there, on top of ε∞ = 2 + 1.5
    let site = &engine.dispersive_sites()[0];
    assert_eq!(site.poles.len(), 1);
    assert_relative_eq!(site.epsilon, 3.5, max_relative = 1e-12);
    assert_relative_eq!(site.permittivity(0.0).re, 4.0, max_relative = 1e-12);
}

#[test]
fn test_pole_near_cutoff_is_rejected() {
    let cutoff = stability_cutoff(default_dt());
    let material = Material::new("edge", 1.0).with_pole(LorentzPole::lorentz(1.0, 1.2 * cutoff, 0.0));
    assert!(matches!(
        engine_with(material, 10),
        Err(Error::Stability { material, .. }) if material == "edge"
    ));
}

#[test]
fn test_resolved_poles_are_untouched() {
    let cutoff = stability_cutoff(default_dt());
    let material = Material::new("ok", 1.0)
        .with_pole(LorentzPole::drude(30.0 * cutoff, 0.01 * cutoff))
        .with_pole(LorentzPole::lorentz(2.0, cutoff, 0.0));
    let engine = engine_with(material, 10).unwrap();
    assert_eq!(engine.stability_reports()[0].altered_count(), 0);
    assert_eq!(engine.dispersive_sites()[0].poles.len(), 2);
}

#[test]
fn test_strong_drude_metal_stays_stable() {
    let cutoff = stability_cutoff(default_dt());
    let metal = Material::new("metal", 1.0).with_pole(LorentzPole::drude(20.0 * cutoff, 1e14));
    let mut engine = engine_with(metal, 1000).unwrap();
    engine
        .set_initial_field(Component::Ez, |_| Complex64::new(1.0, 0.0))
        .unwrap();
    while engine.state() != EngineState::Finished {
        engine.step().unwrap();
        let ez = engine.get_field(Component::Ez, [0.0; 3]);
        assert!(ez.norm() <= 2.0, "|Ez| = {} at step {}", ez.norm(), engine.steps());
    }
    assert!(engine.fields().e.is_finite());
}

#[test]
fn test_partial_fill_scales_pole_strength() {
    let pole = LorentzPole::lorentz(4.0, 1e14, 1e12);
    let material = Material::new("half", 1.0)
        .with_pole(pole)
        .with_membership(|_| 0.5);
    let engine = engine_with(material, 10).unwrap();
    for site in engine.dispersive_sites() {
        assert_relative_eq!(site.poles[0].pole.sigma, 0.5 * pole.sigma, max_relative = 1e-12);
    }
}
