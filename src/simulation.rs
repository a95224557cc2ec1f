//! Current-driven homogenisation runs
//!
//! A run drives the unit cell of a [`Model`] with a volume current
//! `J = s(t)·exp(−i K·r)` on `Ex`, under Bloch boundaries whose phase matches
//! the forced wavevector, and records the demodulated volume average of `Ex`.
//! The effective permittivity follows from that waveform and the known
//! current (see [`crate::utilities::spectrum::effective_permittivity`]).

use crate::domain::boundary::Boundaries;
use crate::domain::iteration::IterationResult;
use crate::domain::maxwell::{Engine, RunSummary, SimulationSetup};
use crate::domain::source::{PlaneWavePhase, Region, Source};
use crate::domain_decomposition::CancelToken;
use crate::engine::array::Complex64;
use crate::error::Result;
use crate::grid::{Component, Grid};
use crate::models::Model;
use crate::monitor::AmplitudeMonitor;
use tracing::info;

/// How the fields of a run were obtained
#[derive(Debug, Clone)]
pub enum RunOutcome {
    TimeDomain(RunSummary),
    FrequencyDomain(IterationResult),
}

/// Waveform and statistics of a finished run
#[derive(Debug, Clone)]
pub struct CdhResult {
    pub simulation_name: String,
    pub component: Component,
    pub times: Vec<f64>,
    pub values: Vec<Complex64>,
    /// Time step of the engine (s)
    pub dt: f64,
    pub outcome: RunOutcome,
}

/// Receives a message when a run finishes
pub trait Notifier {
    fn notify(&self, subject: &str, body: &str);
}

/// Writes notifications to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, subject: &str, body: &str) {
        info!("{subject}: {body}");
    }
}

/// Engine for the unit cell of `model`, driven by the CDH current
///
/// `workers` sets the number of slabs of the field kernels; by default one per
/// thread of the current rayon pool.
pub fn build_engine(model: &Model, courant: f64, workers: Option<usize>) -> Result<Engine> {
    let grid = Grid::new(model.size, model.resolution)?;
    let boundaries = Boundaries::bloch(model.k.map(|k| -k));

    // half a cell of margin so nodes on the cell faces are driven too
    let region = Region::centered(model.size.map(|s| s + model.resolution));
    let source = Source::new(Component::Ex, region, model.time_profile())
        .with_amplitude(PlaneWavePhase { k: model.k });

    let mut setup = SimulationSetup::new(grid, model.simtime)
        .with_courant(courant)
        .with_boundaries(boundaries)
        .with_source(source);
    for material in &model.materials {
        setup = setup.with_material(material.clone());
    }
    if let Some(n) = workers {
        setup = setup.with_workers(n);
    }
    Engine::new(setup)
}

/// Build, run and summarise one CDH simulation
pub fn run_cdh(
    model: &Model,
    courant: f64,
    workers: Option<usize>,
    notifier: &dyn Notifier,
    cancel: Option<&CancelToken>,
) -> Result<CdhResult> {
    let mut engine = build_engine(model, courant, workers)?;
    let mut monitor = AmplitudeMonitor::new(Component::Ex, model.size, model.k);
    info!(
        "{}: {:?} cells, dt = {:.3e} s, {} dispersive nodes",
        model.simulation_name,
        engine.grid().cells,
        engine.dt(),
        engine.dispersive_sites().len()
    );

    let (outcome, body) = if model.frequency_domain {
        let result = engine.solve_cw(model.max_tol, model.max_iter, model.bicgstab)?;
        monitor.record(&engine)?;
        let body = format!(
            "CW solution at {:.4e} Hz after {} iterations (residual {:.3e})",
            model.frequency, result.iterations, result.residual_norm
        );
        (RunOutcome::FrequencyDomain(result), body)
    } else {
        let summary = engine.run(std::slice::from_mut(&mut monitor), cancel)?;
        let body = format!(
            "{} steps to t = {:.4e} s in {:.1} s",
            summary.steps,
            summary.simulated_time,
            summary.elapsed.as_secs_f64()
        );
        (RunOutcome::TimeDomain(summary), body)
    };
    notifier.notify(
        &format!("simulation {} finished", model.simulation_name),
        &body,
    );

    let (times, values) = monitor.waveforms();
    Ok(CdhResult {
        simulation_name: model.simulation_name.clone(),
        component: monitor.component,
        times,
        values,
        dt: engine.dt(),
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::maxwell::EngineState;
    use crate::grid::SPEED_OF_LIGHT;
    use crate::models::materials;
    use std::cell::RefCell;

    struct Recorder(RefCell<Vec<String>>);

    impl Notifier for Recorder {
        fn notify(&self, subject: &str, _body: &str) {
            self.0.borrow_mut().push(subject.to_string());
        }
    }

    fn vacuum_model() -> Model {
        let resolution = 1e-6;
        Model {
            simulation_name: "vacuum".into(),
            size: [4e-6; 3],
            resolution,
            simtime: 20.0 * 0.5 * resolution / SPEED_OF_LIGHT,
            src_freq: 10e12,
            src_width: 40e12,
            k: [0.0, 1e5, 0.0],
            materials: vec![materials::dielectric(1.0)],
            frequency_domain: false,
            frequency: 0.0,
            max_tol: 1e-3,
            max_iter: 100,
            bicgstab: 2,
            parameters: Vec::new(),
        }
    }

    #[test]
    fn test_engine_for_model() {
        let engine = build_engine(&vacuum_model(), 0.5, Some(2)).unwrap();
        assert_eq!(engine.grid().cells, [4, 4, 4]);
        assert_eq!(engine.sources().len(), 1);
        assert_eq!(engine.state(), EngineState::Initialized);
    }

    #[test]
    fn test_run_records_every_step() {
        let recorder = Recorder(RefCell::new(Vec::new()));
        let result = run_cdh(&vacuum_model(), 0.5, None, &recorder, None).unwrap();
        assert_eq!(result.times.len(), 20);
        assert!(matches!(result.outcome, RunOutcome::TimeDomain(s) if s.steps == 20));
        assert_eq!(recorder.0.borrow().as_slice(), ["simulation vacuum finished"]);
        assert!(result.values.iter().any(|v| v.norm() > 0.0));
    }

    #[test]
    fn test_cancelled_run() {
        let token = CancelToken::new();
        token.cancel();
        let result = run_cdh(&vacuum_model(), 0.5, None, &LogNotifier, Some(&token));
        assert!(result.is_err());
    }
}
