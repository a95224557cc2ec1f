//! Maxwell solver using the FDTD (Finite-Difference Time-Domain) method
//!
//! Fields are advanced with the Yee leapfrog scheme in normalised units
//! (E and H share units, the update coefficient is `c·dt/Δ`):
//!
//! ```text
//! B^{n+½}   = B^{n−½} − c·dt · curl_f E^n          H = B/μ
//! D^{n+1}   = D^n     + c·dt · curl_b H^{n+½} − c·dt · J^{n+½}
//! E^{n+1}   = (D^{n+1} − ΣP) / ε∞                 (ADE on dispersive nodes)
//! ```
//!
//! `curl_f` uses forward differences and `curl_b` backward ones; with the
//! halo rules of the boundary layer `curl_b` is the adjoint of `curl_f`,
//! which makes the lossless scheme exactly energy conserving.

use crate::domain::boundary::{loss_coefficients, Boundaries, ConductivityProfile};
use crate::domain::dispersion::DispersiveSite;
use crate::domain::material::{fix_stability, Material, StabilityReport};
use crate::domain::source::{Source, TimeProfile};
use crate::domain_decomposition::{CancelToken, SlabDecomposition};
use crate::engine::array::{Complex64, VectorField};
use crate::error::{Error, Result};
use crate::grid::{Component, Direction, ElectromagneticFields, FieldKind, Grid, SPEED_OF_LIGHT};
use crate::monitor::AmplitudeMonitor;
use ndarray::{Array3, Zip};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Courant number used when none is given
pub const DEFAULT_COURANT: f64 = 0.5;

/// Forward-difference curl component `a` at array index `idx` (not divided by Δ)
#[inline]
pub fn curl_forward(f: &VectorField, a: usize, idx: [usize; 3]) -> Complex64 {
    let (b, c) = ((a + 1) % 3, (a + 2) % 3);
    let fb = &f.component(b).data;
    let fc = &f.component(c).data;
    let mut along_b = idx;
    along_b[b] += 1;
    let mut along_c = idx;
    along_c[c] += 1;
    (fc[along_b] - fc[idx]) - (fb[along_c] - fb[idx])
}

/// Backward-difference curl component `a` at array index `idx` (not divided by Δ)
#[inline]
pub fn curl_backward(f: &VectorField, a: usize, idx: [usize; 3]) -> Complex64 {
    let (b, c) = ((a + 1) % 3, (a + 2) % 3);
    let fb = &f.component(b).data;
    let fc = &f.component(c).data;
    let mut along_b = idx;
    along_b[b] -= 1;
    let mut along_c = idx;
    along_c[c] -= 1;
    (fc[idx] - fc[along_b]) - (fb[idx] - fb[along_c])
}

/// Everything fixed before the first step
#[derive(Debug, Clone)]
pub struct SimulationSetup {
    pub grid: Grid,
    /// Courant number `c·dt/Δ`
    pub courant: f64,
    /// Requested simulated time (s)
    pub simtime: f64,
    pub boundaries: Boundaries,
    pub materials: Vec<Material>,
    pub sources: Vec<Source>,
    /// Number of slabs; the rayon pool size when `None`
    pub workers: Option<usize>,
}

impl SimulationSetup {
    pub fn new(grid: Grid, simtime: f64) -> Self {
        Self {
            grid,
            courant: DEFAULT_COURANT,
            simtime,
            boundaries: Boundaries::default(),
            materials: Vec::new(),
            sources: Vec::new(),
            workers: None,
        }
    }

    pub fn with_courant(mut self, courant: f64) -> Self {
        self.courant = courant;
        self
    }

    pub fn with_boundaries(mut self, boundaries: Boundaries) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.materials.push(material);
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }
}

/// Lifecycle of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Built, no step taken yet
    Initialized,
    /// Stepping, time below simtime
    Running,
    /// Time reached simtime, or a CW solution is stored
    Finished,
}

/// Source nodes with their precomputed `gain · amplitude` factors
#[derive(Debug, Clone)]
struct CompiledSource {
    axis: usize,
    profile: TimeProfile,
    nodes: Vec<([usize; 3], Complex64)>,
}

/// Statistics of a completed time-domain run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub simulated_time: f64,
    pub elapsed: Duration,
}

/// FDTD engine: grid, fields, materials, boundaries and sources of one run
#[derive(Debug)]
pub struct Engine {
    pub(crate) grid: Grid,
    pub(crate) dt: f64,
    pub(crate) simtime: f64,
    pub(crate) steps: usize,
    pub(crate) state: EngineState,
    pub(crate) boundaries: Boundaries,
    pub(crate) conductivity: ConductivityProfile,
    pub(crate) decomposition: SlabDecomposition,
    pub(crate) fields: ElectromagneticFields,
    /// ε∞ at each electric node, per component
    pub(crate) epsilon: [Array3<f64>; 3],
    /// μ at each magnetic node, per component
    pub(crate) mu: [Array3<f64>; 3],
    pub(crate) sites: Vec<DispersiveSite>,
    pub(crate) sources: Vec<Source>,
    compiled: Vec<CompiledSource>,
    reports: Vec<StabilityReport>,
}

impl Engine {
    /// Validate `setup` and build the engine
    ///
    /// Fails with a configuration error for an invalid grid, time step,
    /// boundary or source, and with a stability error when a material pole
    /// cannot be handled at the resulting time step.
    pub fn new(setup: SimulationSetup) -> Result<Self> {
        let SimulationSetup {
            grid,
            courant,
            simtime,
            boundaries,
            mut materials,
            sources,
            workers,
        } = setup;

        if !(simtime.is_finite() && simtime > 0.0) {
            return Err(Error::Configuration(format!(
                "simulation time must be positive, got {simtime}"
            )));
        }
        let dt = grid.time_step(courant)?;
        boundaries.validate(&grid)?;
        for source in &sources {
            source.validate()?;
        }
        for material in &materials {
            if !(material.epsilon > 0.0 && material.mu > 0.0) {
                return Err(Error::Configuration(format!(
                    "material '{}' needs positive epsilon and mu",
                    material.name
                )));
            }
        }

        let reports = materials
            .iter_mut()
            .map(|m| fix_stability(m, dt))
            .collect::<Result<Vec<_>>>()?;

        let decomposition = match workers {
            Some(n) => SlabDecomposition::new(grid.cells, n),
            None => SlabDecomposition::for_current_pool(grid.cells),
        };
        let conductivity = ConductivityProfile::new(&grid, &boundaries);

        let mut engine = Self {
            dt,
            simtime,
            steps: 0,
            state: EngineState::Initialized,
            fields: ElectromagneticFields::zeros(grid.cells),
            epsilon: std::array::from_fn(|_| Array3::ones(shape(&grid))),
            mu: std::array::from_fn(|_| Array3::ones(shape(&grid))),
            sites: Vec::new(),
            sources,
            compiled: Vec::new(),
            reports,
            boundaries,
            conductivity,
            decomposition,
            grid,
        };
        engine.assemble_materials(&materials);
        engine.compile_sources();

        info!(
            "engine ready: {:?} cells, dt = {:.4e} s, {} steps, {} dispersive nodes, {} slabs",
            engine.grid.cells,
            engine.dt,
            (engine.simtime / engine.dt).ceil() as usize,
            engine.sites.len(),
            engine.decomposition.num_slabs()
        );
        Ok(engine)
    }

    /// Voxelise the materials onto the staggered nodes
    fn assemble_materials(&mut self, materials: &[Material]) {
        let grid = &self.grid;
        let dt = self.dt;

        for a in 0..3 {
            let ec = Component::electric(Direction::ALL[a]);
            let hc = Component::magnetic(Direction::ALL[a]);
            self.decomposition
                .for_each_interior(&mut self.epsilon[a], |idx, eps| {
                    let r = grid.position(ec, idx);
                    *eps = 1.0
                        + materials
                            .iter()
                            .map(|m| m.weight(r) * (m.epsilon - 1.0))
                            .sum::<f64>();
                });
            self.decomposition.for_each_interior(&mut self.mu[a], |idx, mu| {
                let r = grid.position(hc, idx);
                *mu = 1.0
                    + materials
                        .iter()
                        .map(|m| m.weight(r) * (m.mu - 1.0))
                        .sum::<f64>();
            });
        }

        let dispersive: Vec<&Material> = materials.iter().filter(|m| m.is_dispersive()).collect();
        if dispersive.is_empty() {
            return;
        }
        let epsilon = &self.epsilon;
        let [_, ny, nz] = grid.cells;
        self.sites = self.decomposition.collect_planes(|i| {
            let mut sites = Vec::new();
            for a in 0..3 {
                let ec = Component::electric(Direction::ALL[a]);
                for j in 1..=ny {
                    for k in 1..=nz {
                        let r = grid.position(ec, [i, j, k]);
                        let poles: Vec<_> = dispersive
                            .iter()
                            .flat_map(|m| {
                                let w = m.weight(r);
                                m.poles
                                    .iter()
                                    .filter(move |_| w > 0.0)
                                    .map(move |p| p.scaled(w))
                            })
                            .filter(|p| p.sigma != 0.0)
                            .collect();
                        if !poles.is_empty() {
                            sites.push(DispersiveSite::new(
                                a,
                                [i, j, k],
                                epsilon[a][[i, j, k]],
                                &poles,
                                dt,
                            ));
                        }
                    }
                }
            }
            sites
        });
    }

    /// Precompute the injected node list of every source
    fn compile_sources(&mut self) {
        let cdt = SPEED_OF_LIGHT * self.dt;
        let [nx, ny, nz] = self.grid.cells;
        self.compiled = self
            .sources
            .iter()
            .map(|source| {
                let component = source.component;
                let offset = component.offset();
                let mut nodes = Vec::new();
                for i in 1..=nx {
                    for j in 1..=ny {
                        for k in 1..=nz {
                            let r = self.grid.position(component, [i, j, k]);
                            if !source.region.contains(r) {
                                continue;
                            }
                            let sigma = self.conductivity.at(offset, [i, j, k]);
                            let (_, gain) = loss_coefficients(sigma, cdt);
                            nodes.push(([i, j, k], source.amplitude_at(r) * gain));
                        }
                    }
                }
                debug!("source on {} covers {} nodes", component, nodes.len());
                CompiledSource {
                    axis: component.direction().index(),
                    profile: source.time_profile,
                    nodes,
                }
            })
            .collect();
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Time of the current E field (s)
    pub fn time(&self) -> f64 {
        self.steps as f64 * self.dt
    }

    pub fn simtime(&self) -> f64 {
        self.simtime
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn fields(&self) -> &ElectromagneticFields {
        &self.fields
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn dispersive_sites(&self) -> &[DispersiveSite] {
        &self.sites
    }

    /// Outcome of the stability pass, one report per material
    pub fn stability_reports(&self) -> &[StabilityReport] {
        &self.reports
    }

    /// Value of `component` at the node nearest to `position`
    pub fn get_field(&self, component: Component, position: [f64; 3]) -> Complex64 {
        self.fields.get_field(&self.grid, component, position)
    }

    /// Set an initial field before the first step
    ///
    /// For an electric component E is set to `f(r)` and D to `ε∞·f(r)`; for a
    /// magnetic one H to `f(r)` and B to `μ·f(r)`.
    pub fn set_initial_field<F>(&mut self, component: Component, mut f: F) -> Result<()>
    where
        F: FnMut([f64; 3]) -> Complex64,
    {
        if self.state != EngineState::Initialized {
            return Err(Error::State(
                "initial fields can only be set before the first step".into(),
            ));
        }
        let a = component.direction().index();
        let [nx, ny, nz] = self.grid.cells;
        let (field, flux, material) = match component.kind() {
            FieldKind::Electric => (&mut self.fields.e, &mut self.fields.d, &self.epsilon[a]),
            FieldKind::Magnetic => (&mut self.fields.h, &mut self.fields.b, &self.mu[a]),
        };
        for i in 1..=nx {
            for j in 1..=ny {
                for k in 1..=nz {
                    let value = f(self.grid.position(component, [i, j, k]));
                    field.component_mut(a).data[[i, j, k]] = value;
                    flux.component_mut(a).data[[i, j, k]] = value * material[[i, j, k]];
                }
            }
        }
        if component.is_electric() {
            let e = &self.fields.e;
            for site in self.sites.iter_mut().filter(|s| s.axis == a) {
                site.e_previous = e.component(a).data[site.index];
            }
        }
        Ok(())
    }

    /// Advance all fields by one time step
    pub fn step(&mut self) -> Result<()> {
        if self.state == EngineState::Finished {
            return Err(Error::State(format!(
                "simulation already finished at t = {:.6e} s",
                self.time()
            )));
        }
        self.state = EngineState::Running;

        self.boundaries.fill_halos(&mut self.fields.e, &self.grid);
        self.update_magnetic();
        self.boundaries.fill_halos(&mut self.fields.h, &self.grid);
        self.update_electric_flux();
        self.inject_sources(self.time() + 0.5 * self.dt);
        self.update_electric_field();

        self.steps += 1;
        if self.time() >= self.simtime * (1.0 - 1e-12) {
            self.state = EngineState::Finished;
        }
        Ok(())
    }

    /// B and H at t + dt/2 from E at t
    fn update_magnetic(&mut self) {
        let cdt = SPEED_OF_LIGHT * self.dt;
        let inv_dx = 1.0 / self.grid.resolution;
        let e = &self.fields.e;
        let conductivity = &self.conductivity;

        for a in 0..3 {
            let offset = Component::magnetic(Direction::ALL[a]).offset();
            self.decomposition
                .for_each_interior(&mut self.fields.b.component_mut(a).data, |idx, b| {
                    let (decay, gain) = loss_coefficients(conductivity.at(offset, idx), cdt);
                    *b = *b * decay - curl_forward(e, a, idx) * (gain * inv_dx);
                });
            Zip::from(&mut self.fields.h.component_mut(a).data)
                .and(&self.fields.b.component(a).data)
                .and(&self.mu[a])
                .par_for_each(|h, &b, &mu| *h = b / mu);
        }
    }

    /// D at t + dt from H at t + dt/2
    fn update_electric_flux(&mut self) {
        let cdt = SPEED_OF_LIGHT * self.dt;
        let inv_dx = 1.0 / self.grid.resolution;
        let h = &self.fields.h;
        let conductivity = &self.conductivity;

        for a in 0..3 {
            let offset = Component::electric(Direction::ALL[a]).offset();
            self.decomposition
                .for_each_interior(&mut self.fields.d.component_mut(a).data, |idx, d| {
                    let (decay, gain) = loss_coefficients(conductivity.at(offset, idx), cdt);
                    *d = *d * decay + curl_backward(h, a, idx) * (gain * inv_dx);
                });
        }
    }

    /// Subtract the source currents sampled at `t` from D
    fn inject_sources(&mut self, t: f64) {
        for source in &self.compiled {
            let s = source.profile.value(t);
            if s == Complex64::new(0.0, 0.0) {
                continue;
            }
            let d = &mut self.fields.d.component_mut(source.axis).data;
            for (idx, factor) in &source.nodes {
                d[*idx] -= factor * s;
            }
        }
    }

    /// E at t + dt from D, solving the polarization of dispersive nodes
    fn update_electric_field(&mut self) {
        let d = &self.fields.d;
        let e = &self.fields.e;
        let solved: Vec<Complex64> = self
            .sites
            .par_iter_mut()
            .map(|site| {
                let a = site.axis;
                site.advance(d.component(a).data[site.index], e.component(a).data[site.index])
            })
            .collect();

        for a in 0..3 {
            Zip::from(&mut self.fields.e.component_mut(a).data)
                .and(&self.fields.d.component(a).data)
                .and(&self.epsilon[a])
                .par_for_each(|e, &d, &eps| *e = d / eps);
        }
        for (site, value) in self.sites.iter().zip(solved) {
            self.fields.e.component_mut(site.axis).data[site.index] = value;
        }
    }

    /// Electromagnetic energy `½Σ(E·D + H·B)Δ³` in normalised units
    pub fn electromagnetic_energy(&self) -> f64 {
        let volume = self.grid.resolution.powi(3);
        let electric = self.fields.e.inner_product(&self.fields.d).re;
        let magnetic = self.fields.h.inner_product(&self.fields.b).re;
        0.5 * (electric + magnetic) * volume
    }

    /// Step until the requested simulation time, recording `monitors` after each step
    ///
    /// The cancellation token is checked before every step.
    pub fn run(
        &mut self,
        monitors: &mut [AmplitudeMonitor],
        cancel: Option<&CancelToken>,
    ) -> Result<RunSummary> {
        let start = Instant::now();
        let first_step = self.steps;
        let total = (self.simtime / self.dt).ceil().max(1.0) as usize;
        let report_every = (total / 10).max(1);

        while self.state != EngineState::Finished {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(Error::Cancelled { time: self.time() });
            }
            self.step()?;
            for monitor in monitors.iter_mut() {
                monitor.record(self)?;
            }
            if self.steps % report_every == 0 {
                info!(
                    "t = {:.3e} s ({:.0}%), {:.1} s elapsed",
                    self.time(),
                    100.0 * self.time() / self.simtime,
                    start.elapsed().as_secs_f64()
                );
            }
        }

        Ok(RunSummary {
            steps: self.steps - first_step,
            simulated_time: self.time(),
            elapsed: start.elapsed(),
        })
    }
}

fn shape(grid: &Grid) -> (usize, usize, usize) {
    (grid.cells[0] + 2, grid.cells[1] + 2, grid.cells[2] + 2)
}
