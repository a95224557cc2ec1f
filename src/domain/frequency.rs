//! Continuous-wave (frequency-domain) solver
//!
//! For a monochromatic current `J e^{−iωt}` the leapfrog equations reduce to
//!
//! ```text
//! curl_b (1/μ') curl_f E − k0² ε'(ω) E = i k0 J,      k0 = ω/c
//! ```
//!
//! with the dispersive permittivity `ε(ω) = ε∞ + Σχ_p(ω)` and the PML entering
//! as the complex scaling `(1 + iσc/ω)` of both ε and μ. The system is solved
//! matrix-free with BiCGStab(ℓ) on the engine's grid, halos and boundaries.

use crate::domain::boundary::{Boundaries, ConductivityProfile};
use crate::domain::iteration::{bicgstab_l, IterationConfig, IterationResult, LinearOperator};
use crate::domain::maxwell::{curl_backward, curl_forward, Engine, EngineState};
use crate::domain_decomposition::SlabDecomposition;
use crate::engine::array::{Complex64, VectorField};
use crate::error::{Error, Result};
use crate::grid::{Component, Direction, Grid, SPEED_OF_LIGHT};
use ndarray::{Array3, Zip};
use std::f64::consts::PI;
use std::time::Instant;
use tracing::info;

/// `A = curl_b (1/μ') curl_f − k0² ε'` on the staggered grid
pub struct CurlCurlOperator<'a> {
    grid: &'a Grid,
    boundaries: &'a Boundaries,
    decomposition: &'a SlabDecomposition,
    k0: f64,
    /// ε' at the electric nodes
    epsilon: [Array3<Complex64>; 3],
    /// 1/μ' at the magnetic nodes
    inv_mu: [Array3<Complex64>; 3],
    /// (1/μ') curl_f x / Δ, kept between calls
    scratch: VectorField,
}

/// Complex PML stretch `1 + iσc/ω` of a node
fn pml_factor(
    conductivity: &ConductivityProfile,
    offset: [f64; 3],
    idx: [usize; 3],
    omega: f64,
) -> Complex64 {
    Complex64::new(1.0, conductivity.at(offset, idx) * SPEED_OF_LIGHT / omega)
}

impl<'a> CurlCurlOperator<'a> {
    /// Assemble the operator of `engine` at angular frequency `omega`
    pub fn new(engine: &'a Engine, omega: f64) -> Self {
        let grid = &engine.grid;
        let conductivity = &engine.conductivity;

        let epsilon: [Array3<Complex64>; 3] = std::array::from_fn(|a| {
            let offset = Component::electric(Direction::ALL[a]).offset();
            let mut eps = engine.epsilon[a].mapv(|e| Complex64::new(e, 0.0));
            for site in engine.sites.iter().filter(|s| s.axis == a) {
                eps[site.index] = site.permittivity(omega);
            }
            Zip::indexed(&mut eps).par_for_each(|(i, j, k), e| {
                *e *= pml_factor(conductivity, offset, [i, j, k], omega);
            });
            eps
        });
        let inv_mu: [Array3<Complex64>; 3] = std::array::from_fn(|a| {
            let offset = Component::magnetic(Direction::ALL[a]).offset();
            let mut inv = engine.mu[a].mapv(|m| Complex64::new(m, 0.0));
            Zip::indexed(&mut inv).par_for_each(|(i, j, k), m| {
                *m = (*m * pml_factor(conductivity, offset, [i, j, k], omega)).inv();
            });
            inv
        });

        Self {
            grid,
            boundaries: &engine.boundaries,
            decomposition: &engine.decomposition,
            k0: omega / SPEED_OF_LIGHT,
            epsilon,
            inv_mu,
            scratch: VectorField::zeros(grid.cells),
        }
    }

    pub fn wavenumber(&self) -> f64 {
        self.k0
    }

    /// `(1/μ') curl_f x / Δ` of the last applied vector
    pub fn scaled_curl(&self) -> &VectorField {
        &self.scratch
    }
}

impl LinearOperator for CurlCurlOperator<'_> {
    fn apply(&mut self, x: &mut VectorField, out: &mut VectorField) {
        let grid = self.grid;
        let decomposition = self.decomposition;
        let inv_dx = 1.0 / grid.resolution;
        let k0_squared = self.k0 * self.k0;

        self.boundaries.fill_halos(x, grid);
        let x: &VectorField = x;
        for a in 0..3 {
            let inv_mu = &self.inv_mu[a];
            decomposition.for_each_interior(&mut self.scratch.component_mut(a).data, |idx, h| {
                *h = curl_forward(x, a, idx) * inv_mu[idx] * inv_dx;
            });
        }
        self.boundaries.fill_halos(&mut self.scratch, grid);

        let h = &self.scratch;
        for a in 0..3 {
            let eps = &self.epsilon[a];
            let xa = &x.component(a).data;
            decomposition.for_each_interior(&mut out.component_mut(a).data, |idx, o| {
                *o = curl_backward(h, a, idx) * inv_dx - eps[idx] * xa[idx] * k0_squared;
            });
        }
    }
}

impl Engine {
    /// Frequency of the continuous sources, which must all agree
    fn cw_frequency(&self) -> Result<f64> {
        let mut frequency = None;
        for source in &self.sources {
            if !source.time_profile.is_continuous() {
                return Err(Error::Configuration(format!(
                    "CW solve needs continuous sources only, found {:?}",
                    source.time_profile
                )));
            }
            let f = source.time_profile.frequency();
            match frequency {
                None => frequency = Some(f),
                Some(f0) if (f - f0).abs() > 1e-12 * f0.abs() => {
                    return Err(Error::Configuration(format!(
                        "CW sources disagree in frequency: {f0:e} Hz and {f:e} Hz"
                    )))
                }
                Some(_) => {}
            }
        }
        frequency.ok_or_else(|| Error::Configuration("CW solve needs a continuous source".into()))
    }

    /// Right-hand side `i k0 J` of the CW system
    fn cw_rhs(&self, k0: f64) -> VectorField {
        let mut rhs = VectorField::zeros(self.grid.cells);
        let [nx, ny, nz] = self.grid.cells;
        let factor = Complex64::new(0.0, k0);
        for source in &self.sources {
            let component = source.component;
            let data = &mut rhs.component_mut(component.direction().index()).data;
            for i in 1..=nx {
                for j in 1..=ny {
                    for k in 1..=nz {
                        let r = self.grid.position(component, [i, j, k]);
                        if source.region.contains(r) {
                            data[[i, j, k]] += factor * source.amplitude_at(r);
                        }
                    }
                }
            }
        }
        rhs
    }

    /// Solve for the steady-state response to the continuous sources
    ///
    /// Only allowed before the first time step. On success E, D, H and B hold
    /// the complex amplitudes of the `e^{−iωt}` solution and the engine is
    /// finished.
    pub fn solve_cw(
        &mut self,
        tolerance: f64,
        max_iterations: usize,
        krylov_dimension: usize,
    ) -> Result<IterationResult> {
        if self.state != EngineState::Initialized {
            return Err(Error::State(
                "CW solve is only possible before time stepping".into(),
            ));
        }
        let frequency = self.cw_frequency()?;
        let omega = 2.0 * PI * frequency;
        let start = Instant::now();
        let config = IterationConfig {
            max_iterations,
            threshold: tolerance,
            krylov_dimension,
            full_residuals: false,
        };

        let (e, h, result) = {
            let mut op = CurlCurlOperator::new(self, omega);
            let rhs = self.cw_rhs(op.wavenumber());
            let mut e = VectorField::zeros(self.grid.cells);
            let result = bicgstab_l(&mut op, &rhs, &mut e, &config)?;

            // one more application leaves (1/μ') curl_f E / Δ in the scratch field
            let mut residual = VectorField::zeros(self.grid.cells);
            op.apply(&mut e, &mut residual);
            let mut h = op.scaled_curl().clone();
            h *= Complex64::new(0.0, -1.0 / op.wavenumber());
            (e, h, result)
        };

        for a in 0..3 {
            let mut d = e.component(a).data.clone();
            Zip::from(&mut d)
                .and(&self.epsilon[a])
                .par_for_each(|d, &eps| *d *= eps);
            for site in self.sites.iter().filter(|s| s.axis == a) {
                d[site.index] = e.component(a).data[site.index] * site.permittivity(omega);
            }
            self.fields.d.component_mut(a).data = d;

            Zip::from(&mut self.fields.b.component_mut(a).data)
                .and(&h.component(a).data)
                .and(&self.mu[a])
                .par_for_each(|b, &h, &mu| *b = h * mu);
        }
        self.fields.e = e;
        self.fields.h = h;
        self.state = EngineState::Finished;

        info!(
            "CW solve at {:.4e} Hz: {} iterations, residual {:.3e}, {:.1} s",
            frequency,
            result.iterations,
            result.residual_norm,
            start.elapsed().as_secs_f64()
        );
        Ok(result)
    }
}
