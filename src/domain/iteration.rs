//! Krylov iteration for the frequency-domain Maxwell system
//!
//! Implements BiCGStab(ℓ) (Sleijpen & Fokkema) for complex, non-Hermitian
//! operators. Each outer cycle performs ℓ BiCG steps followed by a minimal
//! residual polynomial of degree ℓ; ℓ = 1 is plain BiCGStab.

use crate::engine::array::{Complex64, VectorField};
use crate::engine::operations::{axpy, copy, dot, norm, scale};
use crate::error::{Error, Result};
use num_traits::Zero;
use tracing::debug;

/// A matrix-free linear operator on vector fields
pub trait LinearOperator {
    /// out = A x
    ///
    /// `x` is mutable so the operator may refresh its halo layers in place;
    /// its interior must be left unchanged.
    fn apply(&mut self, x: &mut VectorField, out: &mut VectorField);
}

/// Result of an iteration
#[derive(Debug, Clone)]
pub struct IterationResult {
    /// Number of BiCG steps performed
    pub iterations: usize,
    /// Final relative residual ||b − Ax|| / ||b||
    pub residual_norm: f64,
    /// History of relative residuals, one per outer cycle (if requested)
    pub residual_history: Option<Vec<f64>>,
}

/// Configuration for BiCGStab(ℓ)
#[derive(Debug, Clone)]
pub struct IterationConfig {
    /// Maximum number of BiCG steps
    pub max_iterations: usize,
    /// Convergence threshold for the relative residual
    pub threshold: f64,
    /// Degree ℓ of the minimal residual polynomial
    pub krylov_dimension: usize,
    /// Whether to record full residual history
    pub full_residuals: bool,
}

impl Default for IterationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            threshold: 1e-3,
            krylov_dimension: 8,
            full_residuals: false,
        }
    }
}

/// Solve `A x = b` with BiCGStab(ℓ), starting from the value in `x`
///
/// Returns a [`Error::NonConvergence`] carrying the last relative residual
/// when the threshold is not reached within `max_iterations` steps or the
/// iteration breaks down.
pub fn bicgstab_l<A: LinearOperator>(
    op: &mut A,
    b: &VectorField,
    x: &mut VectorField,
    config: &IterationConfig,
) -> Result<IterationResult> {
    let l = config.krylov_dimension.max(1);
    let cells = b.x.cells();

    let b_norm = norm(b);
    if b_norm == 0.0 {
        x.clear();
        return Ok(IterationResult {
            iterations: 0,
            residual_norm: 0.0,
            residual_history: config.full_residuals.then(Vec::new),
        });
    }

    // r[0] = b − A x
    let mut r: Vec<VectorField> = (0..=l).map(|_| VectorField::zeros(cells)).collect();
    let mut u: Vec<VectorField> = (0..=l).map(|_| VectorField::zeros(cells)).collect();
    let one = Complex64::new(1.0, 0.0);
    op.apply(x, &mut r[1]);
    copy(b, &mut r[0]);
    {
        let (lo, hi) = r.split_at_mut(1);
        axpy(-one, &hi[0], &mut lo[0]);
    }
    let shadow = r[0].clone();

    let mut residual = norm(&r[0]) / b_norm;
    let mut history = config.full_residuals.then(Vec::new);
    let mut iterations = 0;

    let mut rho0 = one;
    let mut alpha = Complex64::zero();
    let mut omega = one;
    let mut tau = vec![vec![Complex64::zero(); l + 1]; l + 1];
    let mut sigma = vec![0.0; l + 1];
    let mut gamma = vec![Complex64::zero(); l + 1];
    let mut gamma_p = vec![Complex64::zero(); l + 1];
    let mut gamma_pp = vec![Complex64::zero(); l + 1];

    while residual >= config.threshold {
        if iterations >= config.max_iterations {
            return Err(Error::NonConvergence {
                iterations,
                residual,
            });
        }
        rho0 *= -omega;

        // BiCG part
        let mut converged = false;
        for j in 0..l {
            let rho1 = dot(&shadow, &r[j]);
            if rho0.norm() == 0.0 {
                return Err(breakdown(iterations, residual, "rho"));
            }
            let beta = alpha * rho1 / rho0;
            rho0 = rho1;
            for i in 0..=j {
                scale(-beta, &mut u[i]);
                axpy(one, &r[i], &mut u[i]);
            }
            {
                let (lo, hi) = u.split_at_mut(j + 1);
                op.apply(&mut lo[j], &mut hi[0]);
            }
            let gamma_bicg = dot(&shadow, &u[j + 1]);
            if gamma_bicg.norm() == 0.0 {
                return Err(breakdown(iterations, residual, "gamma"));
            }
            alpha = rho0 / gamma_bicg;
            for i in 0..=j {
                axpy(-alpha, &u[i + 1], &mut r[i]);
            }
            {
                let (lo, hi) = r.split_at_mut(j + 1);
                op.apply(&mut lo[j], &mut hi[0]);
            }
            axpy(alpha, &u[0], x);

            let partial = norm(&r[0]) / b_norm;
            if partial < config.threshold {
                iterations += j + 1;
                residual = partial;
                converged = true;
                break;
            }
        }
        if converged {
            if let Some(ref mut h) = history {
                h.push(residual);
            }
            break;
        }

        // MR part: modified Gram-Schmidt on r[1..=l]
        for j in 1..=l {
            for i in 1..j {
                tau[i][j] = dot(&r[i], &r[j]) / sigma[i];
                let (lo, hi) = r.split_at_mut(j);
                axpy(-tau[i][j], &lo[i], &mut hi[0]);
            }
            sigma[j] = r[j].norm_squared();
            if sigma[j] == 0.0 {
                return Err(breakdown(iterations, residual, "sigma"));
            }
            gamma_p[j] = dot(&r[j], &r[0]) / sigma[j];
        }

        gamma[l] = gamma_p[l];
        omega = gamma[l];
        for j in (1..l).rev() {
            let mut s = Complex64::zero();
            for i in (j + 1)..=l {
                s += tau[j][i] * gamma[i];
            }
            gamma[j] = gamma_p[j] - s;
        }
        for j in 1..l {
            let mut s = Complex64::zero();
            for i in (j + 1)..l {
                s += tau[j][i] * gamma[i + 1];
            }
            gamma_pp[j] = gamma[j + 1] + s;
        }

        axpy(gamma[1], &r[0], x);
        {
            let (lo, hi) = r.split_at_mut(1);
            axpy(-gamma_p[l], &hi[l - 1], &mut lo[0]);
        }
        {
            let (lo, hi) = u.split_at_mut(1);
            axpy(-gamma[l], &hi[l - 1], &mut lo[0]);
        }
        for j in 1..l {
            {
                let (lo, hi) = u.split_at_mut(1);
                axpy(-gamma[j], &hi[j - 1], &mut lo[0]);
            }
            axpy(gamma_pp[j], &r[j], x);
            {
                let (lo, hi) = r.split_at_mut(1);
                axpy(-gamma_p[j], &hi[j - 1], &mut lo[0]);
            }
        }

        iterations += l;
        residual = norm(&r[0]) / b_norm;
        if let Some(ref mut h) = history {
            h.push(residual);
        }
        debug!("BiCGStab({l}) step {iterations}: residual {residual:.3e}");
    }

    Ok(IterationResult {
        iterations,
        residual_norm: residual,
        residual_history: history,
    })
}

fn breakdown(iterations: usize, residual: f64, quantity: &str) -> Error {
    debug!("BiCGStab breakdown: {quantity} vanished after {iterations} steps");
    Error::NonConvergence {
        iterations,
        residual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Complex diagonal plus a periodic nearest-neighbour coupling along x
    struct Banded {
        diagonal: Complex64,
        spread: f64,
        coupling: Complex64,
    }

    impl LinearOperator for Banded {
        fn apply(&mut self, x: &mut VectorField, out: &mut VectorField) {
            for (a, (o, xi)) in out.components_mut().into_iter().zip(x.components()).enumerate() {
                let [nx, ny, nz] = xi.cells();
                for i in 1..=nx {
                    let ip = if i == nx { 1 } else { i + 1 };
                    let im = if i == 1 { nx } else { i - 1 };
                    for j in 1..=ny {
                        for k in 1..=nz {
                            let d = self.diagonal + self.spread * (i + 3 * j + 5 * k + 7 * a) as f64;
                            o.data[[i, j, k]] = d * xi.data[[i, j, k]]
                                + self.coupling * (xi.data[[ip, j, k]] + xi.data[[im, j, k]]);
                        }
                    }
                }
            }
        }
    }

    fn rhs(cells: [usize; 3]) -> VectorField {
        let mut b = VectorField::zeros(cells);
        for (a, c) in b.components_mut().into_iter().enumerate() {
            for ((i, j, k), v) in c.interior_mut().indexed_iter_mut() {
                *v = Complex64::new((i + 2 * j) as f64 + 1.0, (k + a) as f64 - 0.5);
            }
        }
        b
    }

    #[test]
    fn test_converges_for_several_degrees() {
        let cells = [12, 2, 2];
        let b = rhs(cells);
        for l in [1, 2, 4] {
            let mut op = Banded {
                diagonal: Complex64::new(3.0, 0.5),
                spread: 0.05,
                coupling: Complex64::new(-1.0, 0.1),
            };
            let mut x = VectorField::zeros(cells);
            let config = IterationConfig {
                threshold: 1e-10,
                krylov_dimension: l,
                full_residuals: true,
                ..Default::default()
            };
            let result = bicgstab_l(&mut op, &b, &mut x, &config).unwrap();
            assert!(result.residual_norm < 1e-10);
            assert!(result.residual_history.unwrap().len() >= 1);

            // check the true residual
            let mut ax = VectorField::zeros(cells);
            op.apply(&mut x, &mut ax);
            ax -= &b;
            assert!(ax.norm_squared().sqrt() / b.norm_squared().sqrt() < 1e-9);
        }
    }

    #[test]
    fn test_zero_rhs() {
        let cells = [3, 3, 3];
        let b = VectorField::zeros(cells);
        let mut x = rhs(cells);
        let mut op = Banded {
            diagonal: Complex64::new(1.0, 0.0),
            spread: 0.0,
            coupling: Complex64::zero(),
        };
        let result = bicgstab_l(&mut op, &b, &mut x, &IterationConfig::default()).unwrap();
        assert_eq!(result.iterations, 0);
        assert_relative_eq!(x.norm_squared(), 0.0);
    }

    #[test]
    fn test_starts_from_initial_guess() {
        let cells = [10, 2, 1];
        let b = rhs(cells);
        let mut op = Banded {
            diagonal: Complex64::new(2.5, -0.3),
            spread: 0.02,
            coupling: Complex64::new(-0.8, 0.0),
        };
        // a guess far from the solution; the first residual is b − A x
        let mut x = rhs(cells);
        x *= Complex64::new(-3.0, 1.0);
        let config = IterationConfig {
            threshold: 1e-10,
            krylov_dimension: 2,
            ..Default::default()
        };
        let result = bicgstab_l(&mut op, &b, &mut x, &config).unwrap();
        assert!(result.iterations > 0);

        let mut ax = VectorField::zeros(cells);
        op.apply(&mut x, &mut ax);
        ax -= &b;
        assert!(ax.norm_squared().sqrt() / b.norm_squared().sqrt() < 1e-9);
    }

    #[test]
    fn test_reports_non_convergence() {
        let cells = [16, 1, 1];
        let b = rhs(cells);
        let mut x = VectorField::zeros(cells);
        // indefinite operator, far too few steps allowed
        let mut op = Banded {
            diagonal: Complex64::new(0.3, 0.001),
            spread: 0.0,
            coupling: Complex64::new(-1.0, 0.0),
        };
        let config = IterationConfig {
            threshold: 1e-12,
            max_iterations: 2,
            krylov_dimension: 2,
            full_residuals: false,
        };
        match bicgstab_l(&mut op, &b, &mut x, &config) {
            Err(Error::NonConvergence { residual, .. }) => assert!(residual > 1e-12),
            other => panic!("expected non-convergence, got {other:?}"),
        }
    }
}
