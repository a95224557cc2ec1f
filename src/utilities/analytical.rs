//! Closed-form references for checking simulations
//!
//! Reflection at a flat interface, mixing rules for simple composites and
//! the numerical dispersion of the Yee scheme. Permittivities are relative
//! and complex; `n = √ε` takes the root with non-negative imaginary part.

use crate::engine::array::Complex64;
use crate::grid::SPEED_OF_LIGHT;

/// Refractive index of a (possibly lossy) medium
pub fn refractive_index(epsilon: Complex64, mu: Complex64) -> Complex64 {
    let n = (epsilon * mu).sqrt();
    if n.im < 0.0 {
        -n
    } else {
        n
    }
}

/// Amplitude reflection coefficient at normal incidence from medium 1 into medium 2
///
/// Non-magnetic media: `r = (n1 − n2)/(n1 + n2)`.
pub fn fresnel_reflection(epsilon1: Complex64, epsilon2: Complex64) -> Complex64 {
    let one = Complex64::new(1.0, 0.0);
    let n1 = refractive_index(epsilon1, one);
    let n2 = refractive_index(epsilon2, one);
    (n1 - n2) / (n1 + n2)
}

/// Amplitude transmission coefficient at normal incidence, `t = 2n1/(n1 + n2)`
pub fn fresnel_transmission(epsilon1: Complex64, epsilon2: Complex64) -> Complex64 {
    let one = Complex64::new(1.0, 0.0);
    let n1 = refractive_index(epsilon1, one);
    let n2 = refractive_index(epsilon2, one);
    n1 * 2.0 / (n1 + n2)
}

/// Permittivity of a layered composite for a field parallel to the layers
pub fn wiener_parallel(epsilon: Complex64, host: Complex64, fill: f64) -> Complex64 {
    epsilon * fill + host * (1.0 - fill)
}

/// Permittivity of a layered composite for a field normal to the layers
pub fn wiener_normal(epsilon: Complex64, host: Complex64, fill: f64) -> Complex64 {
    (epsilon * host) / (host * fill + epsilon * (1.0 - fill))
}

/// Maxwell Garnett permittivity of spheres with volume fraction `fill` in `host`
pub fn maxwell_garnett(epsilon: Complex64, host: Complex64, fill: f64) -> Complex64 {
    let contrast = (epsilon - host) / (epsilon + host * 2.0);
    host * (contrast * 2.0 * fill + 1.0) / (-contrast * fill + 1.0)
}

/// Numerical wavenumber of the Yee scheme for a plane wave along a grid axis
///
/// Solves `sin(kΔ/2)/Δ = n sin(ωdt/2)/(c dt)`. Above the grid cutoff the
/// wave is evanescent and `None` is returned.
pub fn yee_wavenumber(omega: f64, resolution: f64, dt: f64, index: f64) -> Option<f64> {
    let s = index * resolution * (0.5 * omega * dt).sin() / (SPEED_OF_LIGHT * dt);
    (s.abs() <= 1.0).then(|| 2.0 * s.asin() / resolution)
}

/// Grid-consistent `k²` of the second difference, `(2 sin(kΔ/2)/Δ)²`
pub fn discrete_wavenumber_squared(k: f64, resolution: f64) -> f64 {
    (2.0 * (0.5 * k * resolution).sin() / resolution).powi(2)
}

/// Grid-consistent `k0` of the leapfrog, `2 sin(ωdt/2)/(c dt)`
pub fn discrete_vacuum_wavenumber(omega: f64, dt: f64) -> f64 {
    2.0 * (0.5 * omega * dt).sin() / (SPEED_OF_LIGHT * dt)
}
