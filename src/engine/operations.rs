//! BLAS-like operations on vector fields
//!
//! These are the building blocks of the Krylov solver. They act on whole
//! arrays (halo included) and run in parallel through ndarray's rayon support.

use crate::engine::array::{Complex64, VectorField};
use ndarray::Zip;

/// In-place update: y += alpha * x
pub fn axpy(alpha: Complex64, x: &VectorField, y: &mut VectorField) {
    for (y, x) in y.components_mut().into_iter().zip(x.components()) {
        Zip::from(&mut y.data)
            .and(&x.data)
            .par_for_each(|y_val, &x_val| *y_val += alpha * x_val);
    }
}

/// In-place scaling: x *= alpha
pub fn scale(alpha: Complex64, x: &mut VectorField) {
    for c in x.components_mut() {
        c.data.par_mapv_inplace(|v| alpha * v);
    }
}

/// Copy data from one field to another
pub fn copy(source: &VectorField, dest: &mut VectorField) {
    for (d, s) in dest.components_mut().into_iter().zip(source.components()) {
        d.data.assign(&s.data);
    }
}

/// Conjugated inner product `<a, b>` over the interior
pub fn dot(a: &VectorField, b: &VectorField) -> Complex64 {
    a.inner_product(b)
}

/// 2-norm over the interior
pub fn norm(a: &VectorField) -> f64 {
    a.norm_squared().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn filled(value: Complex64) -> VectorField {
        let mut v = VectorField::zeros([2, 2, 2]);
        for c in v.components_mut() {
            c.fill(value);
        }
        v
    }

    #[test]
    fn test_axpy_and_scale() {
        let x = filled(Complex64::new(1.0, 1.0));
        let mut y = filled(Complex64::new(1.0, 0.0));
        axpy(Complex64::new(0.0, 1.0), &x, &mut y);
        // 1 + i(1 + i) = i
        assert_eq!(y.x.data[[2, 1, 2]], Complex64::new(0.0, 1.0));

        scale(Complex64::new(2.0, 0.0), &mut y);
        assert_eq!(y.x.data[[2, 1, 2]], Complex64::new(0.0, 2.0));
    }

    #[test]
    fn test_dot_and_norm() {
        let a = filled(Complex64::new(1.0, 0.0));
        // 3 components * 8 interior cells
        assert_abs_diff_eq!(dot(&a, &a).re, 24.0, epsilon = 1e-12);
        assert_abs_diff_eq!(norm(&a), 24f64.sqrt(), epsilon = 1e-12);
    }
}
