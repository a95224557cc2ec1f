//! Field array types for the Yee grid
//!
//! Every field component is stored as a complex 3D array with one halo layer on
//! each side, so an axis with `n` cells is backed by `n + 2` entries. Interior
//! cells live at indices `1..=n`; the halo planes at `0` and `n + 1` are filled
//! by the boundary layer before each curl.

use ndarray::{s, Array3, ArrayView3, ArrayViewMut3, Zip};
use num_complex::Complex;
use num_traits::Zero;
use std::ops::{AddAssign, MulAssign, SubAssign};

/// Type alias for Complex64
pub type Complex64 = Complex<f64>;

/// A single complex field component with halo layers
#[derive(Debug, Clone)]
pub struct FieldArray {
    /// The underlying ndarray, halo included
    pub data: Array3<Complex64>,
}

impl FieldArray {
    /// Create a zeroed array for a grid with `cells` interior cells per axis
    pub fn zeros(cells: [usize; 3]) -> Self {
        Self {
            data: Array3::zeros((cells[0] + 2, cells[1] + 2, cells[2] + 2)),
        }
    }

    /// Create an array filled with `value` (halo included)
    pub fn from_scalar(cells: [usize; 3], value: Complex64) -> Self {
        Self {
            data: Array3::from_elem((cells[0] + 2, cells[1] + 2, cells[2] + 2), value),
        }
    }

    /// Number of interior cells per axis
    pub fn cells(&self) -> [usize; 3] {
        let shape = self.data.shape();
        [shape[0] - 2, shape[1] - 2, shape[2] - 2]
    }

    /// View of the interior cells only
    pub fn interior(&self) -> ArrayView3<'_, Complex64> {
        let [nx, ny, nz] = self.cells();
        self.data.slice(s![1..nx + 1, 1..ny + 1, 1..nz + 1])
    }

    /// Mutable view of the interior cells only
    pub fn interior_mut(&mut self) -> ArrayViewMut3<'_, Complex64> {
        let [nx, ny, nz] = self.cells();
        self.data.slice_mut(s![1..nx + 1, 1..ny + 1, 1..nz + 1])
    }

    /// Fill the whole array (halo included) with a scalar value
    pub fn fill(&mut self, value: Complex64) {
        self.data.fill(value);
    }

    /// Squared 2-norm over the interior
    pub fn norm_squared(&self) -> f64 {
        self.interior().iter().map(|c| c.norm_sqr()).sum()
    }

    /// Inner product `<self, other>` over the interior, conjugating `self`
    pub fn inner_product(&self, other: &Self) -> Complex64 {
        Zip::from(self.interior())
            .and(other.interior())
            .fold(Complex64::zero(), |acc, &a, &b| acc + a.conj() * b)
    }

    /// True when every interior value is finite
    pub fn is_finite(&self) -> bool {
        self.interior().iter().all(|c| c.re.is_finite() && c.im.is_finite())
    }
}

/// Three Cartesian components of a vector field (E, D, H or B)
#[derive(Debug, Clone)]
pub struct VectorField {
    pub x: FieldArray,
    pub y: FieldArray,
    pub z: FieldArray,
}

impl VectorField {
    /// Create a zeroed vector field
    pub fn zeros(cells: [usize; 3]) -> Self {
        Self {
            x: FieldArray::zeros(cells),
            y: FieldArray::zeros(cells),
            z: FieldArray::zeros(cells),
        }
    }

    /// Component along axis `axis` (0, 1, 2)
    pub fn component(&self, axis: usize) -> &FieldArray {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("axis index out of range: {axis}"),
        }
    }

    /// Mutable component along axis `axis` (0, 1, 2)
    pub fn component_mut(&mut self, axis: usize) -> &mut FieldArray {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("axis index out of range: {axis}"),
        }
    }

    /// All three components, in axis order
    pub fn components(&self) -> [&FieldArray; 3] {
        [&self.x, &self.y, &self.z]
    }

    /// All three components mutably, in axis order
    pub fn components_mut(&mut self) -> [&mut FieldArray; 3] {
        [&mut self.x, &mut self.y, &mut self.z]
    }

    /// Set every entry (halo included) to zero
    pub fn clear(&mut self) {
        for c in self.components_mut() {
            c.fill(Complex64::zero());
        }
    }

    /// Squared 2-norm over the interior of all components
    pub fn norm_squared(&self) -> f64 {
        self.components().iter().map(|c| c.norm_squared()).sum()
    }

    /// Inner product over all components, conjugating `self`
    pub fn inner_product(&self, other: &Self) -> Complex64 {
        self.components()
            .iter()
            .zip(other.components())
            .map(|(a, b)| a.inner_product(b))
            .fold(Complex64::zero(), |acc, x| acc + x)
    }

    pub fn is_finite(&self) -> bool {
        self.components().iter().all(|c| c.is_finite())
    }
}

impl AddAssign<&VectorField> for VectorField {
    fn add_assign(&mut self, other: &VectorField) {
        for (a, b) in self.components_mut().into_iter().zip(other.components()) {
            a.data += &b.data;
        }
    }
}

impl SubAssign<&VectorField> for VectorField {
    fn sub_assign(&mut self, other: &VectorField) {
        for (a, b) in self.components_mut().into_iter().zip(other.components()) {
            a.data -= &b.data;
        }
    }
}

impl MulAssign<Complex64> for VectorField {
    fn mul_assign(&mut self, scalar: Complex64) {
        for a in self.components_mut() {
            a.data *= scalar;
        }
    }
}
