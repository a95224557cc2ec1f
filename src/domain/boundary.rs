//! Boundary conditions: halo filling and absorbing layers
//!
//! Each axis carries one [`BoundaryCondition`]. Bloch axes wrap the field
//! around with a phase `e^{ikL}`; all other axes see zero halos (a perfect
//! electric wall, turned absorbing by a PML inside the grid).

use crate::engine::array::{Complex64, FieldArray, VectorField};
use crate::error::{Error, Result};
use crate::grid::{Direction, Grid};
use ndarray::{Array3, Axis};
use num_traits::Zero;

/// Narrowest PML accepted, in cells
pub const MIN_PML_CELLS: usize = 4;

/// Graded conductivity profile of a perfectly matched layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PmlProfile {
    /// Layer thickness in cells
    pub thickness: usize,
    /// Polynomial grading order m
    pub grading_order: f64,
    /// Target normal-incidence reflection R
    pub reflection: f64,
}

impl Default for PmlProfile {
    fn default() -> Self {
        Self {
            thickness: 8,
            grading_order: 3.0,
            reflection: 1e-6,
        }
    }
}

impl PmlProfile {
    pub fn new(thickness: usize) -> Self {
        Self {
            thickness,
            ..Default::default()
        }
    }

    /// Peak conductivity (1/m): `−(m+1) ln R / (2 d)`
    pub fn sigma_max(&self, resolution: f64) -> f64 {
        let width = self.thickness as f64 * resolution;
        -(self.grading_order + 1.0) * self.reflection.ln() / (2.0 * width)
    }

    /// Conductivity at `depth` (m) inside the layer, zero outside it
    pub fn conductivity(&self, depth: f64, resolution: f64) -> f64 {
        if depth <= 0.0 {
            return 0.0;
        }
        let width = self.thickness as f64 * resolution;
        let rho = (depth / width).min(1.0);
        self.sigma_max(resolution) * rho.powf(self.grading_order)
    }
}

/// Boundary condition of one axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum BoundaryCondition {
    /// Zero halos (electric wall)
    #[default]
    None,
    /// Phase-shifted periodic wrap, `k` in rad/m
    Bloch { k: f64 },
    /// Absorbing layer at both ends of the axis
    Pml(PmlProfile),
}

/// Boundary conditions of all three axes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundaries {
    pub axes: [BoundaryCondition; 3],
}

impl Boundaries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bloch-periodic on every axis with wavevector `k` (rad/m)
    pub fn bloch(k: [f64; 3]) -> Self {
        Self {
            axes: [
                BoundaryCondition::Bloch { k: k[0] },
                BoundaryCondition::Bloch { k: k[1] },
                BoundaryCondition::Bloch { k: k[2] },
            ],
        }
    }

    pub fn get(&self, axis: Direction) -> BoundaryCondition {
        self.axes[axis.index()]
    }

    /// Make `axis` Bloch-periodic with wavevector component `k`
    pub fn apply_bloch(&mut self, axis: Direction, k: f64) -> Result<()> {
        if let BoundaryCondition::Pml(_) = self.axes[axis.index()] {
            return Err(Error::Configuration(format!(
                "axis {axis:?} already has a PML; Bloch and PML are exclusive"
            )));
        }
        self.axes[axis.index()] = BoundaryCondition::Bloch { k };
        Ok(())
    }

    /// Put an absorbing layer on both ends of `axis`
    pub fn apply_pml(&mut self, axis: Direction, profile: PmlProfile) -> Result<()> {
        if let BoundaryCondition::Bloch { .. } = self.axes[axis.index()] {
            return Err(Error::Configuration(format!(
                "axis {axis:?} is Bloch-periodic; Bloch and PML are exclusive"
            )));
        }
        if profile.thickness < MIN_PML_CELLS {
            return Err(Error::Configuration(format!(
                "PML on axis {axis:?} needs at least {MIN_PML_CELLS} cells, got {}",
                profile.thickness
            )));
        }
        if !(profile.reflection > 0.0 && profile.reflection < 1.0) {
            return Err(Error::Configuration(format!(
                "PML reflection must lie in (0, 1), got {}",
                profile.reflection
            )));
        }
        self.axes[axis.index()] = BoundaryCondition::Pml(profile);
        Ok(())
    }

    /// Check the layers fit in `grid`
    pub fn validate(&self, grid: &Grid) -> Result<()> {
        for axis in Direction::ALL {
            if let BoundaryCondition::Pml(profile) = self.get(axis) {
                if 2 * profile.thickness >= grid.cells[axis.index()] {
                    return Err(Error::Configuration(format!(
                        "PML of {} cells does not fit twice in the {} cells of axis {axis:?}",
                        profile.thickness,
                        grid.cells[axis.index()]
                    )));
                }
            }
        }
        Ok(())
    }

    /// True when no axis absorbs
    pub fn is_lossless(&self) -> bool {
        !self
            .axes
            .iter()
            .any(|bc| matches!(bc, BoundaryCondition::Pml(_)))
    }

    /// Refresh the halos of every component of `field`
    pub fn fill_halos(&self, field: &mut VectorField, grid: &Grid) {
        for component in field.components_mut() {
            self.fill_array_halos(component, grid);
        }
    }

    /// Refresh the halos of one component, axis by axis
    pub fn fill_array_halos(&self, array: &mut FieldArray, grid: &Grid) {
        for axis in Direction::ALL {
            let a = axis.index();
            match self.axes[a] {
                BoundaryCondition::Bloch { k } => {
                    apply_bloch(&mut array.data, a, k * grid.length(a));
                }
                BoundaryCondition::None | BoundaryCondition::Pml(_) => {
                    apply_zero(&mut array.data, a);
                }
            }
        }
    }
}

/// Fill the halos of `axis` with the opposite interior plane times `e^{±i phase}`
///
/// The upper halo receives the first interior plane times `e^{i phase}`, the
/// lower halo the last interior plane times `e^{-i phase}`.
pub fn apply_bloch(array: &mut Array3<Complex64>, axis: usize, phase: f64) {
    let n = array.len_of(Axis(axis)) - 2;
    let factor = Complex64::from_polar(1.0, phase);
    let first = array.index_axis(Axis(axis), 1).to_owned();
    let last = array.index_axis(Axis(axis), n).to_owned();
    array
        .index_axis_mut(Axis(axis), n + 1)
        .assign(&(first * factor));
    array
        .index_axis_mut(Axis(axis), 0)
        .assign(&(last * factor.conj()));
}

/// Plain periodic wrap of the halos of `axis`
pub fn apply_periodic(array: &mut Array3<Complex64>, axis: usize) {
    let n = array.len_of(Axis(axis)) - 2;
    let first = array.index_axis(Axis(axis), 1).to_owned();
    let last = array.index_axis(Axis(axis), n).to_owned();
    array.index_axis_mut(Axis(axis), n + 1).assign(&first);
    array.index_axis_mut(Axis(axis), 0).assign(&last);
}

/// Zero both halos of `axis`
pub fn apply_zero(array: &mut Array3<Complex64>, axis: usize) {
    let n = array.len_of(Axis(axis)) - 2;
    array.index_axis_mut(Axis(axis), 0).fill(Complex64::zero());
    array.index_axis_mut(Axis(axis), n + 1).fill(Complex64::zero());
}

/// PML conductivity of every axis, at integer and half-integer nodes
#[derive(Debug, Clone)]
pub struct ConductivityProfile {
    /// `sigma[axis][stagger][index]`, stagger 0 = node offset 0, 1 = offset ½
    sigma: [[Vec<f64>; 2]; 3],
    any: bool,
}

impl ConductivityProfile {
    pub fn new(grid: &Grid, boundaries: &Boundaries) -> Self {
        let mut any = false;
        let sigma = std::array::from_fn(|a| {
            let n = grid.cells[a];
            std::array::from_fn(|stagger| {
                let mut profile = vec![0.0; n + 2];
                if let BoundaryCondition::Pml(pml) = boundaries.axes[a] {
                    any = true;
                    let half_length = 0.5 * grid.length(a);
                    let width = pml.thickness as f64 * grid.resolution;
                    let offset = 0.5 * stagger as f64;
                    for (i, s) in profile.iter_mut().enumerate().take(n + 1).skip(1) {
                        let x = grid.coordinate(a, i, offset);
                        let depth = (x - (half_length - width)).max(-half_length + width - x);
                        *s = pml.conductivity(depth, grid.resolution);
                    }
                }
                profile
            })
        });
        Self { sigma, any }
    }

    /// True when some axis has a layer
    pub fn is_active(&self) -> bool {
        self.any
    }

    /// Summed conductivity (1/m) at a node with staggered `offset`
    #[inline]
    pub fn at(&self, offset: [f64; 3], index: [usize; 3]) -> f64 {
        (0..3)
            .map(|a| self.sigma[a][usize::from(offset[a] > 0.0)][index[a]])
            .sum()
    }
}

/// Update coefficients `(decay, gain)` for a conductivity `sigma` (1/m)
///
/// Semi-implicit loss term: `F⁺ = decay·F + gain·rhs` with
/// `decay = (1 − σcdt/2)/(1 + σcdt/2)`, `gain = cdt/(1 + σcdt/2)`.
#[inline]
pub fn loss_coefficients(sigma: f64, cdt: f64) -> (f64, f64) {
    let half = 0.5 * sigma * cdt;
    ((1.0 - half) / (1.0 + half), cdt / (1.0 + half))
}
