//! Yee grid geometry and field storage
//!
//! The grid is a cubic-cell Cartesian lattice centred on the origin. Field
//! components follow the Yee staggering: each electric component sits half a
//! cell along its own axis, each magnetic component half a cell along the two
//! other axes. D shares E's positions and B shares H's.

use crate::engine::array::{Complex64, FieldArray, VectorField};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Largest Courant number for which the 3D leapfrog scheme is stable
pub const MAX_COURANT: f64 = 0.577_350_269_189_625_8; // 1/sqrt(3)

/// Cartesian axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    X,
    Y,
    Z,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::X, Direction::Y, Direction::Z];

    /// Array axis index (0, 1, 2)
    pub fn index(self) -> usize {
        match self {
            Direction::X => 0,
            Direction::Y => 1,
            Direction::Z => 2,
        }
    }
}

/// Electric or magnetic field family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Electric,
    Magnetic,
}

/// A single field component of the Yee cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Component {
    Ex,
    Ey,
    Ez,
    Hx,
    Hy,
    Hz,
}

impl Component {
    pub fn electric(direction: Direction) -> Self {
        match direction {
            Direction::X => Component::Ex,
            Direction::Y => Component::Ey,
            Direction::Z => Component::Ez,
        }
    }

    pub fn magnetic(direction: Direction) -> Self {
        match direction {
            Direction::X => Component::Hx,
            Direction::Y => Component::Hy,
            Direction::Z => Component::Hz,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Component::Ex | Component::Hx => Direction::X,
            Component::Ey | Component::Hy => Direction::Y,
            Component::Ez | Component::Hz => Direction::Z,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Component::Ex | Component::Ey | Component::Ez => FieldKind::Electric,
            Component::Hx | Component::Hy | Component::Hz => FieldKind::Magnetic,
        }
    }

    pub fn is_electric(self) -> bool {
        self.kind() == FieldKind::Electric
    }

    /// Staggered offset of this component inside the cell, in units of cells
    pub fn offset(self) -> [f64; 3] {
        let axis = self.direction().index();
        let mut offset = match self.kind() {
            FieldKind::Electric => [0.0; 3],
            FieldKind::Magnetic => [0.5; 3],
        };
        offset[axis] = match self.kind() {
            FieldKind::Electric => 0.5,
            FieldKind::Magnetic => 0.0,
        };
        offset
    }

    pub fn name(self) -> &'static str {
        match self {
            Component::Ex => "Ex",
            Component::Ey => "Ey",
            Component::Ez => "Ez",
            Component::Hx => "Hx",
            Component::Hy => "Hy",
            Component::Hz => "Hz",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structured Cartesian grid with cubic cells
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Interior cells per axis
    pub cells: [usize; 3],
    /// Cell edge length (m)
    pub resolution: f64,
}

impl Grid {
    /// Create a grid covering `size` (m) with cells of edge `resolution`
    ///
    /// Each axis gets `round(size / resolution)` cells, at least one.
    pub fn new(size: [f64; 3], resolution: f64) -> Result<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return Err(Error::Configuration(format!(
                "resolution must be positive, got {resolution}"
            )));
        }
        let mut cells = [1usize; 3];
        for (axis, &length) in size.iter().enumerate() {
            if !(length.is_finite() && length > 0.0) {
                return Err(Error::Configuration(format!(
                    "size along axis {axis} must be positive, got {length}"
                )));
            }
            cells[axis] = ((length / resolution).round() as usize).max(1);
        }
        Ok(Self { cells, resolution })
    }

    /// Create a grid from explicit cell counts
    pub fn from_cells(cells: [usize; 3], resolution: f64) -> Result<Self> {
        if cells.iter().any(|&n| n == 0) {
            return Err(Error::Configuration(format!(
                "every axis needs at least one cell, got {cells:?}"
            )));
        }
        let size = [
            cells[0] as f64 * resolution,
            cells[1] as f64 * resolution,
            cells[2] as f64 * resolution,
        ];
        let grid = Self::new(size, resolution)?;
        Ok(Self { cells, ..grid })
    }

    /// Physical length of an axis (m)
    pub fn length(&self, axis: usize) -> f64 {
        self.cells[axis] as f64 * self.resolution
    }

    pub fn size(&self) -> [f64; 3] {
        [self.length(0), self.length(1), self.length(2)]
    }

    /// Coordinate of array index `index` along `axis` for a node with the given offset
    pub fn coordinate(&self, axis: usize, index: usize, offset: f64) -> f64 {
        -0.5 * self.length(axis) + (index as f64 - 1.0 + offset) * self.resolution
    }

    /// Physical position of a component's node at array index `index`
    pub fn position(&self, component: Component, index: [usize; 3]) -> [f64; 3] {
        let offset = component.offset();
        [
            self.coordinate(0, index[0], offset[0]),
            self.coordinate(1, index[1], offset[1]),
            self.coordinate(2, index[2], offset[2]),
        ]
    }

    /// Array index of the component's node nearest to `position`, clamped to the interior
    pub fn nearest_index(&self, component: Component, position: [f64; 3]) -> [usize; 3] {
        let offset = component.offset();
        let mut index = [1usize; 3];
        for axis in 0..3 {
            let cell =
                (position[axis] + 0.5 * self.length(axis)) / self.resolution - offset[axis];
            let i = cell.round().max(0.0) as usize + 1;
            index[axis] = i.min(self.cells[axis]);
        }
        index
    }

    /// Time step for a Courant number `courant`: dt = courant * Δ / c
    pub fn time_step(&self, courant: f64) -> Result<f64> {
        if !(courant > 0.0 && courant <= MAX_COURANT) {
            return Err(Error::Configuration(format!(
                "Courant number must lie in (0, {MAX_COURANT:.4}], got {courant}"
            )));
        }
        Ok(courant * self.resolution / SPEED_OF_LIGHT)
    }
}

/// Electric and magnetic fields of the Yee grid
#[derive(Debug, Clone)]
pub struct ElectromagneticFields {
    pub e: VectorField,
    pub d: VectorField,
    pub h: VectorField,
    pub b: VectorField,
}

impl ElectromagneticFields {
    pub fn zeros(cells: [usize; 3]) -> Self {
        Self {
            e: VectorField::zeros(cells),
            d: VectorField::zeros(cells),
            h: VectorField::zeros(cells),
            b: VectorField::zeros(cells),
        }
    }

    /// Array holding `component` (E for electric, H for magnetic)
    pub fn array(&self, component: Component) -> &FieldArray {
        let axis = component.direction().index();
        match component.kind() {
            FieldKind::Electric => self.e.component(axis),
            FieldKind::Magnetic => self.h.component(axis),
        }
    }

    /// Value of `component` at the grid node nearest to `position`
    pub fn get_field(&self, grid: &Grid, component: Component, position: [f64; 3]) -> Complex64 {
        let [i, j, k] = grid.nearest_index(component, position);
        self.array(component).data[[i, j, k]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_cell_counts() {
        let grid = Grid::new([1.0e-6, 0.4e-6, 0.04e-6], 0.1e-6).unwrap();
        assert_eq!(grid.cells, [10, 4, 1]);
        assert_relative_eq!(grid.length(0), 1.0e-6, max_relative = 1e-12);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(Grid::new([1.0, 1.0, 1.0], 0.0).is_err());
        assert!(Grid::new([1.0, -1.0, 1.0], 0.1).is_err());
        assert!(Grid::from_cells([0, 1, 1], 0.1).is_err());
    }

    #[test]
    fn test_yee_offsets() {
        assert_eq!(Component::Ex.offset(), [0.5, 0.0, 0.0]);
        assert_eq!(Component::Ez.offset(), [0.0, 0.0, 0.5]);
        assert_eq!(Component::Hx.offset(), [0.0, 0.5, 0.5]);
        assert_eq!(Component::Hz.offset(), [0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_position_is_centred() {
        let grid = Grid::from_cells([4, 4, 4], 1.0).unwrap();
        let p = grid.position(Component::Ex, [1, 1, 1]);
        assert_relative_eq!(p[0], -1.5);
        assert_relative_eq!(p[1], -2.0);
        assert_relative_eq!(p[2], -2.0);
    }

    #[test]
    fn test_nearest_index_round_trip() {
        let grid = Grid::from_cells([5, 3, 2], 0.5).unwrap();
        for component in [Component::Ey, Component::Hz] {
            for i in 1..=5 {
                for j in 1..=3 {
                    for k in 1..=2 {
                        let p = grid.position(component, [i, j, k]);
                        assert_eq!(grid.nearest_index(component, p), [i, j, k]);
                    }
                }
            }
        }
        // far outside the grid clamps to the interior
        assert_eq!(
            grid.nearest_index(Component::Ex, [100.0, -100.0, 0.0]),
            [5, 1, 2]
        );
    }

    #[test]
    fn test_courant_limits() {
        let grid = Grid::from_cells([2, 2, 2], 1e-6).unwrap();
        let dt = grid.time_step(0.5).unwrap();
        assert_relative_eq!(dt, 0.5e-6 / SPEED_OF_LIGHT, max_relative = 1e-12);
        assert!(grid.time_step(0.0).is_err());
        assert!(grid.time_step(0.6).is_err());
    }

    #[test]
    fn test_get_field_reads_nearest_node() {
        let grid = Grid::from_cells([3, 3, 3], 1.0).unwrap();
        let mut fields = ElectromagneticFields::zeros(grid.cells);
        fields.h.y.data[[2, 3, 1]] = Complex64::new(1.0, -1.0);
        let p = grid.position(Component::Hy, [2, 3, 1]);
        let shifted = [p[0] + 0.2, p[1] - 0.3, p[2] + 0.1];
        assert_eq!(
            fields.get_field(&grid, Component::Hy, shifted),
            Complex64::new(1.0, -1.0)
        );
    }
}
