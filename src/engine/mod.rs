//! Engine module containing field arrays and operations on them

pub mod array;
pub mod operations;

pub use array::{Complex64, FieldArray, VectorField};
pub use operations::*;
