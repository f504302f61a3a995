//! Approximate Killing vector fields on triangulated surfaces.
//!
//! A Killing vector field is a displacement field whose symmetric Jacobian vanishes, so that
//! to first order it preserves all distances on the surface. Given a few vertices with
//! prescribed target displacements, this crate finds the displacement field that is as close to
//! Killing as possible while matching the targets in a weighted least-squares sense:
//!
//! $$ \min_x \norm{P x}^2 + \lambda^2 \norm{I_k x - t}^2, $$
//!
//! where $P$ is the Killing-energy operator assembled from the per-face gradient operator and
//! $I_k$ selects the constrained vertices.
//!
//! All vector quantities defined on the vertices are flattened in *column-block-major* order:
//! all x components, then all y components, then all z components (see [`field`]).
//!
//! ```no_run
//! use akvf::{solve_akvf, ConstraintSet, SolverSettings, SurfaceMesh};
//! # fn main() -> Result<(), akvf::AkvfError<f64>> {
//! let mesh = SurfaceMesh::try_from_raw(
//!     &[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]],
//!     &[[0, 1, 2], [0, 2, 3]],
//! )?;
//! let constraints = ConstraintSet::try_from_raw(&[0, 2], &[[1.0, 0.0, 0.0], [0.0, 0.0, 0.0]])?;
//! let solution = solve_akvf(&mesh, &constraints, 100.0, &SolverSettings::default())?;
//! println!("{:?}", solution.field.displacements());
//! # Ok(())
//! # }
//! ```
use nalgebra::RealField;

pub mod constraints;
pub mod energy;
pub mod error;
pub mod field;
pub mod gradient;
pub mod killing;
pub mod mesh;
pub mod solve;

pub mod geometry {
    pub use akvf_geometry::*;
}

pub mod sparse {
    pub use akvf_sparse::*;
}

#[cfg(feature = "proptest-support")]
pub mod proptest;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;

pub use constraints::{assemble_constraint_operator, ConstraintSet};
pub use energy::face_energy;
pub use error::AkvfError;
pub use field::DisplacementField;
pub use gradient::{build_gradient, GradientOperator};
pub use killing::{assemble_killing_operator, KillingOperator};
pub use mesh::SurfaceMesh;
pub use solve::{solve_akvf, AkvfSolution, KillingSystem, SolveReport, SolverSettings};

/// The scalar type used throughout the crate.
///
/// Used as a trait alias for the traits needed by generic `akvf` routines.
pub trait Real: RealField + Copy {}

impl<T> Real for T where T: RealField + Copy {}
