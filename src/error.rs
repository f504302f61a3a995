//! Errors reported by mesh validation, operator assembly and the least-squares solve.
use crate::field::DisplacementField;
use nalgebra::Scalar;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidMeshKind {
    #[error("face {face} references vertex {vertex}, but the mesh has only {num_vertices} vertices")]
    VertexIndexOutOfBounds {
        face: usize,
        vertex: usize,
        num_vertices: usize,
    },
    #[error("face {face} references vertex {vertex} more than once")]
    RepeatedVertex { face: usize, vertex: usize },
    /// The face has (near) zero area relative to its longest edge.
    #[error("face {face} is degenerate")]
    DegenerateFace { face: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidConstraintKind {
    #[error("constraint {constraint} references vertex {vertex}, but the mesh has only {num_vertices} vertices")]
    VertexIndexOutOfBounds {
        constraint: usize,
        vertex: usize,
        num_vertices: usize,
    },
    #[error("got {num_indices} constrained vertices but {num_targets} target displacements")]
    LengthMismatch { num_indices: usize, num_targets: usize },
    #[error("target displacement of constraint {constraint} is not finite")]
    NonFiniteTarget { constraint: usize },
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AkvfError<T: Scalar> {
    #[error("invalid mesh: {0}")]
    InvalidMesh(#[from] InvalidMeshKind),
    #[error("invalid constraint: {0}")]
    InvalidConstraint(#[from] InvalidConstraintKind),
    /// The least-squares solve did not converge.
    ///
    /// Carries the last iterate of the solver, which may still be useful as an approximate
    /// solution.
    #[error("least-squares solve failed after {iterations} iterations (residual norm {residual_norm}): {reason}")]
    NumericalInstability {
        iterations: usize,
        residual_norm: T,
        reason: String,
        best_iterate: DisplacementField<T>,
    },
}
