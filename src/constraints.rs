//! Displacement constraints at individual vertices.
use crate::error::{AkvfError, InvalidConstraintKind};
use crate::field::flatten_vectors;
use crate::sparse::block::BlockCooBuilder;
use crate::Real;
use nalgebra::{DVector, Scalar, Vector3};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};

/// An ordered list of `(vertex, target displacement)` pairs.
///
/// Vertices that do not appear in the set are unconstrained. The same vertex may appear
/// more than once, in which case each occurrence contributes its own rows to the
/// constraint operator.
///
/// Deserialization checks that indices and targets pair up and that targets are finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    bound(
        serialize = "Vector3<T>: Serialize",
        deserialize = "T: Real, Vector3<T>: Deserialize<'de>"
    ),
    try_from = "ConstraintSetData<T>"
)]
pub struct ConstraintSet<T: Scalar> {
    vertex_indices: Vec<usize>,
    targets: Vec<Vector3<T>>,
}

/// Unchecked constraint data as it appears in serialized form.
#[derive(Deserialize)]
#[serde(bound(deserialize = "Vector3<T>: Deserialize<'de>"))]
struct ConstraintSetData<T: Scalar> {
    vertex_indices: Vec<usize>,
    targets: Vec<Vector3<T>>,
}

impl<T: Real> TryFrom<ConstraintSetData<T>> for ConstraintSet<T> {
    type Error = InvalidConstraintKind;

    fn try_from(data: ConstraintSetData<T>) -> Result<Self, Self::Error> {
        check_targets(&data.vertex_indices, &data.targets)?;
        Ok(Self {
            vertex_indices: data.vertex_indices,
            targets: data.targets,
        })
    }
}

fn check_targets<T: Real>(vertex_indices: &[usize], targets: &[Vector3<T>]) -> Result<(), InvalidConstraintKind> {
    if vertex_indices.len() != targets.len() {
        return Err(InvalidConstraintKind::LengthMismatch {
            num_indices: vertex_indices.len(),
            num_targets: targets.len(),
        });
    }
    if let Some(constraint) = targets.iter().position(|t| !t.iter().all(|x| x.is_finite())) {
        return Err(InvalidConstraintKind::NonFiniteTarget { constraint });
    }
    Ok(())
}

impl<T: Scalar> Default for ConstraintSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> ConstraintSet<T> {
    pub fn new() -> Self {
        Self {
            vertex_indices: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn push(&mut self, vertex: usize, target: Vector3<T>) {
        self.vertex_indices.push(vertex);
        self.targets.push(target);
    }

    pub fn with_constraint(mut self, vertex: usize, target: Vector3<T>) -> Self {
        self.push(vertex, target);
        self
    }

    pub fn len(&self) -> usize {
        self.vertex_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_indices.is_empty()
    }

    pub fn vertex_indices(&self) -> &[usize] {
        &self.vertex_indices
    }

    pub fn targets(&self) -> &[Vector3<T>] {
        &self.targets
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = (usize, &Vector3<T>)> {
        self.vertex_indices.iter().copied().zip(&self.targets)
    }
}

impl<T: Real> ConstraintSet<T> {
    pub fn try_from_vertices_and_targets(
        vertex_indices: Vec<usize>,
        targets: Vec<Vector3<T>>,
    ) -> Result<Self, AkvfError<T>> {
        check_targets(&vertex_indices, &targets)?;
        Ok(Self {
            vertex_indices,
            targets,
        })
    }

    /// Constructs a constraint set from raw index and displacement arrays.
    pub fn try_from_raw(vertex_indices: &[u32], targets: &[[T; 3]]) -> Result<Self, AkvfError<T>> {
        Self::try_from_vertices_and_targets(
            vertex_indices.iter().map(|&i| i as usize).collect(),
            targets.iter().map(|&t| Vector3::from(t)).collect(),
        )
    }

    /// Checks that every constrained vertex exists in a mesh with `num_vertices` vertices.
    pub fn validate(&self, num_vertices: usize) -> Result<(), AkvfError<T>> {
        if let Some((constraint, &vertex)) = self
            .vertex_indices
            .iter()
            .enumerate()
            .find(|&(_, &vertex)| vertex >= num_vertices)
        {
            return Err(InvalidConstraintKind::VertexIndexOutOfBounds {
                constraint,
                vertex,
                num_vertices,
            }
            .into());
        }
        Ok(())
    }

    /// The targets flattened in column-block-major order, a vector of length `3k`.
    pub fn flattened_targets(&self) -> DVector<T> {
        flatten_vectors(&self.targets)
    }
}

/// Assembles the `3k x 3n` constraint operator `Ik`.
///
/// Row block `j` (for the x, y and z components) selects column block `j`: row `j k + r` has a
/// single one in column `j n + i_r`, where `i_r` is the vertex of constraint `r`.
pub fn assemble_constraint_operator<T: Real>(
    constraints: &ConstraintSet<T>,
    num_vertices: usize,
) -> Result<CsrMatrix<T>, AkvfError<T>> {
    constraints.validate(num_vertices)?;
    let k = constraints.len();
    let mut builder = BlockCooBuilder::new(&[k, k, k], &[num_vertices, num_vertices, num_vertices]);
    for axis in 0..3 {
        for (r, &vertex) in constraints.vertex_indices().iter().enumerate() {
            builder.push(axis, axis, r, vertex, T::one());
        }
    }
    Ok(builder.build())
}
