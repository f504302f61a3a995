//! Per-vertex displacement fields and the flattening convention shared by all operators.
//!
//! A field of `n` vectors in 3D is flattened into a vector of length `3n` in
//! *column-block-major* order,
//!
//! ```text
//! [u_0.x, ..., u_{n-1}.x, u_0.y, ..., u_{n-1}.y, u_0.z, ..., u_{n-1}.z],
//! ```
//!
//! so that component `axis` of vertex `i` is stored at [`block_major_index`]`(axis, i, n)`.
//! The Killing-energy operator, the constraint operator, the right-hand side and the solution
//! vector all use this order.
use crate::Real;
use nalgebra::{DVector, DVectorView, Point3, Scalar, Vector3};
use serde::{Deserialize, Serialize};

/// Index of component `axis` of entry `index` in a block-major flattened vector of `len` entries.
#[inline]
pub fn block_major_index(axis: usize, index: usize, len: usize) -> usize {
    debug_assert!(axis < 3);
    debug_assert!(index < len);
    axis * len + index
}

/// Flattens the vectors in column-block-major order.
pub fn flatten_vectors<T: Real>(vectors: &[Vector3<T>]) -> DVector<T> {
    let n = vectors.len();
    let mut flattened = DVector::zeros(3 * n);
    for (i, v) in vectors.iter().enumerate() {
        for axis in 0..3 {
            flattened[block_major_index(axis, i, n)] = v[axis];
        }
    }
    flattened
}

/// Inverse of [`flatten_vectors`].
///
/// # Panics
///
/// Panics if the length of `flattened` is not divisible by 3.
pub fn unflatten_vectors<'a, T: Real>(flattened: impl Into<DVectorView<'a, T>>) -> Vec<Vector3<T>> {
    let flattened = flattened.into();
    assert_eq!(flattened.len() % 3, 0, "Length of flattened vector must be divisible by 3");
    let n = flattened.len() / 3;
    (0..n)
        .map(|i| {
            Vector3::new(
                flattened[block_major_index(0, i, n)],
                flattened[block_major_index(1, i, n)],
                flattened[block_major_index(2, i, n)],
            )
        })
        .collect()
}

/// A displacement vector for every vertex of a mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Vector3<T>: Serialize",
    deserialize = "Vector3<T>: Deserialize<'de>"
))]
pub struct DisplacementField<T: Scalar> {
    displacements: Vec<Vector3<T>>,
}

impl<T: Scalar> DisplacementField<T> {
    pub fn from_displacements(displacements: Vec<Vector3<T>>) -> Self {
        Self { displacements }
    }

    pub fn displacements(&self) -> &[Vector3<T>] {
        &self.displacements
    }

    pub fn into_displacements(self) -> Vec<Vector3<T>> {
        self.displacements
    }

    pub fn num_vertices(&self) -> usize {
        self.displacements.len()
    }
}

impl<T: Real> DisplacementField<T> {
    pub fn zeros(num_vertices: usize) -> Self {
        Self::from_displacements(vec![Vector3::zeros(); num_vertices])
    }

    /// Reconstructs a field from a column-block-major vector of length `3n`.
    ///
    /// # Panics
    ///
    /// Panics if the length of `flattened` is not divisible by 3.
    pub fn from_flattened<'a>(flattened: impl Into<DVectorView<'a, T>>) -> Self {
        Self::from_displacements(unflatten_vectors(flattened))
    }

    pub fn flatten(&self) -> DVector<T> {
        flatten_vectors(&self.displacements)
    }

    /// Returns the displaced positions `p_i + u_i`.
    ///
    /// # Panics
    ///
    /// Panics if the number of positions does not match the number of displacements.
    pub fn displace(&self, positions: &[Point3<T>]) -> Vec<Point3<T>> {
        assert_eq!(positions.len(), self.num_vertices(), "Number of positions must match field");
        positions
            .iter()
            .zip(&self.displacements)
            .map(|(p, u)| p + u)
            .collect()
    }

    pub fn max_norm(&self) -> T {
        self.displacements
            .iter()
            .map(|u| u.norm())
            .fold(T::zero(), |a, b| a.max(b))
    }
}

/// Evaluates the infinitesimal rigid motion `t + ω × p` at the given positions.
///
/// Infinitesimal translations lie in the null space of the Killing-energy operator on any
/// mesh. Rotations do as well when their axis is parallel to the normal of a planar mesh,
/// since the discrete gradient only sees tangential derivatives.
pub fn rigid_motion_field<T: Real>(
    positions: &[Point3<T>],
    translation: &Vector3<T>,
    angular_velocity: &Vector3<T>,
) -> DisplacementField<T> {
    let displacements = positions
        .iter()
        .map(|p| translation + angular_velocity.cross(&p.coords))
        .collect();
    DisplacementField::from_displacements(displacements)
}
