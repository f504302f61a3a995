//! Triangle surface meshes with validated connectivity.
use crate::error::{AkvfError, InvalidMeshKind};
use crate::geometry::Triangle3d;
use crate::Real;
use nalgebra::{Point3, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;

/// An index-based triangle mesh of a surface embedded in 3D.
///
/// Every face index is guaranteed to be in bounds and no face references the same vertex
/// twice. Geometric degeneracy (faces of near zero area) is checked when the gradient
/// operator is built, since the threshold is a solver setting.
///
/// Deserialization goes through the same connectivity checks as
/// [`try_from_vertices_and_faces`](Self::try_from_vertices_and_faces).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    bound(
        serialize = "Point3<T>: Serialize",
        deserialize = "Point3<T>: Deserialize<'de>"
    ),
    try_from = "SurfaceMeshData<T>"
)]
pub struct SurfaceMesh<T: Scalar> {
    vertices: Vec<Point3<T>>,
    faces: Vec<[usize; 3]>,
}

/// Unchecked mesh data as it appears in serialized form.
#[derive(Deserialize)]
#[serde(bound(deserialize = "Point3<T>: Deserialize<'de>"))]
struct SurfaceMeshData<T: Scalar> {
    vertices: Vec<Point3<T>>,
    faces: Vec<[usize; 3]>,
}

impl<T: Scalar> TryFrom<SurfaceMeshData<T>> for SurfaceMesh<T> {
    type Error = InvalidMeshKind;

    fn try_from(data: SurfaceMeshData<T>) -> Result<Self, Self::Error> {
        check_face_indices(&data.faces, data.vertices.len())?;
        Ok(Self {
            vertices: data.vertices,
            faces: data.faces,
        })
    }
}

fn check_face_indices(faces: &[[usize; 3]], num_vertices: usize) -> Result<(), InvalidMeshKind> {
    for (face_idx, face) in faces.iter().enumerate() {
        for (local_idx, &vertex) in face.iter().enumerate() {
            if vertex >= num_vertices {
                return Err(InvalidMeshKind::VertexIndexOutOfBounds {
                    face: face_idx,
                    vertex,
                    num_vertices,
                });
            }
            if face[..local_idx].contains(&vertex) {
                return Err(InvalidMeshKind::RepeatedVertex { face: face_idx, vertex });
            }
        }
    }
    Ok(())
}

impl<T: Scalar> SurfaceMesh<T> {
    pub fn try_from_vertices_and_faces(
        vertices: Vec<Point3<T>>,
        faces: Vec<[usize; 3]>,
    ) -> Result<Self, AkvfError<T>> {
        check_face_indices(&faces, vertices.len())?;
        Ok(Self { vertices, faces })
    }

    /// Constructs a mesh from raw coordinate and index arrays.
    pub fn try_from_raw(vertices: &[[T; 3]], faces: &[[u32; 3]]) -> Result<Self, AkvfError<T>> {
        let vertices = vertices
            .iter()
            .map(|v| Point3::from(v.clone()))
            .collect();
        let faces = faces
            .iter()
            .map(|&[a, b, c]| [a as usize, b as usize, c as usize])
            .collect();
        Self::try_from_vertices_and_faces(vertices, faces)
    }

    pub fn vertices(&self) -> &[Point3<T>] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Returns the triangle corresponding to the given face.
    ///
    /// # Panics
    ///
    /// Panics if the face index is out of bounds.
    pub fn triangle(&self, face: usize) -> Triangle3d<T> {
        let [a, b, c] = self.faces[face];
        Triangle3d([
            self.vertices[a].clone(),
            self.vertices[b].clone(),
            self.vertices[c].clone(),
        ])
    }

    pub fn triangle_iter(&self) -> impl '_ + Iterator<Item = Triangle3d<T>> {
        (0..self.num_faces()).map(move |face| self.triangle(face))
    }

    /// Returns a sorted list of vertices that are determined to be on the boundary.
    ///
    /// A vertex is on the boundary if it belongs to an edge referenced by exactly one face.
    pub fn find_boundary_vertices(&self) -> Vec<usize> {
        // Use a BTreeMap to avoid non-determinism due to HashMap's internal randomization
        let mut edge_counts = BTreeMap::new();
        for &[a, b, c] in &self.faces {
            for (i, j) in [(a, b), (b, c), (c, a)] {
                let edge = (i.min(j), i.max(j));
                *edge_counts.entry(edge).or_insert(0usize) += 1;
            }
        }

        let mut indices: Vec<_> = edge_counts
            .into_iter()
            .filter(|&(_, count)| count == 1)
            .flat_map(|((i, j), _)| [i, j])
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

impl<T: Real> SurfaceMesh<T> {
    /// Returns the faces whose quality (see [`Triangle3d::quality`]) does not exceed the
    /// given tolerance.
    pub fn find_degenerate_faces(&self, tolerance: T) -> Vec<usize> {
        self.triangle_iter()
            .enumerate()
            .filter(|(_, triangle)| triangle.quality() <= tolerance)
            .map(|(face, _)| face)
            .collect()
    }

    pub fn total_area(&self) -> T {
        self.triangle_iter()
            .map(|triangle| triangle.area())
            .fold(T::zero(), |a, b| a + b)
    }
}
