//! The discrete gradient operator for piecewise linear functions on triangle meshes.
use crate::error::{AkvfError, InvalidMeshKind};
use crate::mesh::SurfaceMesh;
use crate::sparse::block::BlockCooBuilder;
use crate::Real;
use itertools::izip;
use log::debug;
use nalgebra::{convert, DVector, DVectorView, Scalar, Vector3};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rayon::prelude::*;

/// Faces with quality (see [`Triangle3d::quality`](crate::geometry::Triangle3d::quality)) at or
/// below this value are rejected as degenerate by [`build_gradient`].
pub const DEFAULT_DEGENERATE_FACE_TOLERANCE: f64 = 1e-12;

/// Maps per-vertex scalar values to per-face gradient vectors.
///
/// Row `i` of the component matrices `Gx`, `Gy` and `Gz` (each `m x n`) holds the
/// corresponding component of the hat function gradients of the vertices of face `i`, so
/// that the gradient of the piecewise linear interpolant of `u` on face `i` is
/// `(Gx u, Gy u, Gz u)[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientOperator<T: Scalar> {
    components: [CsrMatrix<T>; 3],
}

impl<T: Real> GradientOperator<T> {
    pub fn num_faces(&self) -> usize {
        self.components[0].nrows()
    }

    pub fn num_vertices(&self) -> usize {
        self.components[0].ncols()
    }

    pub fn gx(&self) -> &CsrMatrix<T> {
        &self.components[0]
    }

    pub fn gy(&self) -> &CsrMatrix<T> {
        &self.components[1]
    }

    pub fn gz(&self) -> &CsrMatrix<T> {
        &self.components[2]
    }

    /// # Panics
    ///
    /// Panics if `axis > 2`.
    pub fn component(&self, axis: usize) -> &CsrMatrix<T> {
        &self.components[axis]
    }

    /// Returns the logical `3m x n` operator `[Gx; Gy; Gz]`.
    pub fn to_stacked(&self) -> CsrMatrix<T> {
        let m = self.num_faces();
        let mut builder = BlockCooBuilder::new(&[m, m, m], &[self.num_vertices()]);
        for (axis, component) in self.components.iter().enumerate() {
            builder.add_scaled_block(axis, 0, T::one(), component);
        }
        builder.build()
    }

    /// Computes the gradient of the piecewise linear function with the given vertex values
    /// on every face.
    ///
    /// # Panics
    ///
    /// Panics if the number of values does not match the number of vertices.
    pub fn apply<'a>(&self, values: impl Into<DVectorView<'a, T>>) -> Vec<Vector3<T>> {
        let values = values.into();
        assert_eq!(values.len(), self.num_vertices(), "Number of values must match number of vertices");

        let m = self.num_faces();
        let mut gx_u = DVector::zeros(m);
        let mut gy_u = DVector::zeros(m);
        let mut gz_u = DVector::zeros(m);
        for (result, component) in izip!([&mut gx_u, &mut gy_u, &mut gz_u], &self.components) {
            spmm_csr_dense(T::zero(), result, T::one(), Op::NoOp(component), Op::NoOp(&values));
        }

        izip!(gx_u.iter(), gy_u.iter(), gz_u.iter())
            .map(|(&x, &y, &z)| Vector3::new(x, y, z))
            .collect()
    }
}

/// Builds the gradient operator of the mesh, rejecting degenerate faces with the
/// default tolerance.
pub fn build_gradient<T: Real>(mesh: &SurfaceMesh<T>) -> Result<GradientOperator<T>, AkvfError<T>> {
    build_gradient_with_tolerance(mesh, convert(DEFAULT_DEGENERATE_FACE_TOLERANCE))
}

/// Builds the gradient operator of the mesh.
///
/// Returns [`InvalidMeshKind::DegenerateFace`] for the first face whose quality is at or below
/// `degenerate_face_tolerance`. Apart from this, the builder does not guard against poorly
/// shaped faces.
pub fn build_gradient_with_tolerance<T: Real>(
    mesh: &SurfaceMesh<T>,
    degenerate_face_tolerance: T,
) -> Result<GradientOperator<T>, AkvfError<T>> {
    let m = mesh.num_faces();
    let n = mesh.num_vertices();

    let local_gradients: Vec<_> = (0..m)
        .into_par_iter()
        .with_min_len(256)
        .map(|face| {
            let triangle = mesh.triangle(face);
            if triangle.quality() <= degenerate_face_tolerance {
                None
            } else {
                triangle.hat_function_gradients()
            }
        })
        .collect();

    let mut coo_components = [CooMatrix::new(m, n), CooMatrix::new(m, n), CooMatrix::new(m, n)];
    for (face_idx, (face, gradients)) in izip!(mesh.faces(), local_gradients).enumerate() {
        let gradients = gradients.ok_or(InvalidMeshKind::DegenerateFace { face: face_idx })?;
        for (&vertex, gradient) in izip!(face, &gradients) {
            for (axis, coo) in coo_components.iter_mut().enumerate() {
                coo.push(face_idx, vertex, gradient[axis]);
            }
        }
    }

    let [gx, gy, gz] = coo_components;
    debug!("Assembled gradient operator for {} faces and {} vertices", m, n);
    Ok(GradientOperator {
        components: [CsrMatrix::from(&gx), CsrMatrix::from(&gy), CsrMatrix::from(&gz)],
    })
}
