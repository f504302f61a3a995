//! The Killing-energy operator.
//!
//! For a displacement field `u` with per-face Jacobian `J`, `J[a][b] = (G_b u_a)`, the
//! operator `P` maps the flattened field to six per-face quantities whose squared sum is the
//! discrete Killing energy:
//!
//! | row block | x block  | y block  | z block  |
//! |-----------|----------|----------|----------|
//! | 0         | `2 Gx`   |          |          |
//! | 1         |          | `2 Gy`   |          |
//! | 2         |          |          | `2 Gz`   |
//! | 3         | `√2 Gy`  | `√2 Gx`  |          |
//! | 4         | `√2 Gz`  |          | `√2 Gx`  |
//! | 5         |          | `√2 Gz`  | `√2 Gy`  |
//!
//! Each row block has `m` rows (one per face) and each column block `n` columns (one per
//! vertex), following the flattening convention of [`field`](crate::field).
//!
//! No face-area weighting is applied, so every face contributes equally regardless of its size.
use crate::field::DisplacementField;
use crate::gradient::GradientOperator;
use crate::sparse::block::BlockCooBuilder;
use crate::Real;
use log::debug;
use nalgebra::{DVector, DVectorView, Scalar};
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;

pub const NUM_KILLING_ROW_BLOCKS: usize = 6;

#[derive(Debug, Clone, Copy)]
enum BlockScale {
    Two,
    Sqrt2,
}

/// Non-zero blocks of `P` as `(row block, displacement component, gradient component, scale)`.
const KILLING_BLOCKS: [(usize, usize, usize, BlockScale); 9] = [
    (0, 0, 0, BlockScale::Two),
    (1, 1, 1, BlockScale::Two),
    (2, 2, 2, BlockScale::Two),
    (3, 0, 1, BlockScale::Sqrt2),
    (3, 1, 0, BlockScale::Sqrt2),
    (4, 0, 2, BlockScale::Sqrt2),
    (4, 2, 0, BlockScale::Sqrt2),
    (5, 1, 2, BlockScale::Sqrt2),
    (5, 2, 1, BlockScale::Sqrt2),
];

/// The `6m x 3n` Killing-energy operator `P`.
#[derive(Debug, Clone, PartialEq)]
pub struct KillingOperator<T: Scalar> {
    matrix: CsrMatrix<T>,
    num_faces: usize,
    num_vertices: usize,
}

impl<T: Real> KillingOperator<T> {
    pub fn matrix(&self) -> &CsrMatrix<T> {
        &self.matrix
    }

    pub fn into_matrix(self) -> CsrMatrix<T> {
        self.matrix
    }

    pub fn num_faces(&self) -> usize {
        self.num_faces
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    /// Computes `P x` for a flattened displacement field `x`.
    ///
    /// # Panics
    ///
    /// Panics if `x` does not have length `3n`.
    pub fn apply_flattened<'a>(&self, x: impl Into<DVectorView<'a, T>>) -> DVector<T> {
        let x = x.into();
        assert_eq!(x.len(), self.matrix.ncols(), "Flattened field must have length 3n");
        let mut px = DVector::zeros(self.matrix.nrows());
        spmm_csr_dense(T::zero(), &mut px, T::one(), Op::NoOp(&self.matrix), Op::NoOp(&x));
        px
    }

    /// Computes `P x`, where `x` is the flattened displacement field.
    ///
    /// # Panics
    ///
    /// Panics if the field does not have one displacement per vertex.
    pub fn apply(&self, field: &DisplacementField<T>) -> DVector<T> {
        assert_eq!(field.num_vertices(), self.num_vertices, "Field must have one displacement per vertex");
        self.apply_flattened(&field.flatten())
    }

    /// Total discrete Killing energy `|P x|^2` of the field.
    ///
    /// # Panics
    ///
    /// Panics if the field does not have one displacement per vertex.
    pub fn energy(&self, field: &DisplacementField<T>) -> T {
        self.apply(field).norm_squared()
    }
}

pub fn assemble_killing_operator<T: Real>(gradient: &GradientOperator<T>) -> KillingOperator<T> {
    let m = gradient.num_faces();
    let n = gradient.num_vertices();
    let two = T::one() + T::one();
    let sqrt_2 = two.sqrt();

    let mut builder = BlockCooBuilder::new(&[m; NUM_KILLING_ROW_BLOCKS], &[n, n, n]);
    for &(row_block, displacement_axis, gradient_axis, scale) in &KILLING_BLOCKS {
        let scale = match scale {
            BlockScale::Two => two,
            BlockScale::Sqrt2 => sqrt_2,
        };
        builder.add_scaled_block(row_block, displacement_axis, scale, gradient.component(gradient_axis));
    }

    let matrix = builder.build();
    debug!(
        "Assembled Killing operator of size {}x{} with {} non-zeros",
        matrix.nrows(),
        matrix.ncols(),
        matrix.nnz()
    );
    KillingOperator {
        matrix,
        num_faces: m,
        num_vertices: n,
    }
}
