//! Sparse linear algebra for akvf: block-structured assembly and iterative least-squares solves.
pub mod block;
pub mod lsqr;

pub use nalgebra_sparse::{CooMatrix, CsrMatrix};
