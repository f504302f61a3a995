//! Geometric primitives for triangulated surfaces embedded in three dimensions.
mod triangle;

pub use triangle::*;

#[cfg(feature = "proptest-support")]
pub mod proptest;
