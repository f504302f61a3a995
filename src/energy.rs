//! Per-face Killing energy density.
use crate::field::DisplacementField;
use crate::killing::{KillingOperator, NUM_KILLING_ROW_BLOCKS};
use crate::Real;
use rayon::prelude::*;

/// Computes the Killing energy of the field on every face.
///
/// The energy of face `i` is `sum_r (P x)[r m + i]^2` over the six row blocks of `P`, so the
/// face energies sum to [`KillingOperator::energy`]. The result is deterministic.
///
/// # Panics
///
/// Panics if the field does not have one displacement per vertex of the operator.
pub fn face_energy<T: Real>(operator: &KillingOperator<T>, field: &DisplacementField<T>) -> Vec<T> {
    let px = operator.apply(field);
    let m = operator.num_faces();
    (0..m)
        .into_par_iter()
        .with_min_len(1024)
        .map(|face| {
            (0..NUM_KILLING_ROW_BLOCKS)
                .map(|row_block| px[row_block * m + face].powi(2))
                .fold(T::zero(), |sum, e| sum + e)
        })
        .collect()
}
