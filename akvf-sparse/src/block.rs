//! Assembly of sparse matrices with a block structure.
use nalgebra::{ClosedAdd, ClosedMul, Scalar};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use num::Zero;
use std::ops::Range;

/// Incrementally assembles a sparse matrix whose rows and columns are partitioned into
/// consecutive blocks.
///
/// Entries are addressed by a `(block_row, block_col)` pair together with local indices inside
/// that block. The row block `I` covers the global rows `row_offset(I) .. row_offset(I + 1)`,
/// where the offsets are the prefix sums of the block sizes given at construction, and
/// likewise for columns.
///
/// Triplets are accumulated in COO format. [`build`](Self::build) converts them to CSR once,
/// summing duplicate entries.
#[derive(Debug, Clone)]
pub struct BlockCooBuilder<T> {
    row_offsets: Vec<usize>,
    col_offsets: Vec<usize>,
    coo: CooMatrix<T>,
}

fn prefix_sum_offsets(block_sizes: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(block_sizes.len() + 1);
    let mut total = 0;
    offsets.push(total);
    for size in block_sizes {
        total += size;
        offsets.push(total);
    }
    offsets
}

impl<T> BlockCooBuilder<T>
where
    T: Scalar + Zero,
{
    pub fn new(row_block_sizes: &[usize], col_block_sizes: &[usize]) -> Self {
        let row_offsets = prefix_sum_offsets(row_block_sizes);
        let col_offsets = prefix_sum_offsets(col_block_sizes);
        let nrows = *row_offsets.last().unwrap_or(&0);
        let ncols = *col_offsets.last().unwrap_or(&0);
        Self {
            row_offsets,
            col_offsets,
            coo: CooMatrix::new(nrows, ncols),
        }
    }

    pub fn nrows(&self) -> usize {
        self.coo.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.coo.ncols()
    }

    pub fn num_row_blocks(&self) -> usize {
        self.row_offsets.len() - 1
    }

    pub fn num_col_blocks(&self) -> usize {
        self.col_offsets.len() - 1
    }

    /// Global row indices covered by the given row block.
    pub fn row_block_range(&self, block_row: usize) -> Range<usize> {
        self.row_offsets[block_row]..self.row_offsets[block_row + 1]
    }

    /// Global column indices covered by the given column block.
    pub fn col_block_range(&self, block_col: usize) -> Range<usize> {
        self.col_offsets[block_col]..self.col_offsets[block_col + 1]
    }

    /// Number of explicitly stored triplets, duplicates included.
    pub fn nnz(&self) -> usize {
        self.coo.nnz()
    }

    /// Adds `value` at local position `(i, j)` of the block `(block_row, block_col)`.
    ///
    /// # Panics
    ///
    /// Panics if the block or the local indices are out of bounds.
    pub fn push(&mut self, block_row: usize, block_col: usize, i: usize, j: usize, value: T) {
        let rows = self.row_block_range(block_row);
        let cols = self.col_block_range(block_col);
        assert!(i < rows.len(), "Local row index {} out of bounds for row block {}", i, block_row);
        assert!(j < cols.len(), "Local column index {} out of bounds for column block {}", j, block_col);
        self.coo.push(rows.start + i, cols.start + j, value);
    }

    /// Adds `scale * block` to the block `(block_row, block_col)`.
    ///
    /// Entries that are exactly zero after scaling are skipped, so that a zero scale adds
    /// nothing to the sparsity pattern.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions of `block` do not match the block sizes.
    pub fn add_scaled_block(&mut self, block_row: usize, block_col: usize, scale: T, block: &CsrMatrix<T>)
    where
        T: ClosedMul,
    {
        let rows = self.row_block_range(block_row);
        let cols = self.col_block_range(block_col);
        assert_eq!(block.nrows(), rows.len(), "Block row dimension mismatch");
        assert_eq!(block.ncols(), cols.len(), "Block column dimension mismatch");
        for (i, j, v) in block.triplet_iter() {
            let value = scale.clone() * v.clone();
            if value != T::zero() {
                self.coo.push(rows.start + i, cols.start + j, value);
            }
        }
    }

    pub fn build(&self) -> CsrMatrix<T>
    where
        T: ClosedAdd,
    {
        CsrMatrix::from(&self.coo)
    }
}
