// telescope: Pseudoalignment conversion and compression into equivalence classes.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! Compressed reads × targets bit matrix.
//!
//! A pseudoalignment is stored as a flattened row-major matrix where bit
//! `row * n_cols + col` is set if read `row` aligned against target `col`.
//!
//! The flattened index easily exceeds the 32-bit address space of a
//! [RoaringBitmap], so the rows are split into blocks of `u32::MAX / n_cols`
//! rows and each block is stored in its own bitmap. A row never crosses a
//! block boundary, which lets every row query run as a range query inside a
//! single bitmap.
//!
//! ## Usage
//!
//! ```rust
//! use telescope::bitmatrix::BitMatrix;
//!
//! let mut matrix = BitMatrix::new(4);
//! matrix.set(0, 0);
//! matrix.set(0, 2);
//! matrix.set(2, 3);
//!
//! assert!(matrix.any_in_row(0));
//! assert!(!matrix.any_in_row(1));
//! assert_eq!(matrix.row_ones(0), vec![0, 2]);
//!
//! let frozen = matrix.freeze();
//! let rows: Vec<(usize, Vec<u32>)> = frozen.non_empty_rows().collect();
//! assert_eq!(rows, vec![(0, vec![0, 2]), (2, vec![3])]);
//! ```
//!

use std::borrow::Borrow;
use std::iter::Peekable;
use std::ops::Deref;

use roaring::bitmap::RoaringBitmap;

/// Mutable reads × targets bit matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct BitMatrix {
    blocks: Vec<RoaringBitmap>,
    n_rows: usize,
    n_cols: u32,
    rows_per_block: usize,
}

impl BitMatrix {
    /// Create an empty matrix with `n_cols` columns.
    ///
    /// ## Errors and panics
    ///
    /// Panics if `n_cols` is zero.
    pub fn new(
        n_cols: u32,
    ) -> Self {
        assert!(n_cols > 0);
        // Adjust block size to fit within 32-bit address space
        let rows_per_block = (u32::MAX as u64 / n_cols as u64) as usize;
        Self::with_block_rows(n_cols, rows_per_block)
    }

    /// Create an all-zero matrix with known dimensions.
    pub fn with_rows(
        n_rows: usize,
        n_cols: u32,
    ) -> Self {
        let mut matrix = Self::new(n_cols);
        matrix.n_rows = n_rows;
        matrix
    }

    pub(crate) fn with_block_rows(
        n_cols: u32,
        rows_per_block: usize,
    ) -> Self {
        assert!(n_cols > 0);
        assert!(rows_per_block > 0);
        assert!(rows_per_block as u64 * n_cols as u64 <= u32::MAX as u64);
        BitMatrix { blocks: Vec::new(), n_rows: 0, n_cols, rows_per_block }
    }

    fn locate(
        &self,
        row: usize,
        col: u32,
    ) -> (usize, u32) {
        let block = row / self.rows_per_block;
        let local_row = (row % self.rows_per_block) as u32;
        (block, local_row * self.n_cols + col)
    }

    /// Set bit (`row`, `col`). Does nothing if it is already set.
    ///
    /// The caller guarantees `col < n_cols`.
    pub fn set(
        &mut self,
        row: usize,
        col: u32,
    ) {
        debug_assert!(col < self.n_cols);
        let (block, local) = self.locate(row, col);
        if self.blocks.len() <= block {
            self.blocks.resize_with(block + 1, RoaringBitmap::new);
        }
        self.blocks[block].insert(local);
        self.n_rows = self.n_rows.max(row + 1);
    }

    /// Check if bit (`row`, `col`) is set.
    pub fn get(
        &self,
        row: usize,
        col: u32,
    ) -> bool {
        let (block, local) = self.locate(row, col);
        self.blocks.get(block).is_some_and(|bits| bits.contains(local))
    }

    /// Number of set bits in `row` and the rank of the bit just before it.
    fn row_rank(
        &self,
        row: usize,
    ) -> Option<(&RoaringBitmap, u64, u64)> {
        let (block, start) = self.locate(row, 0);
        let bits = self.blocks.get(block)?;
        let end = start + (self.n_cols - 1);
        let before = if start == 0 { 0 } else { bits.rank(start - 1) };
        let through = bits.rank(end);
        Some((bits, before, through - before))
    }

    /// Check if `row` has at least one set bit.
    pub fn any_in_row(
        &self,
        row: usize,
    ) -> bool {
        self.row_rank(row).is_some_and(|(_, _, n_set)| n_set > 0)
    }

    /// Indexes of the set columns in `row`, from low to high.
    pub fn row_ones(
        &self,
        row: usize,
    ) -> Vec<u32> {
        let Some((bits, before, n_set)) = self.row_rank(row) else {
            return Vec::new()
        };
        let row_start = (row % self.rows_per_block) as u32 * self.n_cols;
        (before..(before + n_set)).filter_map(|nth| {
            bits.select(nth as u32).map(|local| local - row_start)
        }).collect()
    }

    /// Extract `row` as a fixed-width [HitKey].
    pub fn extract_row(
        &self,
        row: usize,
    ) -> HitKey {
        HitKey::from_ones(&self.row_ones(row), self.n_cols)
    }

    /// Extend the matrix to `n_rows` rows with trailing zeros.
    ///
    /// The column count is fixed at construction, `n_cols` must match it.
    pub fn resize_to(
        &mut self,
        n_rows: usize,
        n_cols: u32,
    ) {
        assert_eq!(n_cols, self.n_cols);
        self.n_rows = self.n_rows.max(n_rows);
    }

    /// In-place bitwise AND with a matrix with the same number of columns.
    pub fn bitwise_and(
        &mut self,
        other: &BitMatrix,
    ) {
        assert_eq!(self.n_cols, other.n_cols);
        assert_eq!(self.rows_per_block, other.rows_per_block);
        self.blocks.iter_mut().enumerate().for_each(|(idx, bits)| {
            match other.blocks.get(idx) {
                Some(other_bits) => *bits &= other_bits,
                None => bits.clear(),
            }
        });
        self.n_rows = self.n_rows.max(other.n_rows);
        self.optimize();
    }

    /// In-place bitwise OR with a matrix with the same number of columns.
    pub fn bitwise_or(
        &mut self,
        other: &BitMatrix,
    ) {
        assert_eq!(self.n_cols, other.n_cols);
        assert_eq!(self.rows_per_block, other.rows_per_block);
        if self.blocks.len() < other.blocks.len() {
            self.blocks.resize_with(other.blocks.len(), RoaringBitmap::new);
        }
        self.blocks.iter_mut().zip(other.blocks.iter()).for_each(|(bits, other_bits)| {
            *bits |= other_bits;
        });
        self.n_rows = self.n_rows.max(other.n_rows);
        self.optimize();
    }

    /// Convert the containers to their most compact representation.
    pub fn optimize(
        &mut self,
    ) {
        self.blocks.iter_mut().for_each(|bits| {
            bits.optimize();
        });
    }

    /// Optimize and mark the matrix read-only.
    pub fn freeze(
        mut self,
    ) -> FrozenBitMatrix {
        self.optimize();
        FrozenBitMatrix { inner: self }
    }

    pub fn n_rows(
        &self,
    ) -> usize {
        self.n_rows
    }

    pub fn n_cols(
        &self,
    ) -> u32 {
        self.n_cols
    }

    /// Total number of set bits.
    pub fn n_set(
        &self,
    ) -> u64 {
        self.blocks.iter().map(|bits| bits.len()).sum()
    }

    /// Iterate over rows with at least one set bit in increasing row order.
    ///
    /// Visits the set bits once, so rows without hits cost nothing.
    pub fn non_empty_rows(
        &self,
    ) -> NonEmptyRows<'_> {
        NonEmptyRows { matrix: self, block_idx: 0, bits: None }
    }
}

/// Read-only [BitMatrix] returned by [BitMatrix::freeze].
///
/// Dereferences to [BitMatrix] so all queries are available, but nothing
/// that needs `&mut`.
#[derive(Clone, Debug, PartialEq)]
pub struct FrozenBitMatrix {
    inner: BitMatrix,
}

impl Deref for FrozenBitMatrix {
    type Target = BitMatrix;

    fn deref(
        &self,
    ) -> &BitMatrix {
        &self.inner
    }
}

/// Iterator over `(row, set columns)` pairs, see [BitMatrix::non_empty_rows].
pub struct NonEmptyRows<'a> {
    matrix: &'a BitMatrix,
    block_idx: usize,
    bits: Option<Peekable<roaring::bitmap::Iter<'a>>>,
}

impl Iterator for NonEmptyRows<'_> {
    type Item = (usize, Vec<u32>);

    fn next(
        &mut self,
    ) -> Option<Self::Item> {
        let matrix = self.matrix;
        loop {
            if self.bits.is_none() {
                let block = matrix.blocks.get(self.block_idx)?;
                self.bits = Some(block.iter().peekable());
            }
            let bits = self.bits.as_mut()?;
            if let Some(first) = bits.next() {
                let local_row = first / matrix.n_cols;
                let mut ones: Vec<u32> = vec![first % matrix.n_cols];
                while let Some(&next) = bits.peek() {
                    if next / matrix.n_cols != local_row {
                        break;
                    }
                    ones.push(next % matrix.n_cols);
                    bits.next();
                }
                let row = self.block_idx * matrix.rows_per_block + local_row as usize;
                return Some((row, ones))
            }
            self.bits = None;
            self.block_idx += 1;
        }
    }
}

/// Canonical fixed-width key for one row of a [BitMatrix].
///
/// Bit `j` of the packed `u64` words is set if the row has target `j`. Two
/// rows are the same equivalence class iff their keys are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HitKey(Box<[u64]>);

impl HitKey {
    /// Number of `u64` words in a key for `n_targets` targets.
    pub fn n_words(
        n_targets: u32,
    ) -> usize {
        (n_targets as usize).div_ceil(64)
    }

    pub fn from_ones(
        ones: &[u32],
        n_targets: u32,
    ) -> Self {
        let mut words: Vec<u64> = Vec::new();
        pack_words(ones, n_targets, &mut words);
        HitKey(words.into_boxed_slice())
    }

    pub(crate) fn from_words(
        words: Vec<u64>,
    ) -> Self {
        HitKey(words.into_boxed_slice())
    }

    /// Indexes of the set bits, from low to high.
    pub fn ones(
        &self,
    ) -> Vec<u32> {
        let mut ones: Vec<u32> = Vec::new();
        self.0.iter().enumerate().for_each(|(word_idx, word)| {
            let mut rest = *word;
            while rest != 0 {
                let bit = rest.trailing_zeros();
                ones.push(word_idx as u32 * 64 + bit);
                rest &= rest - 1;
            }
        });
        ones
    }

    pub fn contains(
        &self,
        target: u32,
    ) -> bool {
        self.0.get(target as usize / 64).is_some_and(|word| word & (1_u64 << (target % 64)) != 0)
    }

    pub fn words(
        &self,
    ) -> &[u64] {
        &self.0
    }
}

impl Borrow<[u64]> for HitKey {
    fn borrow(
        &self,
    ) -> &[u64] {
        &self.0
    }
}

/// Pack `ones` into `words`, reusing its allocation.
pub(crate) fn pack_words(
    ones: &[u32],
    n_targets: u32,
    words: &mut Vec<u64>,
) {
    words.clear();
    words.resize(HitKey::n_words(n_targets), 0);
    ones.iter().for_each(|target| {
        words[*target as usize / 64] |= 1_u64 << (target % 64);
    });
}
