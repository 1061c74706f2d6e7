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

//! Compress pseudoalignments into equivalence classes.
//!
//! Reads that aligned to exactly the same set of targets form an
//! equivalence class. Classes are numbered from zero in the order their
//! first read is seen, and each class records how many reads it has.
//! Reads that did not align to anything are not assigned to any class.
//!
//! What else is recorded is controlled by [CompressOptions]:
//! - `track_reads` keeps the ids of the reads assigned to each class.
//! - `keep_patterns` keeps the target set of each class as a row of a
//!   [FrozenBitMatrix].
//!
//! Passing [ReferenceGroups] additionally records the group count vector
//! of each class, see [crate::group].
//!
//! ## Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use telescope::compressor::{compress, CompressOptions};
//! use telescope::merge::{read_paired_alignments, Mode};
//!
//! let mut streams = vec![Cursor::new(b"0 0 1\n1 0 1\n2 2\n3\n".to_vec())];
//! let aln = read_paired_alignments(&mut streams, None, 4, Mode::Unpaired).unwrap();
//!
//! let classes = compress(&aln, CompressOptions::default(), None);
//!
//! assert_eq!(classes.n_classes(), 2);
//! assert_eq!(classes.pattern(0).unwrap(), vec![0, 1]);
//! assert_eq!(classes.count(0), 2);
//! assert_eq!(classes.pattern(1).unwrap(), vec![2]);
//! assert_eq!(classes.count(1), 1);
//! assert_eq!(classes.n_pseudoaligned(), 3);
//! assert_eq!(classes.n_unique(), 1);
//! ```
//!

use indexmap::IndexSet;

use crate::bitmatrix::pack_words;
use crate::bitmatrix::BitMatrix;
use crate::bitmatrix::FrozenBitMatrix;
use crate::bitmatrix::HitKey;
use crate::group::GroupAggregator;
use crate::group::GroupCounts;
use crate::group::ReferenceGroups;
use crate::merge::Alignment;

/// What to record for each equivalence class besides its count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressOptions {
    /// Record the ids of the reads assigned to each class.
    pub track_reads: bool,
    /// Record the target set of each class.
    pub keep_patterns: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        CompressOptions { track_reads: false, keep_patterns: true }
    }
}

/// Compressed pseudoalignment.
#[derive(Clone, Debug, PartialEq)]
pub struct EquivalenceClasses {
    n_targets: u32,
    n_processed: u64,
    patterns: Option<FrozenBitMatrix>,
    counts: Vec<u64>,
    aligned_reads: Option<Vec<Vec<u32>>>,
    group_counts: Option<GroupCounts>,
}

impl EquivalenceClasses {
    /// Assemble classes from their target sets (rows of `patterns`) and counts.
    pub fn from_parts(
        n_targets: u32,
        n_processed: u64,
        patterns: FrozenBitMatrix,
        counts: Vec<u64>,
    ) -> Self {
        assert_eq!(patterns.n_cols(), n_targets);
        EquivalenceClasses { n_targets, n_processed, patterns: Some(patterns), counts, aligned_reads: None, group_counts: None }
    }

    pub fn n_targets(
        &self,
    ) -> u32 {
        self.n_targets
    }

    /// Number of reads in the input, aligned or not.
    pub fn n_processed(
        &self,
    ) -> u64 {
        self.n_processed
    }

    pub fn n_classes(
        &self,
    ) -> usize {
        self.counts.len()
    }

    /// Number of reads assigned to `class`.
    pub fn count(
        &self,
        class: usize,
    ) -> u64 {
        self.counts[class]
    }

    pub fn counts(
        &self,
    ) -> &[u64] {
        &self.counts
    }

    /// Number of reads that aligned to at least one target.
    pub fn n_pseudoaligned(
        &self,
    ) -> u64 {
        self.counts.iter().sum()
    }

    /// Number of classes with exactly one read.
    pub fn n_unique(
        &self,
    ) -> u64 {
        self.counts.iter().filter(|count| **count == 1).count() as u64
    }

    /// Targets of `class` in increasing order.
    ///
    /// Returns None if the patterns were not kept.
    pub fn pattern(
        &self,
        class: usize,
    ) -> Option<Vec<u32>> {
        self.patterns.as_ref().map(|patterns| patterns.row_ones(class))
    }

    pub fn patterns(
        &self,
    ) -> Option<&FrozenBitMatrix> {
        self.patterns.as_ref()
    }

    /// Ids of the reads assigned to `class` in the order they were seen.
    ///
    /// Returns None if the reads were not tracked.
    pub fn reads_assigned_to(
        &self,
        class: usize,
    ) -> Option<&[u32]> {
        self.aligned_reads.as_ref().map(|reads| reads[class].as_slice())
    }

    pub fn aligned_reads(
        &self,
    ) -> Option<&[Vec<u32>]> {
        self.aligned_reads.as_deref()
    }

    pub fn group_counts(
        &self,
    ) -> Option<&GroupCounts> {
        self.group_counts.as_ref()
    }

    /// Compute group counts from the kept patterns.
    ///
    /// Returns None if the patterns were not kept.
    pub fn group_by(
        &self,
        groups: &ReferenceGroups,
    ) -> Option<GroupCounts> {
        self.patterns.as_ref().map(|patterns| GroupCounts::from_patterns(patterns, self.n_classes(), groups))
    }
}

/// Streaming equivalence class compressor.
///
/// Feed reads with [observe](Compressor::observe) and collect the result
/// with [finish](Compressor::finish).
pub struct Compressor<'a> {
    n_targets: u32,
    classes: IndexSet<HitKey>,
    counts: Vec<u64>,
    aligned_reads: Option<Vec<Vec<u32>>>,
    patterns: Option<BitMatrix>,
    groups: Option<GroupAggregator<'a>>,
    key: Vec<u64>,
}

impl<'a> Compressor<'a> {
    pub fn new(
        n_targets: u32,
        options: CompressOptions,
        groups: Option<&'a ReferenceGroups>,
    ) -> Self {
        Compressor {
            n_targets,
            classes: IndexSet::new(),
            counts: Vec::new(),
            aligned_reads: options.track_reads.then(Vec::new),
            patterns: options.keep_patterns.then(|| BitMatrix::new(n_targets)),
            groups: groups.map(GroupAggregator::new),
            key: Vec::with_capacity(HitKey::n_words(n_targets)),
        }
    }

    /// Assign read `read_id` with hits `ones` to its equivalence class.
    ///
    /// `ones` may be in any order. Returns the class id, or None if `ones`
    /// is empty and the read is not assigned.
    ///
    /// # Panics
    ///
    /// If a target in `ones` is not less than the number of targets given to
    /// [Compressor::new]. The parsers reject such targets with
    /// [TargetOutOfRange](crate::TelescopeError::TargetOutOfRange).
    ///
    pub fn observe(
        &mut self,
        read_id: u32,
        ones: &[u32],
    ) -> Option<usize> {
        if ones.is_empty() {
            return None
        }
        assert!(ones.iter().all(|target| *target < self.n_targets), "read {} has a target outside 0..{}", read_id, self.n_targets);

        pack_words(ones, self.n_targets, &mut self.key);
        let class = match self.classes.get_index_of(self.key.as_slice()) {
            Some(class) => class,
            None => {
                let (class, _) = self.classes.insert_full(HitKey::from_words(self.key.clone()));
                self.counts.push(0);
                if let Some(reads) = self.aligned_reads.as_mut() {
                    reads.push(Vec::new());
                }
                if let Some(patterns) = self.patterns.as_mut() {
                    ones.iter().for_each(|target| patterns.set(class, *target));
                }
                if let Some(groups) = self.groups.as_mut() {
                    groups.add_class(ones);
                }
                class
            },
        };

        self.counts[class] += 1;
        if let Some(reads) = self.aligned_reads.as_mut() {
            reads[class].push(read_id);
        }

        Some(class)
    }

    pub fn n_classes(
        &self,
    ) -> usize {
        self.counts.len()
    }

    /// Freeze the classes seen so far.
    ///
    /// `n_processed` is the number of reads in the input, including reads
    /// that were never passed to [observe](Compressor::observe).
    ///
    pub fn finish(
        self,
        n_processed: u64,
    ) -> EquivalenceClasses {
        let n_classes = self.counts.len();
        let patterns = self.patterns.map(|mut patterns| {
            patterns.resize_to(n_classes, self.n_targets);
            patterns.freeze()
        });
        EquivalenceClasses {
            n_targets: self.n_targets,
            n_processed,
            patterns,
            counts: self.counts,
            aligned_reads: self.aligned_reads,
            group_counts: self.groups.map(GroupAggregator::finish),
        }
    }
}

/// Compress a merged pseudoalignment into equivalence classes
///
/// Reads are visited in increasing read id order, which fixes the class ids.
///
pub fn compress(
    aln: &Alignment,
    options: CompressOptions,
    groups: Option<&ReferenceGroups>,
) -> EquivalenceClasses {
    let mut compressor = Compressor::new(aln.matrix.n_cols(), options, groups);
    aln.matrix.non_empty_rows().for_each(|(row, ones)| {
        compressor.observe(row as u32, &ones);
    });
    log::info!("Found {} equivalence classes", compressor.n_classes());
    compressor.finish(aln.n_processed)
}
