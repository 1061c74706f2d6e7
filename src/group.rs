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

//! Aggregate equivalence classes to groups of targets.
//!
//! A [ReferenceGroups] partition assigns every target to one group. The
//! group count vector of a class has, for each group, the number of that
//! group's targets in the class.
//!
//! ## Usage
//!
//! ```rust
//! use telescope::group::ReferenceGroups;
//!
//! let groups = ReferenceGroups::new(vec![0, 0, 1, 1]).unwrap();
//! assert_eq!(groups.n_groups(), 2);
//! assert_eq!(groups.count_hits(&[0, 2]), vec![1, 1]);
//! ```
//!

use std::io::BufRead;

use indexmap::IndexSet;
use rayon::prelude::*;

use crate::bitmatrix::BitMatrix;
use crate::error::TelescopeError;

/// Partition of the targets into groups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReferenceGroups {
    indicators: Vec<u32>,
    names: Vec<String>,
}

impl ReferenceGroups {
    /// Build a partition from the group id of each target.
    ///
    /// Group ids must be dense: every id in `0..=max` needs at least one
    /// target. No group may have more than [u16::MAX] targets so that the
    /// per-class counts fit in 16 bits.
    ///
    pub fn new(
        indicators: Vec<u32>,
    ) -> Result<Self, TelescopeError> {
        let n_groups = indicators.iter().max().map(|x| *x as usize + 1).unwrap_or(0);
        let names: Vec<String> = (0..n_groups).map(|idx| idx.to_string()).collect();
        Self::with_names(indicators, names)
    }

    fn with_names(
        indicators: Vec<u32>,
        names: Vec<String>,
    ) -> Result<Self, TelescopeError> {
        if indicators.is_empty() {
            return Err(TelescopeError::Config("reference groups are empty".to_string()))
        }

        let mut sizes: Vec<usize> = vec![0; names.len()];
        for group in indicators.iter() {
            let Some(size) = sizes.get_mut(*group as usize) else {
                return Err(TelescopeError::Config(format!("group id {} has no name", group)))
            };
            *size += 1;
        }
        if let Some(empty) = sizes.iter().position(|size| *size == 0) {
            return Err(TelescopeError::Config(format!("group '{}' has no targets", names[empty])))
        }
        if let Some(large) = sizes.iter().position(|size| *size > u16::MAX as usize) {
            return Err(TelescopeError::Config(format!("group '{}' has {} targets, at most {} are supported", names[large], sizes[large], u16::MAX)))
        }

        Ok(ReferenceGroups { indicators, names })
    }

    /// Read group names, one line per target
    ///
    /// Line `j` names the group of target `j`. Group ids are assigned in the
    /// order the names first appear. Fails if there are not exactly
    /// `n_targets` lines.
    ///
    pub fn from_names<R: BufRead>(
        conn: &mut R,
        n_targets: u32,
    ) -> Result<Self, TelescopeError> {
        let mut names: IndexSet<String> = IndexSet::new();
        let mut indicators: Vec<u32> = Vec::with_capacity(n_targets as usize);
        for line in conn.lines() {
            let line = line?;
            let name = line.trim_end_matches('\r');
            let (group, _) = names.insert_full(name.to_string());
            indicators.push(group as u32);
        }
        if indicators.len() != n_targets as usize {
            return Err(TelescopeError::Config(format!("group file has {} lines but there are {} targets", indicators.len(), n_targets)))
        }
        log::info!("Read {} groups for {} targets", names.len(), n_targets);

        Self::with_names(indicators, names.into_iter().collect())
    }

    pub fn n_groups(
        &self,
    ) -> usize {
        self.names.len()
    }

    pub fn n_targets(
        &self,
    ) -> usize {
        self.indicators.len()
    }

    /// Group id of `target`.
    pub fn group_of(
        &self,
        target: u32,
    ) -> usize {
        self.indicators[target as usize] as usize
    }

    pub fn names(
        &self,
    ) -> &[String] {
        &self.names
    }

    /// Number of hits in each group.
    pub fn count_hits(
        &self,
        ones: &[u32],
    ) -> Vec<u16> {
        let mut counts: Vec<u16> = vec![0; self.n_groups()];
        self.add_hits(ones, &mut counts);
        counts
    }

    fn add_hits(
        &self,
        ones: &[u32],
        counts: &mut [u16],
    ) {
        ones.iter().for_each(|target| {
            counts[self.group_of(*target)] += 1;
        });
    }
}

/// Class × group table of hit counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupCounts {
    n_groups: usize,
    counts: Vec<u16>,
}

impl GroupCounts {
    /// Compute the group counts of the first `n_classes` rows of `patterns`.
    ///
    /// Classes are processed in parallel in the current rayon thread pool.
    ///
    pub fn from_patterns(
        patterns: &BitMatrix,
        n_classes: usize,
        groups: &ReferenceGroups,
    ) -> Self {
        let n_groups = groups.n_groups();
        let mut counts: Vec<u16> = vec![0; n_classes * n_groups];
        counts.par_chunks_mut(n_groups).enumerate().for_each(|(class, row)| {
            groups.add_hits(&patterns.row_ones(class), row);
        });
        GroupCounts { n_groups, counts }
    }

    pub fn n_groups(
        &self,
    ) -> usize {
        self.n_groups
    }

    pub fn n_classes(
        &self,
    ) -> usize {
        self.counts.len() / self.n_groups
    }

    /// Hits of `class` in `group`.
    pub fn get(
        &self,
        class: usize,
        group: usize,
    ) -> u16 {
        self.counts[class * self.n_groups + group]
    }

    /// Group count vector of `class`.
    pub fn row(
        &self,
        class: usize,
    ) -> &[u16] {
        &self.counts[(class * self.n_groups)..((class + 1) * self.n_groups)]
    }
}

/// Builds [GroupCounts] one new class at a time during compression.
pub struct GroupAggregator<'a> {
    groups: &'a ReferenceGroups,
    counts: Vec<u16>,
}

impl<'a> GroupAggregator<'a> {
    pub fn new(
        groups: &'a ReferenceGroups,
    ) -> Self {
        GroupAggregator { groups, counts: Vec::new() }
    }

    /// Append the group count vector of a newly discovered class.
    pub fn add_class(
        &mut self,
        ones: &[u32],
    ) {
        let start = self.counts.len();
        self.counts.resize(start + self.groups.n_groups(), 0);
        self.groups.add_hits(ones, &mut self.counts[start..]);
    }

    pub fn finish(
        self,
    ) -> GroupCounts {
        GroupCounts { n_groups: self.groups.n_groups(), counts: self.counts }
    }
}
