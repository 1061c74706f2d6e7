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
use std::io::Write;

use crate::PseudoAln;
use crate::compressor::EquivalenceClasses;
use crate::error::TelescopeError;

/// Format a single pseudoalignment in Themisto format
///
/// Writes `<read_id> <target> <target> ...` to `conn`.
///
pub fn format_themisto_line<W: Write>(
    aln: &PseudoAln,
    conn: &mut W,
) -> Result<(), TelescopeError> {
    let separator: char = ' ';
    let mut formatted: String = aln.read_id.to_string();
    aln.ones.iter().for_each(|target| {
        formatted.push(separator);
        formatted += &target.to_string();
    });
    formatted += "\n";

    conn.write_all(formatted.as_bytes())?;
    Ok(())
}

/// Write the targets of every pseudoaligned read
///
/// Reads are written in increasing read id order, each with the targets of
/// its equivalence class. Unaligned reads are not written.
///
/// Fails if `classes` was compressed without tracking reads or without
/// keeping the patterns.
///
pub fn write_read_assignments<W: Write>(
    classes: &EquivalenceClasses,
    conn: &mut W,
) -> Result<(), TelescopeError> {
    let Some(aligned_reads) = classes.aligned_reads() else {
        return Err(TelescopeError::Config("read assignments were not tracked".to_string()))
    };
    let Some(patterns) = classes.patterns() else {
        return Err(TelescopeError::Config("equivalence class patterns were not kept".to_string()))
    };

    let mut assignments: Vec<(u32, usize)> = aligned_reads.iter().enumerate().flat_map(|(class, reads)| {
        reads.iter().map(move |read_id| (*read_id, class))
    }).collect();
    assignments.sort_unstable();

    let targets: Vec<Vec<u32>> = (0..classes.n_classes()).map(|class| patterns.row_ones(class)).collect();
    for (read_id, class) in assignments {
        let aln = PseudoAln{ read_id, ones: targets[class].clone() };
        format_themisto_line(&aln, conn)?;
    }
    conn.flush()?;
    Ok(())
}
