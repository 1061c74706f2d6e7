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
use std::io::BufRead;

use bstr::ByteSlice;

use crate::PseudoAln;
use crate::bitmatrix::BitMatrix;
use crate::error::TelescopeError;

fn parse_field(
    field: &[u8],
    line: usize,
) -> Result<u64, TelescopeError> {
    field.to_str().ok().and_then(|x| x.parse::<u64>().ok()).ok_or_else(|| {
        TelescopeError::Parse { line, message: format!("'{}' is not a non-negative integer", field.as_bstr()) }
    })
}

/// Parse a line from Themisto
///
/// Reads a pseudoalignment line stored in the *Themisto* format: the read id
/// followed by the indexes of the targets the read aligned to, separated by
/// whitespace. A line with only the read id is an unaligned read.
///
/// `line` is the 1-based line number used in error messages.
///
pub fn read_themisto(
    n_targets: u32,
    bytes: &[u8],
    line: usize,
) -> Result<PseudoAln, TelescopeError> {
    let mut records = bytes.fields();

    let Some(id_bytes) = records.next() else {
        return Err(TelescopeError::Parse { line, message: "missing read id".to_string() })
    };
    let read_id = parse_field(id_bytes, line)?;
    let read_id = u32::try_from(read_id).map_err(|_| {
        TelescopeError::Parse { line, message: format!("read id {} does not fit in 32 bits", read_id) }
    })?;

    let mut ones: Vec<u32> = Vec::new();
    for record in records {
        let target = parse_field(record, line)?;
        if target >= n_targets as u64 {
            return Err(TelescopeError::TargetOutOfRange { line, target, n_targets })
        }
        ones.push(target as u32);
    }

    Ok(PseudoAln{ read_id, ones })
}

/// Read a Themisto file into `matrix`
///
/// Blank lines are skipped. Row `read_id` of `matrix` gets the hits of each
/// record. Records with the same read id are combined.
///
/// Returns the number of reads processed, which is the number of non-blank
/// lines.
///
pub fn read_themisto_file<R: BufRead>(
    conn: &mut R,
    matrix: &mut BitMatrix,
) -> Result<u64, TelescopeError> {
    let n_targets = matrix.n_cols();
    let mut n_processed: u64 = 0;
    let mut prev_id: Option<u32> = None;
    let mut warned_unsorted = false;

    let mut buf: Vec<u8> = Vec::new();
    let mut line: usize = 0;
    loop {
        buf.clear();
        if conn.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line += 1;
        if buf.trim().is_empty() {
            continue;
        }

        let record = read_themisto(n_targets, &buf, line)?;
        n_processed += 1;

        if !warned_unsorted && prev_id.is_some_and(|prev| prev > record.read_id) {
            log::debug!("Read ids are not sorted (line {}), class ids follow read id order", line);
            warned_unsorted = true;
        }
        prev_id = Some(record.read_id);

        let row = record.read_id as usize;
        record.ones.iter().for_each(|target| matrix.set(row, *target));
        matrix.resize_to(row + 1, n_targets);
    }
    matrix.resize_to(n_processed as usize, n_targets);

    Ok(n_processed)
}
