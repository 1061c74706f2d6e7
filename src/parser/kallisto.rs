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

use crate::bitmatrix::BitMatrix;
use crate::compressor::EquivalenceClasses;
use crate::error::TelescopeError;

fn parse_number(
    field: Option<&[u8]>,
    line: usize,
    what: &str,
) -> Result<u64, TelescopeError> {
    field.and_then(|x| x.trim().to_str().ok()).and_then(|x| x.parse::<u64>().ok()).ok_or_else(|| {
        TelescopeError::Parse { line, message: format!("missing or malformed {}", what) }
    })
}

fn next_line<R: BufRead>(
    conn: &mut R,
    buf: &mut Vec<u8>,
) -> Result<bool, TelescopeError> {
    buf.clear();
    let n_read = conn.read_until(b'\n', buf)?;
    while buf.last().is_some_and(|x| *x == b'\n' || *x == b'\r') {
        buf.pop();
    }
    Ok(n_read > 0)
}

// Ids and counts of the classes with a nonzero count, with their line numbers
fn read_counts<S: BufRead>(
    tsv_conn: &mut S,
) -> Result<Vec<(u64, u64, usize)>, TelescopeError> {
    let mut counts: Vec<(u64, u64, usize)> = Vec::new();
    let mut buf: Vec<u8> = Vec::new();
    let mut line: usize = 0;
    while next_line(tsv_conn, &mut buf)? {
        line += 1;
        if buf.trim().is_empty() {
            continue;
        }
        let mut records = buf.split_str("\t");
        let id = parse_number(records.next(), line, "class id in .tsv")?;
        let count = parse_number(records.next(), line, "count in .tsv")?;
        if count > 0 {
            counts.push((id, count, line));
        }
    }
    Ok(counts)
}

/// Read equivalence classes from Kallisto `.ec` and `.tsv` files
///
/// `tsv_conn` lists `<class_id>\t<count>` lines and `ec_conn` lists
/// `<class_id>\t<target>,<target>,...` lines, both in the same class id
/// order. The classes with a nonzero count in `tsv_conn` are kept and
/// numbered from zero in file order. Lines in `ec_conn` for classes that are
/// missing from `tsv_conn` or have a count of zero are skipped.
///
/// Fails with [TelescopeError::Parse] if a kept class has no line in
/// `ec_conn`.
///
/// The number of processed reads is not stored in these files and is set to
/// the number of pseudoaligned reads.
///
pub fn read_kallisto<R: BufRead, S: BufRead>(
    n_targets: u32,
    ec_conn: &mut R,
    tsv_conn: &mut S,
) -> Result<EquivalenceClasses, TelescopeError> {
    let wanted = read_counts(tsv_conn)?;

    let mut patterns = BitMatrix::new(n_targets);
    let mut buf: Vec<u8> = Vec::new();
    let mut line: usize = 0;
    let mut class: usize = 0;
    while class < wanted.len() && next_line(ec_conn, &mut buf)? {
        line += 1;
        if buf.trim().is_empty() {
            continue;
        }
        let mut records = buf.split_str("\t");
        let id = parse_number(records.next(), line, "class id in .ec")?;
        if id != wanted[class].0 {
            continue;
        }

        let targets = records.next().unwrap_or_default();
        for record in targets.split_str(",").filter(|x| !x.trim().is_empty()) {
            let target = parse_number(Some(record), line, "target in .ec")?;
            if target >= n_targets as u64 {
                return Err(TelescopeError::TargetOutOfRange { line, target, n_targets })
            }
            patterns.set(class, target as u32);
        }
        class += 1;
    }
    if let Some((id, _, tsv_line)) = wanted.get(class) {
        return Err(TelescopeError::Parse { line: *tsv_line, message: format!("class id {} in .tsv has no line in .ec", id) })
    }

    let counts: Vec<u64> = wanted.iter().map(|(_, count, _)| *count).collect();
    patterns.resize_to(counts.len(), n_targets);
    log::debug!("Read {} equivalence classes", counts.len());

    let n_processed: u64 = counts.iter().sum();
    Ok(EquivalenceClasses::from_parts(n_targets, n_processed, patterns.freeze(), counts))
}
