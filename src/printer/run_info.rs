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

//! Kallisto-compatible `run_info.json` summary.

use std::io::Write;

use serde::Serialize;

use crate::compressor::EquivalenceClasses;
use crate::error::TelescopeError;

/// Details of the run that are not derived from the alignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Provenance {
    /// Version reported as the producing kallisto version.
    pub kallisto_version: String,
    /// Version reported as the kallisto index version.
    pub index_version: u32,
    pub start_time: String,
    /// Command line of the run.
    pub call: String,
}

impl Default for Provenance {
    fn default() -> Self {
        Provenance {
            kallisto_version: "0.45.0".to_string(),
            index_version: 10,
            start_time: String::new(),
            call: String::new(),
        }
    }
}

/// Contents of `run_info.json`. Fields are serialized in declaration order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunInfo {
    pub n_targets: u32,
    pub n_bootstraps: u32,
    pub n_processed: u64,
    pub n_pseudoaligned: u64,
    pub n_unique: u64,
    pub p_pseudoaligned: f64,
    pub p_unique: f64,
    pub kallisto_version: String,
    pub index_version: u32,
    pub start_time: String,
    pub call: String,
}

// Percentage with one decimal, zero if there is nothing to divide
fn percentage(
    part: u64,
    total: u64,
) -> f64 {
    if total == 0 {
        return 0.0
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

impl RunInfo {
    pub fn new(
        classes: &EquivalenceClasses,
        provenance: &Provenance,
    ) -> Self {
        let n_processed = classes.n_processed();
        let n_pseudoaligned = classes.n_pseudoaligned();
        let n_unique = classes.n_unique();
        RunInfo {
            n_targets: classes.n_targets(),
            n_bootstraps: 0,
            n_processed,
            n_pseudoaligned,
            n_unique,
            p_pseudoaligned: percentage(n_pseudoaligned, n_processed),
            p_unique: percentage(n_unique, n_processed),
            kallisto_version: provenance.kallisto_version.clone(),
            index_version: provenance.index_version,
            start_time: provenance.start_time.clone(),
            call: provenance.call.clone(),
        }
    }
}

/// Write `info` as JSON indented by `indent` spaces.
pub fn write_run_info<W: Write>(
    info: &RunInfo,
    indent: usize,
    conn: &mut W,
) -> Result<(), TelescopeError> {
    let indent: Vec<u8> = vec![b' '; indent];
    let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut *conn, formatter);
    info.serialize(&mut serializer).map_err(std::io::Error::from)?;
    conn.write_all(b"\n")?;
    conn.flush()?;
    Ok(())
}
