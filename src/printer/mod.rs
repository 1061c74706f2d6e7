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

//! Writers for [EquivalenceClasses](crate::compressor::EquivalenceClasses)
//! and pseudoalignments.
//!
//! - [kallisto]: `.ec` and `.tsv` files.
//! - [themisto]: read to target assignments in Themisto format.
//! - [run_info]: Kallisto `run_info.json`.
//! - [groups]: class × group count table.
//! - [compact]: compact block format.
//!
//! ## Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use telescope::compressor::{compress, CompressOptions};
//! use telescope::merge::{read_paired_alignments, Mode};
//! use telescope::printer::kallisto::{write_ec, write_tsv};
//!
//! let mut streams = vec![Cursor::new(b"0 0 1\n1 0 1\n2 2\n3\n".to_vec())];
//! let aln = read_paired_alignments(&mut streams, None, 4, Mode::Unpaired).unwrap();
//! let classes = compress(&aln, CompressOptions::default(), None);
//!
//! let mut ec: Vec<u8> = Vec::new();
//! write_ec(&classes, &mut ec).unwrap();
//! let mut tsv: Vec<u8> = Vec::new();
//! write_tsv(&classes, &mut tsv).unwrap();
//!
//! assert_eq!(ec, b"0\t0,1\n1\t2\n".to_vec());
//! assert_eq!(tsv, b"0\t2\n1\t1\n".to_vec());
//! ```
//!

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::TelescopeError;

// Format specific implementations
pub mod compact;
pub mod groups;
pub mod kallisto;
pub mod run_info;
pub mod themisto;

/// Create `path` for buffered writing.
pub fn create_output(
    path: &Path,
) -> Result<BufWriter<File>, TelescopeError> {
    let file = File::create(path).map_err(|e| TelescopeError::from(e).with_path(path))?;
    Ok(BufWriter::new(file))
}
