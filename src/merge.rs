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

//! Merge pseudoalignments of paired reads.
//!
//! Each input stream holds one mate of the same reads, addressed by the
//! same read ids. The streams are combined row by row according to a
//! [Mode] into a single read-only matrix.
//!
//! ## Usage
//!
//! ```rust
//! use std::io::Cursor;
//! use telescope::merge::{read_paired_alignments, Mode};
//!
//! let fwd: Cursor<Vec<u8>> = Cursor::new(b"0 0 2\n1 1\n".to_vec());
//! let rev: Cursor<Vec<u8>> = Cursor::new(b"0 0 1\n1 1\n".to_vec());
//! let mut streams = vec![fwd, rev];
//!
//! let aln = read_paired_alignments(&mut streams, None, 4, Mode::Intersection).unwrap();
//!
//! assert_eq!(aln.n_processed, 2);
//! assert_eq!(aln.matrix.row_ones(0), vec![0]);
//! assert_eq!(aln.matrix.row_ones(1), vec![1]);
//! ```
//!

use std::io::BufRead;

use crate::bitmatrix::BitMatrix;
use crate::bitmatrix::FrozenBitMatrix;
use crate::error::TelescopeError;
use crate::parser::read_alignment_into;
use crate::parser::Format;

/// How paired input streams are combined.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Streams are independent reads. Rows with the same read id are OR'd.
    #[default]
    Unpaired,
    /// A read hits a target if either mate does.
    Union,
    /// A read hits a target only if all mates do.
    Intersection,
}

impl std::str::FromStr for Mode {
    type Err = TelescopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaired" => Ok(Mode::Unpaired),
            "union" => Ok(Mode::Union),
            "intersection" => Ok(Mode::Intersection),
            _ => Err(TelescopeError::Config(format!("'{}' is not a valid Mode", s))),
        }
    }
}

/// Merged pseudoalignment of all input streams.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    /// Reads × targets, row = read id.
    pub matrix: FrozenBitMatrix,
    /// Reads processed in each stream.
    pub n_processed: u64,
}

/// Read and merge paired pseudoalignment streams
///
/// The first stream is read directly into the result. Every other stream is
/// read into its own matrix, checked to contain the same number of reads as
/// the first one, and combined into the result according to `mode`.
///
/// If `format` is None it is guessed separately for each stream.
///
/// Fails with [TelescopeError::MismatchedPairCount] as soon as a stream
/// reports a different number of reads.
///
pub fn read_paired_alignments<R: BufRead>(
    streams: &mut [R],
    format: Option<Format>,
    n_targets: u32,
    mode: Mode,
) -> Result<Alignment, TelescopeError> {
    if n_targets == 0 {
        return Err(TelescopeError::Config("number of targets must be positive".to_string()))
    }
    let Some((first, rest)) = streams.split_first_mut() else {
        return Err(TelescopeError::Config("no input pseudoalignments".to_string()))
    };

    let mut matrix = BitMatrix::new(n_targets);
    let n_processed = read_alignment_into(first, format, &mut matrix)?;
    log::info!("Read {} reads from input 1", n_processed);

    if !rest.is_empty() {
        log::info!("Merging {} inputs with mode {:?}", rest.len() + 1, mode);
    }

    for (idx, stream) in rest.iter_mut().enumerate() {
        let mut mate = BitMatrix::with_rows(matrix.n_rows(), n_targets);
        let got = read_alignment_into(stream, format, &mut mate)?;
        log::info!("Read {} reads from input {}", got, idx + 2);
        if got != n_processed {
            return Err(TelescopeError::MismatchedPairCount { stream: idx + 1, expected: n_processed, got })
        }

        match mode {
            Mode::Intersection => matrix.bitwise_and(&mate),
            Mode::Union | Mode::Unpaired => matrix.bitwise_or(&mate),
        }
    }

    Ok(Alignment { matrix: matrix.freeze(), n_processed })
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn mode_from_str() {
        use super::Mode;

        assert_eq!("unpaired".parse::<Mode>().unwrap(), Mode::Unpaired);
        assert_eq!("union".parse::<Mode>().unwrap(), Mode::Union);
        assert_eq!("intersection".parse::<Mode>().unwrap(), Mode::Intersection);
        assert!("xor".parse::<Mode>().is_err());
    }

    #[test]
    fn union_and_intersection_of_two_streams() {
        use super::{read_paired_alignments, Mode};
        use std::io::Cursor;

        // {1010} and {1100}
        let fwd: Vec<u8> = b"0 0 2\n".to_vec();
        let rev: Vec<u8> = b"0 0 1\n".to_vec();

        let mut streams = vec![Cursor::new(fwd.clone()), Cursor::new(rev.clone())];
        let got = read_paired_alignments(&mut streams, None, 4, Mode::Intersection).unwrap();
        assert_eq!(got.matrix.row_ones(0), vec![0]);

        let mut streams = vec![Cursor::new(fwd), Cursor::new(rev)];
        let got = read_paired_alignments(&mut streams, None, 4, Mode::Union).unwrap();
        assert_eq!(got.matrix.row_ones(0), vec![0, 1, 2]);
    }

    #[test]
    fn intersection_can_empty_a_row() {
        use super::{read_paired_alignments, Mode};
        use std::io::Cursor;

        let mut streams = vec![
            Cursor::new(b"0 0\n1 1\n".to_vec()),
            Cursor::new(b"0 1\n1 1\n".to_vec()),
        ];
        let got = read_paired_alignments(&mut streams, None, 2, Mode::Intersection).unwrap();

        assert_eq!(got.n_processed, 2);
        assert!(!got.matrix.any_in_row(0));
        assert_eq!(got.matrix.row_ones(1), vec![1]);
    }

    #[test]
    fn unpaired_streams_are_combined_per_read() {
        use super::{read_paired_alignments, Mode};
        use std::io::Cursor;

        let mut streams = vec![
            Cursor::new(b"0 0\n1\n".to_vec()),
            Cursor::new(b"0 2\n1 1\n".to_vec()),
            Cursor::new(b"0\n1 1\n".to_vec()),
        ];
        let got = read_paired_alignments(&mut streams, None, 3, Mode::Unpaired).unwrap();

        assert_eq!(got.matrix.row_ones(0), vec![0, 2]);
        assert_eq!(got.matrix.row_ones(1), vec![1]);
    }

    #[test]
    fn single_stream_ignores_mode() {
        use super::{read_paired_alignments, Mode};
        use std::io::Cursor;

        let mut streams = vec![Cursor::new(b"0 0 1\n1 0 1\n2 2\n3\n".to_vec())];
        let got = read_paired_alignments(&mut streams, None, 4, Mode::Intersection).unwrap();

        assert_eq!(got.n_processed, 4);
        assert_eq!(got.matrix.n_rows(), 4);
        assert_eq!(got.matrix.n_set(), 5);
    }

    #[test]
    fn mismatched_read_counts() {
        use super::{read_paired_alignments, Mode};
        use crate::error::TelescopeError;
        use std::io::Cursor;

        let mut streams = vec![
            Cursor::new(b"0 0\n1 1\n2 1\n".to_vec()),
            Cursor::new(b"0 0\n1 1\n".to_vec()),
        ];
        let got = read_paired_alignments(&mut streams, None, 2, Mode::Union);

        assert!(matches!(got, Err(TelescopeError::MismatchedPairCount{ stream: 1, expected: 3, got: 2 })));
    }

    #[test]
    fn no_streams() {
        use super::{read_paired_alignments, Mode};
        use crate::error::TelescopeError;
        use std::io::Cursor;

        let mut streams: Vec<Cursor<Vec<u8>>> = Vec::new();
        let got = read_paired_alignments(&mut streams, None, 2, Mode::Union);

        assert!(matches!(got, Err(TelescopeError::Config(_))));
    }
}
