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

//! telescope is a library and a command-line client for:
//!
//!   - Compressing pseudoalignments into equivalence classes.
//!   - Converting [Themisto](https://github.com/algbio/themisto) pseudoalignments to
//!     [kallisto](https://github.com/pachterlab/kallisto) `.ec`/`.tsv` and `run_info.json` files.
//!   - Merging the pseudoalignments of paired reads.
//!   - Aggregating equivalence classes to groups of targets.
//!
//! A pseudoalignment is a reads × targets binary matrix where a set bit means
//! that the read aligned to the target. Reads that aligned to exactly the
//! same targets belong to the same equivalence class, and storing each class
//! once with a read count is usually orders of magnitude smaller than the
//! full matrix.
//!
//! Internally, telescope uses [roaring bitmaps](https://roaringbitmap.org/) to store
//! the pseudoalignments.
//!
//! ## Usage
//!
//! ### Command line
//!
//! The telescope CLI supports the following subcommands:
//!   - `telescope convert` compress to kallisto `.ec`, `.tsv` and `run_info.json` files.
//!   - `telescope group` compress and count hits in groups of targets.
//!   - `telescope pack` convert a Themisto file to the compact block format.
//!
//! ### Rust API
//!
//! The pipeline is split into stages that can be used separately:
//!
//!   - [read_paired_alignments](merge::read_paired_alignments): parse and merge input streams into a [BitMatrix](bitmatrix::BitMatrix).
//!   - [compress](compressor::compress): compress a merged alignment into [EquivalenceClasses](compressor::EquivalenceClasses).
//!   - [printer]: write the classes in the supported output formats.
//!
//! The functions in this module chain the stages for whole streams. See
//! documentation for the appropriate functions or structs for usage examples.
//!
//! ## Input formats
//!
//! Themisto: one line per read, the read id followed by the indexes of the
//! targets it aligned to, separated by spaces.
//!
//! Compact: a `<n_reads>,<n_targets>` header line followed by chunks, see
//! [parser::compact].
//!

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::path::Path;

pub mod bitmatrix;
pub mod compressor;
pub mod error;
pub mod group;
pub mod merge;
pub mod parser;
pub mod printer;

pub use compressor::{CompressOptions, EquivalenceClasses};
pub use error::TelescopeError;
pub use merge::Mode;
pub use parser::Format;

/// Single pseudoalignment record.
///
/// Produced by the per-line parsers and consumed by the line printers.
///
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PseudoAln {
    /// Id of the read, also its row in the pseudoalignment matrix.
    pub read_id: u32,
    /// Indexes of the targets the read aligned to.
    pub ones: Vec<u32>,
}

/// Number of targets listed in `path`.
///
/// If `path` is a directory, counts the lines in `coloring-names.txt` inside
/// it. Otherwise counts the lines in `path`.
///
pub fn count_targets(
    path: &Path,
) -> Result<u32, TelescopeError> {
    let file_path = if path.is_dir() { path.join("coloring-names.txt") } else { path.to_path_buf() };
    let file = File::open(&file_path).map_err(|e| TelescopeError::from(e).with_path(&file_path))?;
    let mut n_lines: u32 = 0;
    for line in BufReader::new(file).lines() {
        line.map_err(|e| TelescopeError::from(e).with_path(&file_path))?;
        n_lines += 1;
    }
    if n_lines == 0 {
        return Err(TelescopeError::Config(format!("no targets in {}", file_path.display())))
    }
    Ok(n_lines)
}

/// Read, merge, and compress pseudoalignments from [BufRead]s.
///
/// ## Usage
///
/// ```rust
/// use telescope::{compress_from_read, CompressOptions, Mode};
/// use std::io::Cursor;
///
/// // Mates of the same 3 reads against 4 targets
/// let fwd: Cursor<Vec<u8>> = Cursor::new(b"0 0 1\n1 0 1 3\n2 2\n".to_vec());
/// let rev: Cursor<Vec<u8>> = Cursor::new(b"0 0 1 2\n1 0 1\n2 3\n".to_vec());
/// let mut inputs = vec![fwd, rev];
///
/// let classes = compress_from_read(&mut inputs, None, 4, Mode::Intersection, CompressOptions::default(), None).unwrap();
///
/// // Reads 0 and 1 share {0, 1}, read 2 has no common hits
/// assert_eq!(classes.n_classes(), 1);
/// assert_eq!(classes.pattern(0).unwrap(), vec![0, 1]);
/// assert_eq!(classes.count(0), 2);
/// assert_eq!(classes.n_processed(), 3);
/// ```
///
pub fn compress_from_read<R: BufRead>(
    conns: &mut [R],
    format: Option<Format>,
    n_targets: u32,
    mode: Mode,
    options: CompressOptions,
    groups: Option<&group::ReferenceGroups>,
) -> Result<EquivalenceClasses, TelescopeError> {
    let aln = merge::read_paired_alignments(conns, format, n_targets, mode)?;
    Ok(compressor::compress(&aln, options, groups))
}

/// Convert pseudoalignments from [BufRead]s to kallisto `.ec` and `.tsv` data.
///
/// ## Usage
///
/// ```rust
/// use telescope::{convert_from_read_to_write, Mode};
/// use std::io::Cursor;
///
/// // Have this input
/// //   0 0 1
/// //   1 0 1
/// //   2 2
/// //   3
/// let mut inputs = vec![Cursor::new(b"0 0 1\n1 0 1\n2 2\n3\n".to_vec())];
///
/// let mut ec: Vec<u8> = Vec::new();
/// let mut tsv: Vec<u8> = Vec::new();
/// let classes = convert_from_read_to_write(&mut inputs, 4, Mode::Unpaired, &mut ec, &mut tsv).unwrap();
///
/// assert_eq!(ec, b"0\t0,1\n1\t2\n".to_vec());
/// assert_eq!(tsv, b"0\t2\n1\t1\n".to_vec());
/// assert_eq!(classes.n_unique(), 1);
/// ```
///
pub fn convert_from_read_to_write<R: BufRead, W: Write, V: Write>(
    conns: &mut [R],
    n_targets: u32,
    mode: Mode,
    ec_out: &mut W,
    tsv_out: &mut V,
) -> Result<EquivalenceClasses, TelescopeError> {
    let classes = compress_from_read(conns, None, n_targets, mode, CompressOptions::default(), None)?;
    printer::kallisto::write_ec(&classes, ec_out)?;
    printer::kallisto::write_tsv(&classes, tsv_out)?;
    Ok(classes)
}

/// Convert a Themisto pseudoalignment from [BufRead] to the compact format.
///
/// ## Usage
///
/// ```rust
/// use telescope::pack_from_read_to_write;
/// use telescope::merge::{read_paired_alignments, Mode};
/// use telescope::Format;
/// use std::io::Cursor;
///
/// let mut input: Cursor<Vec<u8>> = Cursor::new(b"0 1\n1\n2 0 1\n".to_vec());
/// let mut packed: Vec<u8> = Vec::new();
/// pack_from_read_to_write(&mut input, 2, 65536, &mut packed).unwrap();
///
/// assert!(packed.starts_with(b"3,2\n"));
///
/// let mut streams = vec![Cursor::new(packed)];
/// let aln = read_paired_alignments(&mut streams, Some(Format::Compact), 2, Mode::Unpaired).unwrap();
/// assert_eq!(aln.n_processed, 3);
/// assert_eq!(aln.matrix.row_ones(2), vec![0, 1]);
/// ```
///
pub fn pack_from_read_to_write<R: BufRead, W: Write>(
    conn_in: &mut R,
    n_targets: u32,
    block_size: usize,
    conn_out: &mut W,
) -> Result<(), TelescopeError> {
    if n_targets == 0 {
        return Err(TelescopeError::Config("number of targets must be positive".to_string()))
    }
    let mut matrix = bitmatrix::BitMatrix::new(n_targets);
    let n_reads = parser::themisto::read_themisto_file(conn_in, &mut matrix)?;
    matrix.optimize();
    printer::compact::write_compact(&matrix, n_reads, block_size, conn_out)
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn concrete_scenario() {
        use super::{compress_from_read, CompressOptions, Mode};
        use std::io::Cursor;

        let mut inputs = vec![Cursor::new(b"0 0 1\n1 0 1\n2 2\n3\n".to_vec())];
        let got = compress_from_read(&mut inputs, None, 4, Mode::Unpaired, CompressOptions::default(), None).unwrap();

        assert_eq!(got.n_classes(), 2);
        assert_eq!(got.pattern(0).unwrap(), vec![0, 1]);
        assert_eq!(got.count(0), 2);
        assert_eq!(got.pattern(1).unwrap(), vec![2]);
        assert_eq!(got.count(1), 1);
        assert_eq!(got.n_pseudoaligned(), 3);
        assert_eq!(got.n_unique(), 1);
    }

    #[test]
    fn paired_mode_algebra() {
        use super::{compress_from_read, CompressOptions, Mode};
        use std::io::Cursor;

        // {1010} and {1100}
        let fwd: Vec<u8> = b"0 0 2\n".to_vec();
        let rev: Vec<u8> = b"0 0 1\n".to_vec();

        let mut inputs = vec![Cursor::new(fwd.clone()), Cursor::new(rev.clone())];
        let got = compress_from_read(&mut inputs, None, 4, Mode::Intersection, CompressOptions::default(), None).unwrap();
        assert_eq!(got.pattern(0).unwrap(), vec![0]);

        let mut inputs = vec![Cursor::new(fwd), Cursor::new(rev)];
        let got = compress_from_read(&mut inputs, None, 4, Mode::Union, CompressOptions::default(), None).unwrap();
        assert_eq!(got.pattern(0).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn compact_and_themisto_inputs_agree() {
        use super::{compress_from_read, pack_from_read_to_write, CompressOptions, Mode};
        use std::io::Cursor;

        let data: Vec<u8> = b"0 3\n1 1 2\n2 3\n3\n4 0\n5 1 2\n".to_vec();

        let mut packed: Vec<u8> = Vec::new();
        pack_from_read_to_write(&mut Cursor::new(data.clone()), 4, 2, &mut packed).unwrap();

        let mut plain = vec![Cursor::new(data)];
        let expected = compress_from_read(&mut plain, None, 4, Mode::Unpaired, CompressOptions::default(), None).unwrap();
        let mut compact = vec![Cursor::new(packed)];
        let got = compress_from_read(&mut compact, None, 4, Mode::Unpaired, CompressOptions::default(), None).unwrap();

        assert_eq!(got, expected);
    }

    #[test]
    fn count_targets_from_file_and_directory() {
        use super::count_targets;

        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("coloring-names.txt"), "chr.fasta\nplasmid.fasta\nvirus.fasta\n").unwrap();
        std::fs::write(tmp.path().join("targets.txt"), "chr.fasta\nplasmid.fasta\n").unwrap();

        assert_eq!(count_targets(tmp.path()).unwrap(), 3);
        assert_eq!(count_targets(&tmp.path().join("targets.txt")).unwrap(), 2);
        assert!(count_targets(&tmp.path().join("missing.txt")).is_err());
    }
}
