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

// Format specific implementations
pub mod compact;
pub mod kallisto;
pub mod themisto;

use crate::bitmatrix::BitMatrix;
use crate::error::TelescopeError;

use crate::parser::compact::read_compact;
use crate::parser::themisto::read_themisto_file;

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use bstr::ByteSlice;
use flate2::bufread::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Supported input formats.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Plain text, one `<read_id> <target> <target> ...` line per read.
    #[default]
    Themisto,
    /// Header `<n_reads>,<n_targets>` followed by `<len>\n<bytes>` chunks.
    Compact,
}

impl std::str::FromStr for Format {
    type Err = TelescopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "themisto" => Ok(Format::Themisto),
            "compact" => Ok(Format::Compact),
            _ => Err(TelescopeError::Config(format!("'{}' is not a valid Format", s))),
        }
    }
}

/// Open `path` for reading, inflating it if it is gzip-compressed.
pub fn open_input(
    path: &Path,
) -> Result<Box<dyn BufRead>, TelescopeError> {
    let file = File::open(path).map_err(|e| TelescopeError::from(e).with_path(path))?;
    let mut reader = BufReader::new(file);
    let is_gzip = reader.fill_buf().map_err(|e| TelescopeError::from(e).with_path(path))?.starts_with(&GZIP_MAGIC);
    if is_gzip {
        log::debug!("Inflating gzip input {}", path.display());
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Guess the format from the first line of `bytes`.
///
/// An empty input is treated as an empty [Format::Themisto] file.
///
/// Returns None if the format is not recognized.
///
pub fn guess_format(
    bytes: &[u8],
) -> Option<Format> {
    let first_line = match bytes.find_byte(b'\n') {
        Some(linebreak) => &bytes[0..linebreak],
        None => bytes,
    };
    let first_line = first_line.trim_end_with(|c| c == '\r');

    if first_line.contains(&b',') {
        let mut records = first_line.split_str(",");
        let n_reads = records.next()?;
        let n_targets = records.next()?;
        let compact = records.next().is_none()
            && !n_reads.is_empty() && n_reads.iter().all(u8::is_ascii_digit)
            && !n_targets.is_empty() && n_targets.iter().all(u8::is_ascii_digit);
        return if compact { Some(Format::Compact) } else { None }
    }

    let themisto = first_line.fields().all(|field| field.iter().all(u8::is_ascii_digit));
    if themisto {
        return Some(Format::Themisto)
    }

    None
}

/// Peek at the buffered contents of `conn` and guess their format.
pub fn detect_format<R: BufRead>(
    conn: &mut R,
) -> Result<Format, TelescopeError> {
    let bytes = conn.fill_buf()?;
    guess_format(bytes).ok_or_else(|| TelescopeError::Config("unrecognized input format".to_string()))
}

/// Read all records from `conn` into `matrix`
///
/// Rows are addressed by read id. The number of targets is taken from
/// `matrix`. If `format` is None it is guessed from the first line.
///
/// Returns the number of reads processed.
///
pub fn read_alignment_into<R: BufRead>(
    conn: &mut R,
    format: Option<Format>,
    matrix: &mut BitMatrix,
) -> Result<u64, TelescopeError> {
    let format = match format {
        Some(format) => format,
        None => detect_format(conn)?,
    };
    log::debug!("Reading input in {:?} format", format);
    match format {
        Format::Themisto => read_themisto_file(conn, matrix),
        Format::Compact => read_compact(conn, matrix),
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn guess_format_themisto() {
        use super::Format;
        use super::guess_format;

        let data: Vec<u8> = b"202678 1\n202728\n651964 0 1\n651966 0 1\n1166624 0\n1166625 0\n1166626 1".to_vec();
        let got = guess_format(&data).unwrap();
        let expected = Format::Themisto;

        assert_eq!(got, expected);
    }

    #[test]
    fn guess_format_compact() {
        use super::Format;
        use super::guess_format;

        let mut data: Vec<u8> = b"1166627,2\n".to_vec();
        data.append(&mut vec![12, b'\n', 0x1f, 0x8b, 0, 0]);

        let got = guess_format(&data).unwrap();
        let expected = Format::Compact;

        assert_eq!(got, expected);
    }

    #[test]
    fn guess_format_empty_input() {
        use super::Format;
        use super::guess_format;

        let got = guess_format(b"").unwrap();
        let expected = Format::Themisto;

        assert_eq!(got, expected);
    }

    #[test]
    fn guess_format_unrecognized() {
        use super::guess_format;

        assert!(guess_format(b"ERR4035126.4996\t0\n").is_none());
        assert!(guess_format(b"10,2,3\n").is_none());
        assert!(guess_format(b"query_name,chr.fasta\n").is_none());
    }

    #[test]
    fn format_from_str() {
        use super::Format;

        assert_eq!("themisto".parse::<Format>().unwrap(), Format::Themisto);
        assert_eq!("compact".parse::<Format>().unwrap(), Format::Compact);
        assert!("fulgor".parse::<Format>().is_err());
    }

    #[test]
    fn read_alignment_into_guesses_format() {
        use super::read_alignment_into;
        use crate::bitmatrix::BitMatrix;
        use std::io::Cursor;

        let data: Vec<u8> = b"0 1\n1\n2 0 1\n".to_vec();
        let mut matrix = BitMatrix::new(2);

        let mut input: Cursor<Vec<u8>> = Cursor::new(data);
        let got = read_alignment_into(&mut input, None, &mut matrix).unwrap();

        assert_eq!(got, 3);
        assert_eq!(matrix.row_ones(0), vec![1]);
        assert!(!matrix.any_in_row(1));
        assert_eq!(matrix.row_ones(2), vec![0, 1]);
    }

    #[test]
    fn open_input_inflates_gzip() {
        use super::open_input;
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Read;
        use std::io::Write;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reads.aln.gz");

        let file = std::fs::File::create(&path).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(b"0 1\n1 0\n").unwrap();
        encoder.finish().unwrap();

        let mut got: String = String::new();
        open_input(&path).unwrap().read_to_string(&mut got).unwrap();

        assert_eq!(got, "0 1\n1 0\n");
    }

    #[test]
    fn open_input_reports_path() {
        use super::open_input;

        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.aln");

        let got = open_input(&path).err().unwrap().to_string();

        assert!(got.contains("missing.aln"));
    }
}
