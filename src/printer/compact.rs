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

//! Writer for the compact block format read by [crate::parser::compact].

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use roaring::treemap::RoaringTreemap;

use crate::bitmatrix::BitMatrix;
use crate::error::TelescopeError;

/// Default number of reads per chunk.
pub const DEFAULT_BLOCK_SIZE: usize = 65536;

fn deflate_bytes(
    bytes: &[u8],
) -> Result<Vec<u8>, std::io::Error> {
    let mut deflated: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut encoder = GzEncoder::new(&mut deflated, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(deflated)
}

/// Serialize and gzip one chunk.
pub fn serialize_chunk(
    bits: &RoaringTreemap,
) -> Result<Vec<u8>, std::io::Error> {
    let mut bytes: Vec<u8> = Vec::new();
    bits.serialize_into(&mut bytes)?;
    deflate_bytes(&bytes)
}

fn write_chunk<W: Write>(
    bits: &RoaringTreemap,
    conn: &mut W,
) -> Result<(), TelescopeError> {
    let bytes = serialize_chunk(bits)?;
    conn.write_all(format!("{}\n", bytes.len()).as_bytes())?;
    conn.write_all(&bytes)?;
    Ok(())
}

/// Write `matrix` in the compact block format
///
/// The header declares `n_reads` reads, or the number of rows in `matrix`
/// if that is larger. Each chunk holds the hits of at most `block_size`
/// consecutive reads. Reads without hits take no space.
///
pub fn write_compact<W: Write>(
    matrix: &BitMatrix,
    n_reads: u64,
    block_size: usize,
    conn: &mut W,
) -> Result<(), TelescopeError> {
    if block_size == 0 {
        return Err(TelescopeError::Config("block size must be positive".to_string()))
    }
    let n_targets = matrix.n_cols() as u64;
    let n_reads = n_reads.max(matrix.n_rows() as u64);
    conn.write_all(format!("{},{}\n", n_reads, n_targets).as_bytes())?;

    let mut n_chunks: usize = 0;
    let mut block: Option<usize> = None;
    let mut bits = RoaringTreemap::new();
    for (row, ones) in matrix.non_empty_rows() {
        let row_block = row / block_size;
        if block.is_some_and(|current| current != row_block) {
            write_chunk(&bits, conn)?;
            n_chunks += 1;
            bits = RoaringTreemap::new();
        }
        block = Some(row_block);
        ones.iter().for_each(|target| {
            bits.insert(row as u64 * n_targets + *target as u64);
        });
    }
    if !bits.is_empty() {
        write_chunk(&bits, conn)?;
        n_chunks += 1;
    }
    log::debug!("Wrote {} reads in {} chunks", n_reads, n_chunks);

    conn.flush()?;
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn write_compact_splits_blocks() {
        use super::write_compact;
        use crate::bitmatrix::BitMatrix;
        use std::io::BufRead;
        use std::io::Cursor;
        use std::io::Read;

        let mut matrix = BitMatrix::new(3);
        matrix.set(0, 1);
        matrix.set(1, 0);
        matrix.set(4, 2);
        matrix.resize_to(6, 3);

        let mut got: Vec<u8> = Vec::new();
        write_compact(&matrix, 6, 2, &mut got).unwrap();

        let mut input = Cursor::new(got);
        let mut line: String = String::new();
        input.read_line(&mut line).unwrap();
        assert_eq!(line, "6,3\n");

        // Rows 0-1 and row 4 are in different blocks, block 1 is empty
        let mut n_chunks = 0;
        loop {
            line.clear();
            if input.read_line(&mut line).unwrap() == 0 {
                break;
            }
            let len = line.trim().parse::<usize>().unwrap();
            let mut chunk: Vec<u8> = vec![0; len];
            input.read_exact(&mut chunk).unwrap();
            n_chunks += 1;
        }
        assert_eq!(n_chunks, 2);
    }

    #[test]
    fn written_matrix_reads_back() {
        use super::write_compact;
        use crate::bitmatrix::BitMatrix;
        use crate::parser::compact::read_compact;
        use std::io::Cursor;

        let mut expected = BitMatrix::new(70);
        expected.set(0, 69);
        expected.set(3, 0);
        expected.set(3, 64);
        expected.set(1000, 5);
        expected.resize_to(1002, 70);

        let mut bytes: Vec<u8> = Vec::new();
        write_compact(&expected, 1002, 16, &mut bytes).unwrap();

        let mut got = BitMatrix::new(70);
        let n_reads = read_compact(&mut Cursor::new(bytes), &mut got).unwrap();

        assert_eq!(n_reads, 1002);
        let got_rows: Vec<(usize, Vec<u32>)> = got.non_empty_rows().collect();
        let expected_rows: Vec<(usize, Vec<u32>)> = expected.non_empty_rows().collect();
        assert_eq!(got_rows, expected_rows);
        assert_eq!(got.n_rows(), expected.n_rows());
    }

    #[test]
    fn write_compact_empty_matrix() {
        use super::write_compact;
        use crate::bitmatrix::BitMatrix;

        let matrix = BitMatrix::with_rows(4, 2);

        let mut got: Vec<u8> = Vec::new();
        write_compact(&matrix, 4, 10, &mut got).unwrap();

        assert_eq!(got, b"4,2\n".to_vec());
    }
}
