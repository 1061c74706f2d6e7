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

//! Reader for the compact block format.
//!
//! The file starts with a header line `<n_reads>,<n_targets>`. The rest of
//! the file is a sequence of chunks, each a decimal byte length on its own
//! line followed by that many bytes. A chunk is a serialized
//! [RoaringTreemap] over the flattened positions `read * n_targets +
//! target`, optionally gzip-compressed. Chunks are OR'd together.
//!

use std::io::BufRead;
use std::io::Read;
use std::io::Write;

use bstr::ByteSlice;
use flate2::write::GzDecoder;
use roaring::treemap::RoaringTreemap;

use crate::bitmatrix::BitMatrix;
use crate::error::TelescopeError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn inflate_bytes(
    deflated: &[u8],
) -> Result<Vec<u8>, std::io::Error> {
    let mut inflated: Vec<u8> = Vec::new();
    let mut decoder = GzDecoder::new(&mut inflated);
    decoder.write_all(deflated)?;
    decoder.finish()?;
    Ok(inflated)
}

/// Decode one chunk into a [RoaringTreemap].
pub fn deserialize_chunk(
    bytes: &[u8],
) -> Result<RoaringTreemap, std::io::Error> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let inflated = inflate_bytes(bytes)?;
        RoaringTreemap::deserialize_from(inflated.as_slice())
    } else {
        RoaringTreemap::deserialize_from(bytes)
    }
}

/// Parse the `<n_reads>,<n_targets>` header line.
pub fn read_header(
    bytes: &[u8],
) -> Result<(u64, u32), TelescopeError> {
    let malformed = || TelescopeError::Parse { line: 1, message: format!("malformed header '{}'", bytes.trim().as_bstr()) };

    let mut records = bytes.trim().split_str(",");
    let n_reads = records.next().and_then(|x| x.to_str().ok()).and_then(|x| x.parse::<u64>().ok()).ok_or_else(malformed)?;
    let n_targets = records.next().and_then(|x| x.to_str().ok()).and_then(|x| x.parse::<u32>().ok()).ok_or_else(malformed)?;
    if records.next().is_some() {
        return Err(malformed())
    }
    // Read ids are 32-bit
    if n_reads > u32::MAX as u64 + 1 {
        return Err(TelescopeError::Parse { line: 1, message: format!("{} reads does not fit in 32-bit read ids", n_reads) })
    }

    Ok((n_reads, n_targets))
}

/// Read a compact file into `matrix`
///
/// Fails with [TelescopeError::TargetCountMismatch] if the header declares a
/// different number of targets than `matrix` has columns.
///
/// Returns the number of reads declared in the header.
///
pub fn read_compact<R: BufRead>(
    conn: &mut R,
    matrix: &mut BitMatrix,
) -> Result<u64, TelescopeError> {
    let n_targets = matrix.n_cols();

    let mut buf: Vec<u8> = Vec::new();
    conn.read_until(b'\n', &mut buf)?;
    let (n_reads, declared_targets) = read_header(&buf)?;
    if declared_targets != n_targets {
        return Err(TelescopeError::TargetCountMismatch { expected: n_targets, got: declared_targets })
    }

    let mut line: usize = 1;
    let mut n_chunks: usize = 0;
    loop {
        buf.clear();
        if conn.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line += 1;
        if buf.trim().is_empty() {
            continue;
        }

        let len = buf.trim().to_str().ok().and_then(|x| x.parse::<usize>().ok()).ok_or_else(|| {
            TelescopeError::Parse { line, message: format!("malformed chunk length '{}'", buf.trim().as_bstr()) }
        })?;

        // Length is untrusted, grow the buffer only as bytes arrive
        let mut chunk: Vec<u8> = Vec::new();
        conn.by_ref().take(len as u64).read_to_end(&mut chunk)?;
        if chunk.len() != len {
            return Err(TelescopeError::Parse { line, message: format!("chunk is shorter than {} bytes", len) })
        }

        let bits = deserialize_chunk(&chunk).map_err(|e| {
            TelescopeError::Parse { line, message: format!("invalid chunk: {}", e) }
        })?;

        for pos in bits.iter() {
            let read = pos / n_targets as u64;
            if read >= n_reads {
                return Err(TelescopeError::Parse { line, message: format!("read {} is past the declared {} reads", read, n_reads) })
            }
            matrix.set(read as usize, (pos % n_targets as u64) as u32);
        }
        n_chunks += 1;
    }
    log::debug!("Read {} chunks with {} reads", n_chunks, n_reads);
    matrix.resize_to(n_reads as usize, n_targets);

    Ok(n_reads)
}
