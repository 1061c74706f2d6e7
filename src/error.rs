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

//! Errors raised while reading, merging, compressing, or writing alignments.

use std::path::PathBuf;

/// Everything that can go wrong in a conversion run.
///
/// None of these are recoverable: the caller is expected to report the
/// message and stop without writing any output.
#[derive(Debug)]
#[non_exhaustive]
pub enum TelescopeError {
    /// Invalid configuration, detected before any input is processed.
    Config(String),
    /// Malformed record in an input file. `line` is 1-based.
    Parse { line: usize, message: String },
    /// A record referenced a target outside `[0, n_targets)`.
    TargetOutOfRange { line: usize, target: u64, n_targets: u32 },
    /// A compact input declared a different number of targets than expected.
    TargetCountMismatch { expected: u32, got: u32 },
    /// A paired input contained a different number of reads than the first input.
    MismatchedPairCount { stream: usize, expected: u64, got: u64 },
    /// Reading or writing failed, with the offending path when known.
    Io { path: Option<PathBuf>, source: std::io::Error },
}

impl TelescopeError {
    /// Attach `path` to an [Io](TelescopeError::Io) error that does not have one yet.
    pub fn with_path<P: Into<PathBuf>>(self, path: P) -> Self {
        match self {
            TelescopeError::Io { path: None, source } => TelescopeError::Io { path: Some(path.into()), source },
            other => other,
        }
    }
}

impl std::fmt::Display for TelescopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TelescopeError::Config(msg) => write!(f, "invalid configuration: {}", msg),
            TelescopeError::Parse { line, message } => write!(f, "parse error on line {}: {}", line, message),
            TelescopeError::TargetOutOfRange { line, target, n_targets } => {
                write!(f, "target index {} on line {} is out of range (number of targets: {})", target, line, n_targets)
            },
            TelescopeError::TargetCountMismatch { expected, got } => {
                write!(f, "input declares {} targets but {} were expected", got, expected)
            },
            TelescopeError::MismatchedPairCount { stream, expected, got } => {
                write!(f, "pseudoalignment files have different numbers of reads: input {} has {} reads, expected {}", stream + 1, got, expected)
            },
            TelescopeError::Io { path: Some(path), source } => write!(f, "{}: {}", path.display(), source),
            TelescopeError::Io { path: None, source } => write!(f, "{}", source),
        }
    }
}

impl std::error::Error for TelescopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TelescopeError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TelescopeError {
    fn from(source: std::io::Error) -> Self {
        TelescopeError::Io { path: None, source }
    }
}
