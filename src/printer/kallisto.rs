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
use std::io::Write;

use crate::compressor::EquivalenceClasses;
use crate::error::TelescopeError;

/// Format a single equivalence class in Kallisto `.ec` format
///
/// Writes `<class>\t<target>,<target>,...` to `conn`. `ones` must be sorted.
///
pub fn format_ec_line<W: Write>(
    class: usize,
    ones: &[u32],
    conn: &mut W,
) -> Result<(), TelescopeError> {
    let mut formatted: String = class.to_string();
    formatted += "\t";
    ones.iter().enumerate().for_each(|(idx, target)| {
        if idx > 0 {
            formatted += ",";
        }
        formatted += &target.to_string();
    });
    formatted += "\n";

    conn.write_all(formatted.as_bytes())?;
    Ok(())
}

/// Write the `.ec` file listing the targets of each class
///
/// Fails if `classes` was compressed without keeping the patterns.
///
pub fn write_ec<W: Write>(
    classes: &EquivalenceClasses,
    conn: &mut W,
) -> Result<(), TelescopeError> {
    let Some(patterns) = classes.patterns() else {
        return Err(TelescopeError::Config("equivalence class patterns were not kept".to_string()))
    };
    for class in 0..classes.n_classes() {
        format_ec_line(class, &patterns.row_ones(class), conn)?;
    }
    conn.flush()?;
    Ok(())
}

/// Write the `.tsv` file with the number of reads in each class
pub fn write_tsv<W: Write>(
    classes: &EquivalenceClasses,
    conn: &mut W,
) -> Result<(), TelescopeError> {
    for (class, count) in classes.counts().iter().enumerate() {
        conn.write_all(format!("{}\t{}\n", class, count).as_bytes())?;
    }
    conn.flush()?;
    Ok(())
}
