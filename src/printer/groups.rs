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

use crate::error::TelescopeError;
use crate::group::GroupCounts;

/// Write the class × group count table
///
/// The header is `ec_id\tcount\t<group names>`, followed by one line per
/// class with its read count from `counts` and its group count vector.
///
pub fn write_group_counts<W: Write>(
    counts: &[u64],
    group_counts: &GroupCounts,
    names: &[String],
    conn: &mut W,
) -> Result<(), TelescopeError> {
    assert_eq!(counts.len(), group_counts.n_classes());
    assert_eq!(names.len(), group_counts.n_groups());

    let mut header: String = "ec_id\tcount".to_string();
    names.iter().for_each(|name| {
        header += "\t";
        header += name;
    });
    header += "\n";
    conn.write_all(header.as_bytes())?;

    for (class, count) in counts.iter().enumerate() {
        let mut formatted: String = format!("{}\t{}", class, count);
        group_counts.row(class).iter().for_each(|hits| {
            formatted += "\t";
            formatted += &hits.to_string();
        });
        formatted += "\n";
        conn.write_all(formatted.as_bytes())?;
    }
    conn.flush()?;
    Ok(())
}
