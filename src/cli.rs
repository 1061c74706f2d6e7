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
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// Number of targets, given directly or read from a file
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct Targets {
    // Number of targets in the index
    #[arg(long = "n-refs")]
    pub n_refs: Option<u32>,

    // File listing the targets or an index directory containing coloring-names.txt
    #[arg(long = "targets")]
    pub target_list: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Compress to kallisto .ec, .tsv, and run_info.json files
    Convert {
        // Input pseudoalignment file(s)
        #[arg(group = "input", required = true, help = "Input file(s)")]
        input_files: Vec<PathBuf>,

        // Output prefix
        #[arg(short = 'o', long = "output", required = true)]
        out_prefix: PathBuf,

        #[command(flatten)]
        targets: Targets,

        // How paired inputs are merged
        #[arg(long = "mode", default_value = "unpaired", help = "unpaired, union, or intersection")]
        mode: String,

        // Input format, guessed if not given
        #[arg(long = "format", help = "themisto or compact")]
        format: Option<String>,

        // Also write <prefix>_read-to-ref.txt
        #[arg(long = "read-assignments", default_value_t = false)]
        read_assignments: bool,

        // Indentation of run_info.json
        #[arg(long = "indent", default_value_t = 4)]
        indent: usize,

        // Version strings written to run_info.json
        #[arg(long = "kallisto-version", default_value = "0.45.0")]
        kallisto_version: String,
        #[arg(long = "index-version", default_value_t = 10)]
        index_version: u32,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Compress and count hits in groups of targets
    Group {
        // Input pseudoalignment file(s)
        #[arg(group = "input", required = true, help = "Input file(s)")]
        input_files: Vec<PathBuf>,

        // Output prefix
        #[arg(short = 'o', long = "output", required = true)]
        out_prefix: PathBuf,

        // Group name of each target, one per line
        #[arg(long = "groups", required = true)]
        group_file: PathBuf,

        #[command(flatten)]
        targets: Targets,

        // How paired inputs are merged
        #[arg(long = "mode", default_value = "unpaired", help = "unpaired, union, or intersection")]
        mode: String,

        // Input format, guessed if not given
        #[arg(long = "format", help = "themisto or compact")]
        format: Option<String>,

        // Threads for counting group hits
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Convert a Themisto file to the compact block format
    Pack {
        // Input file
        #[arg(group = "input", required = true, help = "Input file")]
        input_file: PathBuf,

        // Output file
        #[arg(short = 'o', long = "output", required = true)]
        out_file: PathBuf,

        #[command(flatten)]
        targets: Targets,

        // Reads per chunk
        #[arg(long = "block-size", default_value_t = 65536)]
        block_size: usize,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}
