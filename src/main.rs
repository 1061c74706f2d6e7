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
use std::ffi::OsString;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Parser;

use telescope::compressor::compress;
use telescope::group::ReferenceGroups;
use telescope::merge::read_paired_alignments;
use telescope::parser::open_input;
use telescope::printer::create_output;
use telescope::printer::run_info::{write_run_info, Provenance, RunInfo};
use telescope::{CompressOptions, Format, Mode, TelescopeError};

mod cli;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
    .module(module_path!())
    .quiet(false)
    .verbosity(log_max_level)
    .timestamp(stderrlog::Timestamp::Off)
    .init()
    .unwrap();
}

fn resolve_targets(
    targets: &cli::Targets,
) -> Result<u32, TelescopeError> {
    let n_targets = match (targets.n_refs, &targets.target_list) {
        (Some(n_refs), _) => n_refs,
        (None, Some(path)) => telescope::count_targets(path)?,
        (None, None) => return Err(TelescopeError::Config("either --n-refs or --targets is required".to_string())),
    };
    if n_targets == 0 {
        return Err(TelescopeError::Config("number of targets must be positive".to_string()))
    }
    log::info!("Using {} targets", n_targets);
    Ok(n_targets)
}

// Directory that files named by `prefix` are written to
fn check_output_dir(
    prefix: &Path,
) -> Result<(), TelescopeError> {
    let dir = match prefix.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let metadata = std::fs::metadata(&dir).map_err(|_| {
        TelescopeError::Config(format!("output directory {} does not exist", dir.display()))
    })?;
    if !metadata.is_dir() {
        return Err(TelescopeError::Config(format!("{} is not a directory", dir.display())))
    }
    if metadata.permissions().readonly() {
        return Err(TelescopeError::Config(format!("output directory {} is not writable", dir.display())))
    }
    Ok(())
}

fn with_suffix(
    prefix: &Path,
    suffix: &str,
) -> PathBuf {
    let mut path: OsString = prefix.as_os_str().to_os_string();
    path.push(suffix);
    PathBuf::from(path)
}

fn open_inputs(
    input_files: &[PathBuf],
) -> Result<Vec<Box<dyn BufRead>>, TelescopeError> {
    input_files.iter().map(|file| {
        log::info!("Reading {}", file.display());
        open_input(file)
    }).collect()
}

fn parse_format(
    format: &Option<String>,
) -> Result<Option<Format>, TelescopeError> {
    format.as_ref().map(|x| x.parse::<Format>()).transpose()
}

// Contents of an output file rendered in memory
struct Output {
    path: PathBuf,
    bytes: Vec<u8>,
}

fn render<F>(
    path: PathBuf,
    write: F,
) -> Result<Output, TelescopeError>
where F: FnOnce(&mut Vec<u8>) -> Result<(), TelescopeError> {
    let mut bytes: Vec<u8> = Vec::new();
    write(&mut bytes).map_err(|e| e.with_path(&path))?;
    Ok(Output { path, bytes })
}

fn remove_output(
    path: &Path,
) {
    if let Err(e) = std::fs::remove_file(path) {
        log::warn!("Could not remove {}: {}", path.display(), e);
    }
}

fn write_output(
    output: &Output,
) -> Result<(), TelescopeError> {
    let mut conn = create_output(&output.path)?;
    let written = conn.write_all(&output.bytes).and_then(|_| conn.flush());
    if let Err(e) = written {
        drop(conn);
        remove_output(&output.path);
        return Err(TelescopeError::from(e).with_path(&output.path))
    }
    Ok(())
}

// Writes all of `outputs` or removes the ones already written
fn write_outputs(
    outputs: &[Output],
) -> Result<(), TelescopeError> {
    for (idx, output) in outputs.iter().enumerate() {
        if let Err(e) = write_output(output) {
            outputs[..idx].iter().for_each(|written| remove_output(&written.path));
            return Err(e)
        }
    }
    outputs.iter().for_each(|output| log::info!("Wrote {}", output.path.display()));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_convert(
    input_files: &[PathBuf],
    out_prefix: &Path,
    targets: &cli::Targets,
    mode: &str,
    format: &Option<String>,
    read_assignments: bool,
    indent: usize,
    kallisto_version: &str,
    index_version: u32,
) -> Result<(), TelescopeError> {
    let start_time = SystemTime::now().duration_since(UNIX_EPOCH).map(|x| x.as_secs()).unwrap_or(0);

    let mode = mode.parse::<Mode>()?;
    let format = parse_format(format)?;
    check_output_dir(out_prefix)?;
    let n_targets = resolve_targets(targets)?;

    let mut inputs = open_inputs(input_files)?;
    let aln = read_paired_alignments(&mut inputs, format, n_targets, mode)?;

    let opts = CompressOptions { track_reads: read_assignments, keep_patterns: true };
    let classes = compress(&aln, opts, None);

    let provenance = Provenance {
        kallisto_version: kallisto_version.to_string(),
        index_version,
        start_time: start_time.to_string(),
        call: std::env::args().collect::<Vec<String>>().join(" "),
    };
    let info = RunInfo::new(&classes, &provenance);
    log::info!("Pseudoaligned {} of {} reads", info.n_pseudoaligned, info.n_processed);

    let mut outputs: Vec<Output> = vec![
        render(with_suffix(out_prefix, ".ec"), |conn| telescope::printer::kallisto::write_ec(&classes, conn))?,
        render(with_suffix(out_prefix, ".tsv"), |conn| telescope::printer::kallisto::write_tsv(&classes, conn))?,
        render(with_suffix(out_prefix, "_run_info.json"), |conn| write_run_info(&info, indent, conn))?,
    ];
    if read_assignments {
        outputs.push(render(with_suffix(out_prefix, "_read-to-ref.txt"), |conn| telescope::printer::themisto::write_read_assignments(&classes, conn))?);
    }

    write_outputs(&outputs)
}

fn run_group(
    input_files: &[PathBuf],
    out_prefix: &Path,
    group_file: &Path,
    targets: &cli::Targets,
    mode: &str,
    format: &Option<String>,
    threads: usize,
) -> Result<(), TelescopeError> {
    let mode = mode.parse::<Mode>()?;
    let format = parse_format(format)?;
    check_output_dir(out_prefix)?;
    let n_targets = resolve_targets(targets)?;

    let mut group_conn = open_input(group_file)?;
    let groups = ReferenceGroups::from_names(&mut group_conn, n_targets).map_err(|e| e.with_path(group_file))?;

    let mut inputs = open_inputs(input_files)?;
    let aln = read_paired_alignments(&mut inputs, format, n_targets, mode)?;

    let (classes, group_counts) = if threads > 1 {
        rayon::ThreadPoolBuilder::new().num_threads(threads).build_global().map_err(|e| {
            TelescopeError::Config(format!("could not start {} threads: {}", threads, e))
        })?;
        let opts = CompressOptions { track_reads: false, keep_patterns: true };
        let classes = compress(&aln, opts, None);
        let group_counts = classes.group_by(&groups);
        (classes, group_counts)
    } else {
        let opts = CompressOptions { track_reads: false, keep_patterns: false };
        let classes = compress(&aln, opts, Some(&groups));
        let group_counts = classes.group_counts().cloned();
        (classes, group_counts)
    };
    let Some(group_counts) = group_counts else {
        return Err(TelescopeError::Config("group counts were not computed".to_string()))
    };

    let output = render(with_suffix(out_prefix, "_group_counts.tsv"), |conn| {
        telescope::printer::groups::write_group_counts(classes.counts(), &group_counts, groups.names(), conn)
    })?;

    write_outputs(&[output])
}

fn run_pack(
    input_file: &Path,
    out_file: &Path,
    targets: &cli::Targets,
    block_size: usize,
) -> Result<(), TelescopeError> {
    check_output_dir(out_file)?;
    let n_targets = resolve_targets(targets)?;

    log::info!("Reading {}", input_file.display());
    let mut conn_in = open_input(input_file)?;
    let mut packed: Vec<u8> = Vec::new();
    telescope::pack_from_read_to_write(&mut conn_in, n_targets, block_size, &mut packed)?;
    let output = Output { path: out_file.to_path_buf(), bytes: packed };

    write_outputs(&[output])
}

fn main() {
    let cli = cli::Cli::parse();

    // Subcommands:
    let res = match &cli.command {
        // Convert
        Some(cli::Commands::Convert {
            input_files,
            out_prefix,
            targets,
            mode,
            format,
            read_assignments,
            indent,
            kallisto_version,
            index_version,
            verbose,
        }) => {
            init_log(if *verbose { 3 } else { 1 });
            run_convert(input_files, out_prefix, targets, mode, format, *read_assignments, *indent, kallisto_version, *index_version)
        },

        // Group
        Some(cli::Commands::Group {
            input_files,
            out_prefix,
            group_file,
            targets,
            mode,
            format,
            threads,
            verbose,
        }) => {
            init_log(if *verbose { 3 } else { 1 });
            run_group(input_files, out_prefix, group_file, targets, mode, format, *threads)
        },

        // Pack
        Some(cli::Commands::Pack {
            input_file,
            out_file,
            targets,
            block_size,
            verbose,
        }) => {
            init_log(if *verbose { 3 } else { 1 });
            run_pack(input_file, out_file, targets, *block_size)
        },
        None => {
            eprintln!("No subcommand given, see `telescope --help`");
            std::process::exit(1);
        },
    };

    if let Err(e) = res {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
