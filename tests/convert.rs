use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn telescope(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_telescope")).args(args).output().unwrap()
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn convert_writes_kallisto_files() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reads.aln");
    fs::write(&input, "0 0 1\n1 0 1\n2 2\n3\n").unwrap();
    let prefix = temp_dir.path().join("out");

    let output = telescope(&["convert", path_str(&input), "-o", path_str(&prefix), "--n-refs", "4", "--read-assignments"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let ec = fs::read_to_string(temp_dir.path().join("out.ec")).unwrap();
    let tsv = fs::read_to_string(temp_dir.path().join("out.tsv")).unwrap();
    let read_to_ref = fs::read_to_string(temp_dir.path().join("out_read-to-ref.txt")).unwrap();
    assert_eq!(ec, "0\t0,1\n1\t2\n");
    assert_eq!(tsv, "0\t2\n1\t1\n");
    assert_eq!(read_to_ref, "0 0 1\n1 0 1\n2 2\n");

    let run_info: serde_json::Value = serde_json::from_str(&fs::read_to_string(temp_dir.path().join("out_run_info.json")).unwrap()).unwrap();
    assert_eq!(run_info["n_targets"], 4);
    assert_eq!(run_info["n_processed"], 4);
    assert_eq!(run_info["n_pseudoaligned"], 3);
    assert_eq!(run_info["n_unique"], 1);
    assert_eq!(run_info["p_pseudoaligned"], 75.0);
    assert_eq!(run_info["kallisto_version"], "0.45.0");
    assert_eq!(run_info["index_version"], 10);
}

#[test]
fn convert_counts_targets_from_index_directory() {
    let temp_dir = TempDir::new().unwrap();
    let index = temp_dir.path().join("index");
    fs::create_dir(&index).unwrap();
    fs::write(index.join("coloring-names.txt"), "a.fasta\nb.fasta\nc.fasta\n").unwrap();

    let fwd = temp_dir.path().join("reads_1.aln");
    let rev = temp_dir.path().join("reads_2.aln");
    fs::write(&fwd, "0 0 2\n1 1\n").unwrap();
    fs::write(&rev, "0 0 1\n1 1\n").unwrap();
    let prefix = temp_dir.path().join("paired");

    let output = telescope(&["convert", path_str(&fwd), path_str(&rev), "-o", path_str(&prefix), "--targets", path_str(&index), "--mode", "intersection"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let ec = fs::read_to_string(temp_dir.path().join("paired.ec")).unwrap();
    assert_eq!(ec, "0\t0\n1\t1\n");
    assert!(!temp_dir.path().join("paired_read-to-ref.txt").exists());
}

#[test]
fn mismatched_pairs_write_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let fwd = temp_dir.path().join("reads_1.aln");
    let rev = temp_dir.path().join("reads_2.aln");
    fs::write(&fwd, "0 0\n1 1\n2 1\n").unwrap();
    fs::write(&rev, "0 0\n1 1\n").unwrap();
    let prefix = temp_dir.path().join("out");

    let output = telescope(&["convert", path_str(&fwd), path_str(&rev), "-o", path_str(&prefix), "--n-refs", "2", "--mode", "union"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("different numbers of reads"));
    let n_files = fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(n_files, 2);
}

#[test]
fn failed_write_removes_earlier_outputs() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reads.aln");
    fs::write(&input, "0 0 1\n1 2\n").unwrap();
    fs::create_dir(temp_dir.path().join("out_run_info.json")).unwrap();
    let prefix = temp_dir.path().join("out");

    let output = telescope(&["convert", path_str(&input), "-o", path_str(&prefix), "--n-refs", "3"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!temp_dir.path().join("out.ec").exists());
    assert!(!temp_dir.path().join("out.tsv").exists());
}

#[test]
fn verbose_shows_debug_lines() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reads.aln");
    fs::write(&input, "1 0\n0 1\n").unwrap();
    let prefix = temp_dir.path().join("out");

    let output = telescope(&["convert", path_str(&input), "-o", path_str(&prefix), "--n-refs", "2", "--verbose"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    assert!(String::from_utf8_lossy(&output.stderr).contains("Read ids are not sorted"));
}

#[test]
fn missing_output_directory_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reads.aln");
    fs::write(&input, "0 0\n").unwrap();
    let prefix = temp_dir.path().join("missing").join("out");

    let output = telescope(&["convert", path_str(&input), "-o", path_str(&prefix), "--n-refs", "1"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!temp_dir.path().join("missing").exists());
}

#[test]
fn out_of_range_target_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reads.aln");
    fs::write(&input, "0 0\n1 5\n").unwrap();
    let prefix = temp_dir.path().join("out");

    let output = telescope(&["convert", path_str(&input), "-o", path_str(&prefix), "--n-refs", "2"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(!temp_dir.path().join("out.ec").exists());
}

#[test]
fn group_writes_count_table() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reads.aln");
    fs::write(&input, "0 0 2\n1 0 1\n2 0 2\n3\n").unwrap();
    let groups = temp_dir.path().join("groups.txt");
    fs::write(&groups, "chr\nchr\nplasmid\nplasmid\n").unwrap();
    let expected = "ec_id\tcount\tchr\tplasmid\n0\t2\t1\t1\n1\t1\t2\t0\n";

    for threads in ["1", "2"] {
        let prefix = temp_dir.path().join(format!("threads_{}", threads));
        let output = telescope(&["group", path_str(&input), "-o", path_str(&prefix), "--groups", path_str(&groups), "--n-refs", "4", "--threads", threads]);
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let got = fs::read_to_string(temp_dir.path().join(format!("threads_{}_group_counts.tsv", threads))).unwrap();
        assert_eq!(got, expected);
    }
}

#[test]
fn packed_input_converts_like_plain_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reads.aln");
    fs::write(&input, "0 3\n1 1 2\n2 3\n3\n4 0\n5 1 2\n").unwrap();
    let packed = temp_dir.path().join("reads.compact");

    let output = telescope(&["pack", path_str(&input), "-o", path_str(&packed), "--n-refs", "4", "--block-size", "2"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let plain_prefix = temp_dir.path().join("plain");
    let compact_prefix = temp_dir.path().join("compact");
    let output = telescope(&["convert", path_str(&input), "-o", path_str(&plain_prefix), "--n-refs", "4"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let output = telescope(&["convert", path_str(&packed), "-o", path_str(&compact_prefix), "--n-refs", "4", "--format", "compact"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    for suffix in [".ec", ".tsv"] {
        let plain = fs::read_to_string(temp_dir.path().join(format!("plain{}", suffix))).unwrap();
        let compact = fs::read_to_string(temp_dir.path().join(format!("compact{}", suffix))).unwrap();
        assert_eq!(plain, compact);
    }
}

#[test]
fn library_round_trip_through_files() {
    use telescope::parser::kallisto::read_kallisto;
    use telescope::printer::create_output;
    use telescope::printer::kallisto::{write_ec, write_tsv};
    use telescope::{compress_from_read, CompressOptions, Mode};
    use std::io::{BufReader, Cursor, Write};

    let temp_dir = TempDir::new().unwrap();
    let mut inputs = vec![Cursor::new(b"0 3\n1 1 2\n2 3\n3\n4 0\n5 1 2\n".to_vec())];
    let expected = compress_from_read(&mut inputs, None, 4, Mode::Unpaired, CompressOptions::default(), None).unwrap();

    let ec_path = temp_dir.path().join("out.ec");
    let tsv_path = temp_dir.path().join("out.tsv");
    let mut ec = create_output(&ec_path).unwrap();
    write_ec(&expected, &mut ec).unwrap();
    ec.flush().unwrap();
    let mut tsv = create_output(&tsv_path).unwrap();
    write_tsv(&expected, &mut tsv).unwrap();
    tsv.flush().unwrap();

    let mut ec_in = BufReader::new(fs::File::open(&ec_path).unwrap());
    let mut tsv_in = BufReader::new(fs::File::open(&tsv_path).unwrap());
    let got = read_kallisto(4, &mut ec_in, &mut tsv_in).unwrap();

    assert_eq!(got.counts(), expected.counts());
    assert_eq!(got.patterns(), expected.patterns());
}
