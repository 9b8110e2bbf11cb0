#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write file");
    path
}

fn read_lines(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .expect("read output")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("json report")
}

const MATRIX: &str = "\
,USA_MANUFACTURING,CHN_SERVICES
USA_MANUFACTURING,0.5,5000000
CHN_SERVICES,12,TOTAL
";

#[test]
fn load_writes_operations_and_reports_json() {
    let dir = TempDir::new().expect("tempdir");
    let csv = write_file(&dir, "io.csv", MATRIX);
    let config = write_file(&dir, "config.toml", "");
    let out = dir.path().join("ops.jsonl");

    let output = cargo_bin_cmd!("graphbulk")
        .arg("--config")
        .arg(&config)
        .args(["--format", "json", "load", "--csv"])
        .arg(&csv)
        .arg("--out")
        .arg(&out)
        .args(["--database", "iodb", "--container", "flows"])
        .assert()
        .success()
        .get_output()
        .clone();

    let report = stdout_json(&output);
    assert_eq!(report["vertices_written"], 2);
    assert_eq!(report["edges_written"], 2);
    assert_eq!(report["skipped_cells"], 1);
    assert_eq!(report["flushes"], 2);

    let lines = read_lines(&out);
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|line| line["op"] == "UPSERT"));
    assert!(lines
        .iter()
        .all(|line| line["destination"]["database"] == "iodb"
            && line["destination"]["container"] == "flows"));
    let edges: Vec<&Value> = lines
        .iter()
        .filter(|line| line["document"]["_isEdge"] == true)
        .collect();
    assert_eq!(edges.len(), 2);
    assert!(edges
        .iter()
        .any(|edge| edge["document"]["_vertexId"] == "USA_MANUFACTURING"
            && edge["document"]["_sink"] == "CHN_SERVICES"
            && edge["document"]["value"] == 5_000_000.0
            && edge["partitionKey"] == "USA_MANUFACTURING"));
}

#[test]
fn load_reads_tunables_from_the_config_file() {
    let dir = TempDir::new().expect("tempdir");
    let csv = write_file(&dir, "io.csv", MATRIX);
    let config = write_file(
        &dir,
        "config.toml",
        concat!(
            "[destination]\ndatabase = \"fromfile\"\n\n",
            "[ingest]\nmin_value = 100.0\nmode = \"create\"\n",
        ),
    );
    let out = dir.path().join("ops.jsonl");

    let output = cargo_bin_cmd!("graphbulk")
        .env("GRAPHBULK_CONFIG", &config)
        .args(["--format", "json", "load", "--csv"])
        .arg(&csv)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .get_output()
        .clone();

    // 12 is now below the threshold; only the 5000000 flow remains.
    assert_eq!(stdout_json(&output)["edges_written"], 1);
    let lines = read_lines(&out);
    assert!(lines.iter().all(|line| line["op"] == "CREATE"));
    assert!(lines
        .iter()
        .all(|line| line["destination"]["database"] == "fromfile"
            && line["destination"]["container"] == "graph"));
}

#[test]
fn load_prints_a_text_summary_by_default() {
    let dir = TempDir::new().expect("tempdir");
    let csv = write_file(&dir, "io.csv", MATRIX);
    let config = write_file(&dir, "config.toml", "");
    let out = dir.path().join("ops.jsonl");

    let output = cargo_bin_cmd!("graphbulk")
        .arg("--config")
        .arg(&config)
        .args(["--color", "never", "load", "--csv"])
        .arg(&csv)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("Results"), "{stdout}");
    assert!(stdout.contains("edges: 2"), "{stdout}");
    assert!(stdout.contains("load finished"), "{stdout}");
}

#[test]
fn an_explicit_config_that_does_not_exist_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    let csv = write_file(&dir, "io.csv", MATRIX);

    let output = cargo_bin_cmd!("graphbulk")
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["load", "--csv"])
        .arg(&csv)
        .arg("--out")
        .arg(dir.path().join("ops.jsonl"))
        .assert()
        .failure()
        .get_output()
        .clone();

    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("does not exist"), "{stderr}");
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let csv = write_file(&dir, "io.csv", MATRIX);
    let config = write_file(&dir, "config.toml", "[ingest]\nbatch = 5\n");

    cargo_bin_cmd!("graphbulk")
        .arg("--config")
        .arg(&config)
        .args(["load", "--csv"])
        .arg(&csv)
        .arg("--out")
        .arg(dir.path().join("ops.jsonl"))
        .assert()
        .failure();
}

#[test]
fn generate_rejects_a_zero_batch_size() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_file(&dir, "config.toml", "");

    let output = cargo_bin_cmd!("graphbulk")
        .arg("--config")
        .arg(&config)
        .args(["generate", "--vertices", "4", "--batch-size", "0"])
        .arg("--out")
        .arg(dir.path().join("ops.jsonl"))
        .assert()
        .failure()
        .get_output()
        .clone();

    let stderr = String::from_utf8(output.stderr).expect("utf8");
    assert!(stderr.contains("batch size must be at least 1"), "{stderr}");
}

#[test]
fn generate_is_reproducible_with_a_seed() {
    let dir = TempDir::new().expect("tempdir");
    let config = write_file(&dir, "config.toml", "");
    let run = |name: &str| {
        let out = dir.path().join(name);
        let output = cargo_bin_cmd!("graphbulk")
            .arg("--config")
            .arg(&config)
            .args([
                "--format",
                "json",
                "generate",
                "--vertices",
                "20",
                "--factor",
                "2",
                "--seed",
                "7",
                "--batch-size",
                "8",
            ])
            .arg("--out")
            .arg(&out)
            .assert()
            .success()
            .get_output()
            .clone();
        (stdout_json(&output), read_lines(&out))
    };

    let (report, lines) = run("a.jsonl");
    let (_, again) = run("b.jsonl");

    assert_eq!(report["vertices_written"], 20);
    let edges = report["edges_written"].as_u64().expect("count");
    assert!((20..=40).contains(&edges), "{edges}");
    assert_eq!(report["failures"], 0);
    assert_eq!(lines.len() as u64, 20 + edges);

    // Vertex documents match exactly; edge ids are random per run.
    let vertices = |lines: &[Value]| -> Vec<Value> {
        lines
            .iter()
            .filter(|line| line["document"]["_isEdge"] != true)
            .cloned()
            .collect()
    };
    assert_eq!(vertices(&lines), vertices(&again));
}
