#![allow(missing_docs)]

use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;

use graphbulk::model::{COUNTRY_SECTOR_LABEL, SUPPLY_LABEL};
use graphbulk::{
    BulkSink, Destination, GraphDocument, IngestConfig, IngestError, IngestReport, MemorySink,
    OperationOutcome, PropertyValue, SinkError, StreamingIngestion, WriteMode, WriteOperation,
};
use tempfile::TempDir;

fn write_matrix(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write matrix");
    path
}

/// `rows` suppliers by `columns` consumers, every cell above the default threshold.
fn dense_matrix(rows: usize, columns: usize) -> String {
    let mut csv = String::from("sector");
    for c in 0..columns {
        write!(csv, ",COL_{c}").expect("format");
    }
    csv.push('\n');
    for r in 0..rows {
        write!(csv, "ROW_{r}").expect("format");
        for _ in 0..columns {
            csv.push_str(",2.5");
        }
        csv.push('\n');
    }
    csv
}

#[test]
fn single_cell_matrix_becomes_two_vertices_and_one_edge() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_matrix(&dir, "io.csv", ",CHN_SERVICES\nUSA_MANUFACTURING,5000000\n");

    let mut config = IngestConfig::new(&path);
    config.destination = Destination::new("iodb", "flows");
    let mut pipeline = StreamingIngestion::new(config, MemorySink::new());
    let report = pipeline.run().expect("ingest");
    let sink = pipeline.into_sink();

    assert_eq!(report.vertices_written, 2);
    assert_eq!(report.edges_written, 1);
    assert_eq!(report.flushes, 2);
    assert_eq!(report.skipped_total(), 0);
    assert!(report.failures.is_empty());
    assert_eq!(sink.batch_sizes(), &[2, 1]);
    assert!(sink
        .destinations()
        .iter()
        .all(|d| d == &Destination::new("iodb", "flows")));

    let usa = sink
        .get(Some("USA_MANUFACTURING"), "USA_MANUFACTURING")
        .expect("supplier vertex");
    let GraphDocument::Vertex(usa) = usa else {
        panic!("expected a vertex");
    };
    assert_eq!(usa.label, COUNTRY_SECTOR_LABEL);
    assert_eq!(usa.properties["country"], PropertyValue::from("USA"));
    assert_eq!(usa.properties["sector"].as_str(), Some("MANUFACTURING"));

    let edge = sink
        .documents()
        .find_map(|doc| match doc {
            GraphDocument::Edge(edge) => Some(edge),
            GraphDocument::Vertex(_) => None,
        })
        .expect("supply edge");
    assert_eq!(edge.label, SUPPLY_LABEL);
    assert_eq!(edge.source.id, "USA_MANUFACTURING");
    assert_eq!(edge.destination.id, "CHN_SERVICES");
    assert_eq!(edge.properties["value"].as_f64(), Some(5_000_000.0));
    assert_eq!(
        edge.partition_key.as_ref().map(|pk| pk.value.as_str()),
        Some("USA_MANUFACTURING")
    );
}

#[test]
fn values_at_or_below_the_threshold_are_dropped_silently() {
    let csv = "\
,A_X,B_Y
A_X,1.0,1.5
B_Y,0,-4
";
    let mut pipeline = StreamingIngestion::new(IngestConfig::new("in-memory"), MemorySink::new());
    let report = pipeline
        .run_source(Cursor::new(csv.as_bytes()))
        .expect("ingest");

    assert_eq!(report.edges_written, 1);
    assert_eq!(report.skipped_cells, 0);

    let mut config = IngestConfig::new("in-memory");
    config.min_value = -10.0;
    let mut pipeline = StreamingIngestion::new(config, MemorySink::new());
    let report = pipeline
        .run_source(Cursor::new(csv.as_bytes()))
        .expect("ingest");
    assert_eq!(report.edges_written, 4);
}

#[test]
fn undecodable_cells_are_skipped_and_counted() {
    let csv: &[u8] = b",A_X,B_Y\nA_X,5,\xff\xfe\nB_Y,7,8\n";
    let mut pipeline = StreamingIngestion::new(IngestConfig::new("bytes"), MemorySink::new());
    let report = pipeline.run_source(Cursor::new(csv)).expect("ingest");

    assert_eq!(report.vertices_written, 2);
    assert_eq!(report.edges_written, 3);
    assert_eq!(report.skipped_cells, 1);
}

#[test]
fn undecodable_row_heads_and_header_cells_are_skipped() {
    let csv: &[u8] = b",A_X,\xffB_Y\nA_X,5,6\n\xfeC_Z,7,8\n";
    let mut pipeline = StreamingIngestion::new(IngestConfig::new("bytes"), MemorySink::new());
    let report = pipeline.run_source(Cursor::new(csv)).expect("ingest");

    assert_eq!(report.skipped_columns, 1);
    assert_eq!(report.skipped_rows, 1);
    assert_eq!(report.vertices_written, 1);
    // Only A_X -> A_X survives.
    assert_eq!(report.edges_written, 1);
}

#[derive(Default)]
struct RecordingSink {
    batches: Vec<(usize, usize)>,
    in_flight: bool,
}

impl BulkSink for RecordingSink {
    fn flush(
        &mut self,
        _destination: &Destination,
        batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError> {
        assert!(!self.in_flight, "flushes overlapped");
        self.in_flight = true;
        let edges = batch.iter().filter(|op| op.document.is_edge()).count();
        self.batches.push((batch.len(), edges));
        self.in_flight = false;
        Ok(vec![OperationOutcome::Success { status: 201 }; batch.len()])
    }
}

#[test]
fn edges_are_flushed_in_bounded_sequential_batches() {
    let (rows, columns) = (125, 200);
    let csv = dense_matrix(rows, columns);
    let mut pipeline =
        StreamingIngestion::new(IngestConfig::new("dense"), RecordingSink::default());
    let report = pipeline
        .run_source(Cursor::new(csv.into_bytes()))
        .expect("ingest");
    let sink = pipeline.into_sink();

    let vertices = rows + columns;
    assert_eq!(
        sink.batches,
        [
            (vertices, 0),
            (10_000, 10_000),
            (10_000, 10_000),
            (5_000, 5_000)
        ]
    );
    assert_eq!(report.vertices_written, vertices as u64);
    assert_eq!(report.edges_written, 25_000);
    assert_eq!(report.flushes, 4);
    assert_eq!(report.rows_scanned, rows as u64);
}

#[test]
fn a_smaller_batch_size_produces_more_flushes() {
    let csv = dense_matrix(3, 3);
    let mut config = IngestConfig::new("dense");
    config.batch_size = 4;
    let mut pipeline = StreamingIngestion::new(config, RecordingSink::default());
    pipeline
        .run_source(Cursor::new(csv.into_bytes()))
        .expect("ingest");

    assert_eq!(
        pipeline.sink().batches,
        [(6, 0), (4, 4), (4, 4), (1, 1)]
    );
}

struct FailingSink {
    calls: usize,
}

impl BulkSink for FailingSink {
    fn flush(
        &mut self,
        _destination: &Destination,
        _batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError> {
        self.calls += 1;
        Err(SinkError::Message("connection reset".into()))
    }
}

#[test]
fn a_failed_flush_stops_the_run() {
    let mut pipeline = StreamingIngestion::new(
        IngestConfig::new("dense"),
        FailingSink { calls: 0 },
    );
    let err = pipeline
        .run_source(Cursor::new(dense_matrix(2, 2).into_bytes()))
        .unwrap_err();

    assert!(matches!(err, IngestError::Sink(SinkError::Message(_))));
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(pipeline.sink().calls, 1);
}

struct ShortSink;

impl BulkSink for ShortSink {
    fn flush(
        &mut self,
        _destination: &Destination,
        _batch: &[WriteOperation],
    ) -> Result<Vec<OperationOutcome>, SinkError> {
        Ok(Vec::new())
    }
}

#[test]
fn a_sink_must_report_one_outcome_per_operation() {
    let mut pipeline = StreamingIngestion::new(IngestConfig::new("dense"), ShortSink);
    let err = pipeline
        .run_source(Cursor::new(dense_matrix(1, 1).into_bytes()))
        .unwrap_err();
    assert!(matches!(err, IngestError::Message(_)));
}

#[test]
fn create_conflicts_are_collected_not_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_matrix(&dir, "io.csv", &dense_matrix(2, 2));
    let mut sink = MemorySink::new();

    let mut config = IngestConfig::new(&path);
    config.mode = WriteMode::Create;
    let first = StreamingIngestion::new(config.clone(), &mut sink)
        .run()
        .expect("first run");
    assert_eq!(first.vertices_written, 4);
    assert_eq!(first.edges_written, 4);
    assert!(first.failures.is_empty());

    let second = StreamingIngestion::new(config, &mut sink)
        .run()
        .expect("second run");
    assert_eq!(second.vertices_written, 0);
    assert_eq!(second.failure_count(), 4);
    assert!(second
        .failures
        .iter()
        .all(|f| f.kind == "vertex" && f.status == 409));
    // Edge ids are generated per run, so edges never conflict.
    assert_eq!(second.edges_written, 4);
    assert_eq!(sink.len(), 4 + 8);
}

#[test]
fn a_missing_file_is_reported() {
    let dir = TempDir::new().expect("tempdir");
    let mut pipeline = StreamingIngestion::new(
        IngestConfig::new(dir.path().join("absent.csv")),
        MemorySink::new(),
    );
    let err = pipeline.run().unwrap_err();
    assert!(err.to_string().contains("absent.csv"), "{err}");
}

#[test]
fn a_header_only_matrix_writes_vertices_and_no_edges() {
    let mut pipeline = StreamingIngestion::new(IngestConfig::new("header"), MemorySink::new());
    let report = pipeline
        .run_source(Cursor::new(&b",A_X,B_Y,TOTAL\n"[..]))
        .expect("ingest");

    assert_eq!(
        report,
        IngestReport {
            vertices_written: 2,
            flushes: 1,
            skipped_columns: 1,
            ..IngestReport::default()
        }
    );
}
