#![forbid(unsafe_code)]

//! Two-pass streaming ingestion of input-output matrices.
//!
//! The input is a comma-separated matrix: the header row lists consumer entity ids
//! (its first cell is ignored), and every data row starts with a supplier entity id
//! followed by flow values. The first pass only reads the header and the first cell of
//! each row to discover the distinct entities and write them as one vertex batch. The
//! second pass re-reads the rows and turns every qualifying cell into a supply edge,
//! flushing edges to the sink in fixed-size batches. Memory stays proportional to the
//! number of entities plus one edge batch, whatever the number of cells.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

use csv::{ByteRecord, Reader, ReaderBuilder, Trim};
use tracing::{debug, error, info, warn};

use crate::document::{EndpointInfo, GraphDocument};
use crate::error::IngestError;
use crate::model::{is_entity_id, CountrySectorVertex, SupplyEdge, SUPPLY_LABEL};
use crate::operation::{OperationFactory, WriteMode, WriteOperation};
use crate::sink::{BulkSink, Destination, OperationOutcome};

mod report;

pub use report::{FailedOperation, IngestReport};

/// Edges per flush unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;
/// Cells at or below this value are dropped unless configured otherwise.
pub const DEFAULT_MIN_VALUE: f64 = 1.0;

/// Configuration for one ingestion run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// Path to the matrix file.
    pub path: PathBuf,
    /// Only cells strictly greater than this become edges.
    pub min_value: f64,
    /// Maximum number of edges per flush.
    pub batch_size: usize,
    /// Write mode of every operation.
    pub mode: WriteMode,
    /// Where the sink should write.
    pub destination: Destination,
}

impl IngestConfig {
    /// Configuration with default tunables for the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            min_value: DEFAULT_MIN_VALUE,
            batch_size: DEFAULT_BATCH_SIZE,
            mode: WriteMode::default(),
            destination: Destination::default(),
        }
    }

    fn validate(&self) -> Result<(), IngestError> {
        if self.batch_size == 0 {
            return Err("batch size must be at least 1".into());
        }
        if self.min_value.is_nan() {
            return Err("minimum value must be a number".into());
        }
        Ok(())
    }
}

/// Entities found by the discovery pass.
struct Discovery {
    /// Entity id per data column; `None` for columns that are not entity ids.
    columns: Vec<Option<String>>,
    ids: BTreeSet<String>,
}

/// Streams a matrix file into a [`BulkSink`].
pub struct StreamingIngestion<S> {
    config: IngestConfig,
    factory: OperationFactory,
    sink: S,
}

impl<S: BulkSink> StreamingIngestion<S> {
    /// Creates a pipeline with a fresh operation factory.
    pub fn new(config: IngestConfig, sink: S) -> Self {
        Self::with_factory(config, OperationFactory::default(), sink)
    }

    /// Creates a pipeline converting through `factory`.
    pub fn with_factory(config: IngestConfig, factory: OperationFactory, sink: S) -> Self {
        Self {
            config,
            factory,
            sink,
        }
    }

    /// Run configuration.
    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// The sink batches are flushed to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the pipeline, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Ingests the configured file.
    pub fn run(&mut self) -> Result<IngestReport, IngestError> {
        let file = File::open(&self.config.path).map_err(|err| {
            IngestError::Message(format!(
                "cannot open {}: {err}",
                self.config.path.display()
            ))
        })?;
        self.run_source(file)
    }

    /// Ingests from any seekable source; it is read twice from its current start.
    ///
    /// Malformed ids and cells are skipped and counted. Operations the sink rejects are
    /// collected in the report. A conversion error or a failed flush stops the run.
    pub fn run_source<R: Read + Seek>(
        &mut self,
        mut source: R,
    ) -> Result<IngestReport, IngestError> {
        self.config.validate()?;
        let start = source.stream_position()?;
        let mut report = IngestReport::default();

        let discovery = discover(matrix_reader(&mut source), &mut report)?;
        info!(
            entities = discovery.ids.len(),
            rows = report.rows_scanned,
            skipped_rows = report.skipped_rows,
            skipped_columns = report.skipped_columns,
            "ingest.discovery.complete"
        );

        let endpoints = self.write_vertices(&discovery, &mut report)?;

        source.seek(SeekFrom::Start(start))?;
        self.write_edges(
            matrix_reader(&mut source),
            &discovery.columns,
            &endpoints,
            &mut report,
        )?;

        info!(
            vertices = report.vertices_written,
            edges = report.edges_written,
            flushes = report.flushes,
            skipped = report.skipped_total(),
            failures = report.failure_count(),
            "ingest.complete"
        );
        Ok(report)
    }

    fn write_vertices(
        &mut self,
        discovery: &Discovery,
        report: &mut IngestReport,
    ) -> Result<HashMap<String, EndpointInfo>, IngestError> {
        let converter = self.factory.vertex_converter();
        let mut endpoints = HashMap::with_capacity(discovery.ids.len());
        let mut batch = Vec::with_capacity(discovery.ids.len());
        for id in &discovery.ids {
            let Some(vertex) = CountrySectorVertex::from_country_sector_id(id) else {
                continue;
            };
            let document = converter.to_vertex(&vertex)?;
            endpoints.insert(id.clone(), EndpointInfo::from(&document));
            batch.push(WriteOperation::new(
                self.config.mode,
                GraphDocument::Vertex(document),
            ));
        }
        self.flush(&mut batch, report, "vertices")?;
        Ok(endpoints)
    }

    fn write_edges<R: Read>(
        &mut self,
        mut reader: Reader<R>,
        columns: &[Option<String>],
        endpoints: &HashMap<String, EndpointInfo>,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let batch_size = self.config.batch_size;
        let mut batch: Vec<WriteOperation> =
            Vec::with_capacity(batch_size.min(DEFAULT_BATCH_SIZE));
        let mut record = ByteRecord::new();
        let mut header_seen = false;

        while reader.read_byte_record(&mut record)? {
            if !header_seen {
                header_seen = true;
                continue;
            }
            let Some(source) = record
                .get(0)
                .and_then(decode)
                .and_then(|row_id| endpoints.get(row_id))
            else {
                continue;
            };
            for (index, cell) in record.iter().skip(1).enumerate() {
                let Some(column_id) = columns.get(index) else {
                    report.skipped_cells += 1;
                    continue;
                };
                let Some(destination) = column_id.as_ref().and_then(|id| endpoints.get(id))
                else {
                    continue;
                };
                let Some(value) = decode(cell).and_then(parse_cell) else {
                    report.skipped_cells += 1;
                    continue;
                };
                if value <= self.config.min_value {
                    continue;
                }
                let edge = SupplyEdge {
                    id: None,
                    source: source.clone(),
                    destination: destination.clone(),
                    label: SUPPLY_LABEL.to_string(),
                    value,
                };
                batch.push(self.factory.operation(self.config.mode, &edge)?);
                if batch.len() >= batch_size {
                    self.flush(&mut batch, report, "edges")?;
                }
            }
        }
        self.flush(&mut batch, report, "edges")
    }

    fn flush(
        &mut self,
        batch: &mut Vec<WriteOperation>,
        report: &mut IngestReport,
        phase: &'static str,
    ) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }
        let outcomes = match self.sink.flush(&self.config.destination, batch) {
            Ok(outcomes) => outcomes,
            Err(err) => {
                error!(phase, batch = batch.len(), error = %err, "ingest.flush.failed");
                return Err(err.into());
            }
        };
        if outcomes.len() != batch.len() {
            return Err(IngestError::Message(format!(
                "sink reported {} outcomes for a batch of {}",
                outcomes.len(),
                batch.len()
            )));
        }
        report.flushes += 1;
        for (op, outcome) in batch.drain(..).zip(outcomes) {
            let is_edge = op.document.is_edge();
            match outcome {
                OperationOutcome::Success { .. } if is_edge => report.edges_written += 1,
                OperationOutcome::Success { .. } => report.vertices_written += 1,
                OperationOutcome::Failed { status, message } => {
                    warn!(
                        id = op.document.id(),
                        status,
                        message = message.as_str(),
                        "ingest.operation.failed"
                    );
                    report.failures.push(FailedOperation {
                        id: op.document.id().to_string(),
                        partition_key: op.partition_key,
                        kind: if is_edge { "edge" } else { "vertex" },
                        status,
                        message,
                    });
                }
            }
        }
        debug!(phase, flushes = report.flushes, "ingest.flush.complete");
        Ok(())
    }
}

fn matrix_reader<R: Read>(source: R) -> Reader<R> {
    ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(source)
}

fn discover<R: Read>(
    mut reader: Reader<R>,
    report: &mut IngestReport,
) -> Result<Discovery, IngestError> {
    let mut records = reader.byte_records();
    let Some(header) = records.next().transpose()? else {
        return Ok(Discovery {
            columns: Vec::new(),
            ids: BTreeSet::new(),
        });
    };

    let columns: Vec<Option<String>> = header
        .iter()
        .skip(1)
        .map(|cell| {
            decode(cell)
                .filter(|id| is_entity_id(id))
                .map(|id| id.to_string())
        })
        .collect();
    report.skipped_columns = columns.iter().filter(|c| c.is_none()).count() as u64;
    let mut ids: BTreeSet<String> = columns.iter().flatten().cloned().collect();

    for record in records {
        let record = record?;
        report.rows_scanned += 1;
        match record
            .get(0)
            .and_then(decode)
            .filter(|row_id| is_entity_id(row_id))
        {
            Some(row_id) => {
                if !ids.contains(row_id) {
                    ids.insert(row_id.to_string());
                }
            }
            None => {
                report.skipped_rows += 1;
                debug!(row = report.rows_scanned, "ingest.discovery.row_skipped");
            }
        }
    }
    Ok(Discovery { columns, ids })
}

/// Undecodable bytes make the field malformed rather than the whole record.
fn decode(field: &[u8]) -> Option<&str> {
    std::str::from_utf8(field).ok()
}

fn parse_cell(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|value| value.is_finite())
}
