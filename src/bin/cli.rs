//! Binary entry point for the graphbulk loader.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use graphbulk::{
    BulkSink, ConvertError, Destination, IngestConfig, IngestReport, JsonLinesSink,
    OperationFactory, SampleGenerator, StreamingIngestion, WriteMode, WriteOperation,
};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::CliConfig;
use crate::ui::{format_duration, ColorChoice, Ui};

const FAILURES_SHOWN: usize = 20;

#[derive(Parser, Debug)]
#[command(
    name = "graphbulk",
    version,
    about = "Bulk loader turning input-output tables into graph write operations",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "GRAPHBULK_CONFIG",
        value_name = "FILE",
        help = "Path to config.toml"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for reports"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ColorChoice::Auto,
        help = "When to colour text output"
    )]
    color: ColorChoice,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DestinationArgs {
    #[arg(long, help = "Target database name")]
    database: Option<String>,

    #[arg(long, help = "Target container name")]
    container: Option<String>,
}

#[derive(Args, Debug)]
struct LoadCmd {
    #[arg(long, value_name = "FILE", help = "Input-output matrix in CSV form")]
    csv: PathBuf,

    #[arg(long, help = "Only cells above this value become edges [default: 1.0]")]
    min_value: Option<f64>,

    #[arg(long, help = "Edges per flush [default: 10000]")]
    batch_size: Option<usize>,

    #[arg(long, help = "Use CREATE instead of UPSERT operations")]
    create: bool,

    #[arg(long, value_name = "FILE", help = "JSON-lines file receiving the operations")]
    out: PathBuf,

    #[command(flatten)]
    destination: DestinationArgs,
}

#[derive(Args, Debug)]
struct GenerateCmd {
    #[arg(long, help = "Number of country-sector vertices")]
    vertices: usize,

    #[arg(long, default_value_t = 3, help = "Maximum supply edges per vertex")]
    factor: usize,

    #[arg(long, help = "Seed for a reproducible graph")]
    seed: Option<u64>,

    #[arg(long, help = "Operations per flush [default: 10000]")]
    batch_size: Option<usize>,

    #[arg(long, help = "Use CREATE instead of UPSERT operations")]
    create: bool,

    #[arg(long, value_name = "FILE", help = "JSON-lines file receiving the operations")]
    out: PathBuf,

    #[command(flatten)]
    destination: DestinationArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Stream a CSV matrix into vertex and edge operations")]
    Load(LoadCmd),

    #[command(about = "Write a random country-sector graph")]
    Generate(GenerateCmd),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Default, Serialize)]
struct GenerateReport {
    vertices_written: u64,
    edges_written: u64,
    flushes: u64,
    failures: u64,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graphbulk=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = CliConfig::load(cli.config.clone())?;
    debug!(path = ?config.path(), "cli.config.loaded");
    let ui = Ui::new(cli.color);

    match cli.command {
        Command::Load(cmd) => run_load(&cmd, &config, &ui, cli.format),
        Command::Generate(cmd) => run_generate(&cmd, &config, &ui, cli.format),
    }
}

fn resolve_mode(create: bool, config: &CliConfig) -> WriteMode {
    if create {
        WriteMode::Create
    } else {
        config.mode().unwrap_or_default()
    }
}

fn open_output(path: &Path) -> Result<JsonLinesSink<BufWriter<File>>, Box<dyn Error>> {
    let file = File::create(path)
        .map_err(|err| format!("cannot create {}: {err}", path.display()))?;
    Ok(JsonLinesSink::new(BufWriter::new(file)))
}

fn run_load(
    cmd: &LoadCmd,
    config: &CliConfig,
    ui: &Ui,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let mut ingest = IngestConfig::new(&cmd.csv);
    if let Some(min_value) = cmd.min_value.or(config.min_value()) {
        ingest.min_value = min_value;
    }
    if let Some(batch_size) = cmd.batch_size.or(config.batch_size()) {
        ingest.batch_size = batch_size;
    }
    ingest.mode = resolve_mode(cmd.create, config);
    ingest.destination = config.destination(
        cmd.destination.database.clone(),
        cmd.destination.container.clone(),
    );

    let sink = open_output(&cmd.out)?;
    let mut pipeline = StreamingIngestion::new(ingest, sink);
    let task = ui.task(format!("loading {}", cmd.csv.display()));
    let report = pipeline.run()?;
    let elapsed = task.finish();
    info!(
        out = %cmd.out.display(),
        elapsed_ms = elapsed.as_millis() as u64,
        "cli.load.completed"
    );

    emit(format, &report, || {
        print_load_text(ui, pipeline.config(), &report, &cmd.out);
        ui.success(&format!("load finished in {}", format_duration(elapsed)));
    })
}

fn run_generate(
    cmd: &GenerateCmd,
    config: &CliConfig,
    ui: &Ui,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let mut generator = match cmd.seed {
        Some(seed) => SampleGenerator::from_seed(seed),
        None => SampleGenerator::new()?,
    };
    let batch_size = cmd
        .batch_size
        .or(config.batch_size())
        .unwrap_or(graphbulk::ingest::DEFAULT_BATCH_SIZE);
    if batch_size == 0 {
        return Err("batch size must be at least 1".into());
    }
    let mode = resolve_mode(cmd.create, config);
    let destination = config.destination(
        cmd.destination.database.clone(),
        cmd.destination.container.clone(),
    );

    let task = ui.task("generating sample graph");
    let vertices = generator.vertices(cmd.vertices);
    let edges = generator.edges(&vertices, cmd.factor);
    let factory = OperationFactory::default();
    let mut sink = open_output(&cmd.out)?;
    let mut report = GenerateReport::default();
    write_in_batches(
        &mut sink,
        &destination,
        factory.operations(mode, vertices),
        batch_size,
        &mut report,
    )?;
    write_in_batches(
        &mut sink,
        &destination,
        factory.operations(mode, edges),
        batch_size,
        &mut report,
    )?;
    let elapsed = task.finish();

    emit(format, &report, || {
        ui.section(
            "Generated",
            [
                ("out", cmd.out.display().to_string()),
                ("mode", mode.to_string()),
                ("vertices", report.vertices_written.to_string()),
                ("edges", report.edges_written.to_string()),
                ("flushes", report.flushes.to_string()),
                ("failures", report.failures.to_string()),
            ],
        );
        ui.success(&format!("generate finished in {}", format_duration(elapsed)));
    })
}

fn write_in_batches<S, I>(
    sink: &mut S,
    destination: &Destination,
    operations: I,
    batch_size: usize,
    report: &mut GenerateReport,
) -> Result<(), Box<dyn Error>>
where
    S: BulkSink,
    I: Iterator<Item = Result<WriteOperation, ConvertError>>,
{
    let mut batch = Vec::with_capacity(batch_size.min(graphbulk::ingest::DEFAULT_BATCH_SIZE));
    for operation in operations {
        batch.push(operation?);
        if batch.len() >= batch_size {
            flush_batch(sink, destination, &mut batch, report)?;
        }
    }
    flush_batch(sink, destination, &mut batch, report)
}

fn flush_batch<S: BulkSink>(
    sink: &mut S,
    destination: &Destination,
    batch: &mut Vec<WriteOperation>,
    report: &mut GenerateReport,
) -> Result<(), Box<dyn Error>> {
    if batch.is_empty() {
        return Ok(());
    }
    let outcomes = sink.flush(destination, batch)?;
    if outcomes.len() != batch.len() {
        return Err(format!(
            "sink reported {} outcomes for a batch of {}",
            outcomes.len(),
            batch.len()
        )
        .into());
    }
    report.flushes += 1;
    for (op, outcome) in batch.drain(..).zip(outcomes) {
        match (outcome.is_success(), op.document.is_edge()) {
            (false, _) => report.failures += 1,
            (true, true) => report.edges_written += 1,
            (true, false) => report.vertices_written += 1,
        }
    }
    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: FnOnce(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_load_text(ui: &Ui, config: &IngestConfig, report: &IngestReport, out: &Path) {
    ui.section(
        "Load",
        [
            ("input", config.path.display().to_string()),
            ("out", out.display().to_string()),
            (
                "destination",
                format!(
                    "{}/{}",
                    config.destination.database, config.destination.container
                ),
            ),
            ("mode", config.mode.to_string()),
            ("min value", config.min_value.to_string()),
            ("batch size", config.batch_size.to_string()),
        ],
    );
    ui.section(
        "Results",
        [
            ("rows scanned", report.rows_scanned),
            ("vertices", report.vertices_written),
            ("edges", report.edges_written),
            ("flushes", report.flushes),
            ("skipped rows", report.skipped_rows),
            ("skipped columns", report.skipped_columns),
            ("skipped cells", report.skipped_cells),
            ("failures", report.failure_count() as u64),
        ],
    );
    ui.list(
        "Failed operations",
        report.failures.iter().take(FAILURES_SHOWN).map(|failure| {
            format!(
                "{} {} ({}): {}",
                failure.kind, failure.id, failure.status, failure.message
            )
        }),
    );
    if report.failure_count() > FAILURES_SHOWN {
        ui.warn(&format!(
            "{} more failed operations not shown",
            report.failure_count() - FAILURES_SHOWN
        ));
    }
}
