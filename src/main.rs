use anyhow::Context;
use clap::{Parser, Subcommand};
use ledgerwatch::config::Config;
use ledgerwatch::error::ConfigError;
use ledgerwatch::events::{EventKind, Severity};
use ledgerwatch::ingest::{self, Applied};
use ledgerwatch::pipeline::Pipeline;
use ledgerwatch::reports::ExportFormat;
use ledgerwatch::store::EventFilter;
use log::{error, info, warn};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

/// Command-line arguments for the audit and error pipeline
#[derive(Parser)]
#[command(
    name = "ledgerwatch",
    about = "Audit and error event pipeline - replay, alert, report and export",
    long_about = "Replays JSON-lines streams of audit activity and captured errors through an \
                  in-memory event pipeline that classifies events, fires threshold alert rules, \
                  forwards critical activity to an audit endpoint and prints reports and exports."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Predicates shared by the commands that select events
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
struct FilterArgs {
    /// Only events of this kind (audit or error)
    #[arg(long)]
    kind: Option<EventKind>,

    /// Only events by this actor
    #[arg(long)]
    actor: Option<String>,

    /// Only events with this action
    #[arg(long)]
    action: Option<String>,

    /// Only events on this resource
    #[arg(long)]
    resource: Option<String>,

    /// Only events of this severity
    #[arg(long)]
    severity: Option<Severity>,

    /// Only resolved (true) or unresolved (false) errors
    #[arg(long)]
    resolved: Option<bool>,

    /// Maximum number of events
    #[arg(long)]
    limit: Option<usize>,
}

impl FilterArgs {
    fn to_filter(&self) -> EventFilter {
        EventFilter {
            kind: self.kind,
            actor: self.actor.clone(),
            action: self.action.clone(),
            resource: self.resource.clone(),
            severity: self.severity,
            resolved: self.resolved,
            limit: self.limit,
            ..EventFilter::default()
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Replay a JSON-lines file ("-" for stdin) and print a report
    Replay {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Replay input and print a filtered report
    Report {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(long, default_value = "Event report")]
        title: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Print the report as JSON instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Replay input and export the selected events
    Export {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        #[arg(long, default_value = "json")]
        format: ExportFormat,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Replay input and print audit and error statistics
    Stats {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// List the alert rules from the configuration
    Rules,

    /// Ingest stdin until EOF or Ctrl+C, then print a report
    Watch,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(input) = self.command.input() {
            if input != Path::new("-") && !input.is_file() {
                return Err(format!("Input is not a readable file: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Convert config path to string safely, handling non-UTF-8 paths
    ///
    /// # Returns
    ///
    /// `Ok(Some(path_str))` if config is provided and valid UTF-8,
    /// `Ok(None)` if no config provided,
    /// `Err(String)` if config path contains invalid UTF-8
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }
}

impl Command {
    fn input(&self) -> Option<&Path> {
        match self {
            Command::Replay { input }
            | Command::Report { input, .. }
            | Command::Export { input, .. }
            | Command::Stats { input } => Some(input.as_path()),
            Command::Rules | Command::Watch => None,
        }
    }
}

/// Load configuration from file or use defaults
///
/// Unreadable or invalid files are reported and replaced by the defaults.
fn load_config(config_path: Option<&str>) -> Result<Config, ConfigError> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            match Config::from_file(Path::new(path)) {
                Ok(config) => Ok(config),
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path
                    );
                    Ok(Config::default())
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path, e);
                    warn!("Using default configuration due to invalid config file");
                    Ok(Config::default())
                }
            }
        }
        None => {
            info!("Using default configuration");
            Ok(Config::default())
        }
    }
}

/// Line counts from one ingestion run
#[derive(Debug, Default, PartialEq)]
struct IngestSummary {
    recorded: usize,
    skipped: usize,
    resolved: usize,
    invalid: usize,
}

/// Parse and apply one line, updating the summary
fn ingest_line(pipeline: &mut Pipeline, line: &str, line_number: usize, summary: &mut IngestSummary) {
    match ingest::parse_line(line) {
        None => {}
        Some(Ok(record)) => match ingest::apply(pipeline, record) {
            Applied::Recorded(_) => summary.recorded += 1,
            Applied::Skipped => summary.skipped += 1,
            Applied::Resolved(_) => summary.resolved += 1,
        },
        Some(Err(e)) => {
            warn!("Skipping invalid input on line {}: {}", line_number, e);
            summary.invalid += 1;
        }
    }
}

/// Feed every line of `reader` into the pipeline
fn ingest_reader(pipeline: &mut Pipeline, reader: impl BufRead) -> anyhow::Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.context("failed to read input")?;
        ingest_line(pipeline, &line, index + 1, &mut summary);
    }
    Ok(summary)
}

fn replay_input(pipeline: &mut Pipeline, input: &Path) -> anyhow::Result<IngestSummary> {
    let summary = if input == Path::new("-") {
        ingest_reader(pipeline, std::io::stdin().lock())?
    } else {
        let file = std::fs::File::open(input)
            .with_context(|| format!("failed to open {}", input.display()))?;
        ingest_reader(pipeline, BufReader::new(file))?
    };

    info!(
        "Ingested {} events ({} resolutions, {} skipped, {} invalid lines)",
        summary.recorded, summary.resolved, summary.skipped, summary.invalid
    );
    Ok(summary)
}

/// Read stdin on a background thread and ingest until EOF or Ctrl+C
fn watch(pipeline: &mut Pipeline) -> anyhow::Result<IngestSummary> {
    let (line_sender, line_receiver) = mpsc::channel::<String>();
    let (shutdown_sender, shutdown_receiver) = mpsc::channel::<()>();

    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), stopping watch...");
        if let Err(e) = shutdown_sender.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })
    .context("failed to set SIGINT handler")?;

    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if line_sender.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });

    info!("Watching stdin. Press Ctrl+C to stop.");
    let mut summary = IngestSummary::default();
    let mut line_number = 0;
    loop {
        if shutdown_receiver.try_recv().is_ok() {
            break;
        }

        match line_receiver.recv_timeout(Duration::from_millis(500)) {
            Ok(line) => {
                line_number += 1;
                ingest_line(pipeline, &line, line_number, &mut summary);
            }
            Err(RecvTimeoutError::Timeout) => {
                // Idle: drain notifications held back by the rate limit
                pipeline.tick_notifications();
            }
            Err(RecvTimeoutError::Disconnected) => {
                info!("Input closed");
                break;
            }
        }
    }

    Ok(summary)
}

fn run(cli: &Cli, pipeline: &mut Pipeline) -> anyhow::Result<()> {
    match &cli.command {
        Command::Replay { input } => {
            replay_input(pipeline, input)?;
            let report = pipeline.generate_report(
                "Replay report",
                &format!("Events replayed from {}", input.display()),
                EventFilter::all(),
                "ledgerwatch",
            );
            print!("{}", report.render_text());
        }
        Command::Report {
            input,
            title,
            description,
            json,
            filter,
        } => {
            replay_input(pipeline, input)?;
            let report =
                pipeline.generate_report(title, description, filter.to_filter(), "ledgerwatch");
            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.render_text());
            }
        }
        Command::Export {
            input,
            format,
            filter,
        } => {
            replay_input(pipeline, input)?;
            let exported = pipeline.export_events(&filter.to_filter(), *format)?;
            println!("{}", exported.trim_end());
        }
        Command::Stats { input } => {
            replay_input(pipeline, input)?;
            let stats = serde_json::json!({
                "audit": pipeline.audit_stats(),
                "errors": pipeline.error_stats(),
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Rules => {
            if pipeline.rules().is_empty() {
                println!("No alert rules configured");
            }
            for rule in pipeline.rules() {
                println!("{}", serde_json::to_string(rule)?);
            }
        }
        Command::Watch => {
            watch(pipeline)?;
            let report =
                pipeline.generate_report("Watch report", "", EventFilter::all(), "ledgerwatch");
            print!("{}", report.render_text());
        }
    }
    Ok(())
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    // Validate CLI arguments
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    // Load configuration with safe path handling
    let config_path = match cli.config_path_str() {
        Ok(path) => path,
        Err(e) => {
            error!("Invalid configuration path: {}", e);
            std::process::exit(1);
        }
    };

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Deliveries run on this runtime while the pipeline stays on the main thread
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };
    let guard = runtime.enter();

    let mut pipeline = match Pipeline::from_config(&config) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Failed to initialize pipeline: {}", e);
            std::process::exit(1);
        }
    };

    let result = run(&cli, &mut pipeline);
    drop(guard);

    let flushed = runtime.block_on(pipeline.flush_deliveries());
    if flushed > 0 {
        info!("Flushed {} outbound deliveries", flushed);
    }

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
