//! Scorecard CLI - Command-line interface for the DORA scorecard engine
//!
//! Commands:
//! - aggregate: Turn an event batch into contributor scorecards
//! - validate: Validate events against the dora.events.v1 schema
//! - roster: Merge per-repository contributor listings into a team roster
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dora_scorecard::roster::{merge_roster_json, parse_roster};
use dora_scorecard::schema::{EventBatch, EventBatchAdapter, SCHEMA_VERSION};
use dora_scorecard::types::ContributorScorecard;
use dora_scorecard::{
    Aggregator, ReportEncoder, ScorecardError, ScoringConfig, ENGINE_VERSION, PRODUCER_NAME,
};

/// Environment variable holding the log filter
const LOG_ENV: &str = "SCORECARD_LOG";

/// Scorecard - contributor-level DORA metrics from delivery events
#[derive(Parser)]
#[command(name = "scorecard")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Aggregate delivery events into contributor scorecards", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn an event batch into contributor scorecards
    Aggregate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "report")]
        output_format: OutputFormat,

        /// Scoring configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Weeks covered by the input events
        #[arg(long)]
        window_weeks: Option<f64>,

        /// Seed for reproducible scores
        #[arg(long)]
        seed: Option<u64>,

        /// Team roster used to resolve avatars and names
        #[arg(long)]
        roster: Option<PathBuf>,
    },

    /// Validate events against the dora.events.v1 schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Merge per-repository contributor listings into a team roster
    Roster {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a scoring configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Single dora.events.v1 batch document
    Json,
    /// Newline-delimited JSON (one tagged event per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Versioned report with provenance and summary
    Report,
    /// JSON array of scorecards
    Json,
    /// Newline-delimited JSON (one scorecard per line)
    Ndjson,
    /// Pretty-printed JSON array of scorecards
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => filter,
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new("warn"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<(), ScorecardCliError> {
    match cli.command {
        Commands::Aggregate {
            input,
            output,
            input_format,
            output_format,
            config,
            window_weeks,
            seed,
            roster,
        } => {
            let config = load_config(config.as_deref(), window_weeks, seed)?;
            cmd_aggregate(
                &input,
                &output,
                input_format,
                output_format,
                config,
                roster.as_deref(),
            )
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Roster { input, output } => cmd_roster(&input, &output),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_aggregate(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: ScoringConfig,
    roster: Option<&Path>,
) -> Result<(), ScorecardCliError> {
    let batch = read_batch(input, &input_format)?;
    if batch.is_empty() {
        return Err(ScorecardCliError::NoEvents);
    }

    let mut aggregator = Aggregator::with_config(config)?;
    if let Some(roster_path) = roster {
        let team = parse_roster(&fs::read_to_string(roster_path)?)?;
        aggregator = aggregator.with_identities(team.contributors.iter().map(|c| c.identity()));
        debug!(identities = aggregator.identity_count(), "loaded team roster");
    }

    let outcome = aggregator.aggregate_batch(&batch);
    info!(
        contributors = outcome.scorecards.len(),
        pull_requests = outcome.pull_requests_seen,
        skipped = outcome.skipped.total(),
        "aggregation complete"
    );

    let output_data = match output_format {
        OutputFormat::Report => ReportEncoder::new().encode_to_json(&outcome)? + "\n",
        other => format_scorecards(&outcome.scorecards, &other)?,
    };
    write_output(output, &output_data)
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), ScorecardCliError> {
    let batch = read_batch(input, &input_format)?;
    let results = EventBatchAdapter::validate_batch(&batch);

    let report = ValidationReport {
        total_events: batch.len(),
        valid_events: batch.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                kind: r.kind.to_string(),
                index: r.index,
                error: r.error.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} #{}: {}", err.kind, err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(ScorecardCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_roster(input: &Path, output: &Path) -> Result<(), ScorecardCliError> {
    let listings = read_input(input)?;
    let roster = merge_roster_json(&listings)?;
    write_output(output, &(roster + "\n"))
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), ScorecardCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "engine_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} version {}", PRODUCER_NAME, ENGINE_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(config_path) {
                Ok(content) => match ScoringConfig::from_json(&content) {
                    Ok(parsed) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (window {} weeks, top {} reviewers)",
                            parsed.window_weeks, parsed.top_reviewers
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (pass -i <file>)"
    } else {
        "stdin is a pipe (-i - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Scorecard Doctor Report");
        println!("=======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    if report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error)) {
        Err(ScorecardCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

/// Config file first, then command-line overrides
fn load_config(
    path: Option<&Path>,
    window_weeks: Option<f64>,
    seed: Option<u64>,
) -> Result<ScoringConfig, ScorecardCliError> {
    let mut config = match path {
        Some(path) => ScoringConfig::from_json(&fs::read_to_string(path)?)?,
        None => ScoringConfig::default(),
    };
    if let Some(weeks) = window_weeks {
        config.window_weeks = weeks;
    }
    if seed.is_some() {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

fn read_input(input: &Path) -> Result<String, ScorecardCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_batch(input: &Path, input_format: &InputFormat) -> Result<EventBatch, ScorecardCliError> {
    let input_data = read_input(input)?;
    let batch = match input_format {
        InputFormat::Json => EventBatchAdapter::parse_batch(&input_data)?,
        InputFormat::Ndjson => EventBatchAdapter::parse_ndjson(&input_data)?,
    };
    debug!(
        pull_requests = batch.pull_requests.len(),
        deployments = batch.deployments.len(),
        incidents = batch.incidents.len(),
        "read event batch"
    );
    Ok(batch)
}

fn write_output(output: &Path, data: &str) -> Result<(), ScorecardCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn format_scorecards(
    scorecards: &[ContributorScorecard],
    format: &OutputFormat,
) -> Result<String, ScorecardCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for card in scorecards {
                lines.push(serde_json::to_string(card)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(scorecards)? + "\n"),
        OutputFormat::JsonPretty | OutputFormat::Report => {
            Ok(serde_json::to_string_pretty(scorecards)? + "\n")
        }
    }
}

// Error types

#[derive(Debug)]
enum ScorecardCliError {
    Io(io::Error),
    Engine(ScorecardError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for ScorecardCliError {
    fn from(e: io::Error) -> Self {
        ScorecardCliError::Io(e)
    }
}

impl From<ScorecardError> for ScorecardCliError {
    fn from(e: ScorecardError) -> Self {
        ScorecardCliError::Engine(e)
    }
}

impl From<serde_json::Error> for ScorecardCliError {
    fn from(e: serde_json::Error) -> Self {
        ScorecardCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ScorecardCliError> for CliError {
    fn from(e: ScorecardCliError) -> Self {
        match e {
            ScorecardCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ScorecardCliError::Engine(ScorecardError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'scorecard doctor --config <file>' for details".to_string()),
            },
            ScorecardCliError::Engine(ScorecardError::Validation(e)) => CliError {
                code: "VALIDATION_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'scorecard validate' for details".to_string()),
            },
            ScorecardCliError::Engine(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(format!("Ensure input matches the {} schema", SCHEMA_VERSION)),
            },
            ScorecardCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ScorecardCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            ScorecardCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            ScorecardCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    kind: String,
    index: usize,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
