// gadai CLI - pawn-loan transaction pipeline and report server

mod config_cmd;
mod exit_codes;
mod inspect;
mod run;
mod serve;
mod util;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use gadai_pipeline::{LifecycleStage, PipelineConfig, PipelineError};

use exit_codes::{
    pipeline_exit_code, EXIT_CONFIG, EXIT_ERROR, EXIT_IO, EXIT_REPORT_MISSING, EXIT_SUCCESS,
    EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "gadai")]
#[command(about = "Pawn-loan transaction pipeline: merge lifecycle sheets, classify risk, serve reports")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Machine-readable output on stdout (errors included)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads the workbook.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Pipeline config (TOML); built-in defaults when omitted
    #[arg(long, short = 'c', env = "GADAI_CONFIG")]
    config: Option<PathBuf>,

    /// Source workbook (xlsx, xls, xlsb, ods) or delimited file
    #[arg(long, short = 'i', env = "GADAI_INPUT", default_value = "gadai.xlsx")]
    input: PathBuf,
}

/// Where reports are written and served from.
#[derive(clap::Args, Clone)]
struct OutputArgs {
    #[arg(long, short = 'o', env = "GADAI_OUTPUT_DIR", default_value = "output")]
    output_dir: PathBuf,

    /// Config whose [output] table names the report files
    #[arg(long, short = 'c', env = "GADAI_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load every lifecycle sheet, classify and write all reports
    #[command(after_help = "\
Examples:
  gadai run --input data/gadai.xlsx
  gadai run -i gadai.xlsx -o reports --as-of 2025-06-01
  gadai run -c cabang.toml --json | jq .summary")]
    Run {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, short = 'o', env = "GADAI_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        /// Day used for overdue detection (YYYY-MM-DD); today when omitted
        #[arg(long, value_name = "DATE")]
        as_of: Option<String>,
    },

    /// Run the pipeline over one flat table (a CSV or a single sheet)
    #[command(after_help = "\
Missing required columns are fatal here (exit 5), unlike `run`, which skips
the sheet and carries on.

Examples:
  gadai process upload.csv
  gadai process export.xlsx --sheet Late --stage late
  gadai process upload.csv -o reports --json")]
    Process {
        /// Table to process
        file: PathBuf,

        /// Sheet to read from a workbook (first sheet when omitted)
        #[arg(long)]
        sheet: Option<String>,

        /// Lifecycle stage assigned to every row
        #[arg(long, value_enum, default_value_t = StageArg::Active)]
        stage: StageArg,

        #[arg(long, short = 'c', env = "GADAI_CONFIG")]
        config: Option<PathBuf>,

        #[arg(long, short = 'o', env = "GADAI_OUTPUT_DIR", default_value = "output")]
        output_dir: PathBuf,

        #[arg(long, value_name = "DATE")]
        as_of: Option<String>,
    },

    /// Portfolio summary from the persisted transaction table (JSON)
    Summary {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Per-outlet aggregates (JSON)
    #[command(after_help = "\
Examples:
  gadai outlets
  gadai outlets --top 5 --sort persen_berisiko")]
    Outlets {
        #[command(flatten)]
        output: OutputArgs,

        /// Keep only the first N rows
        #[arg(long)]
        top: Option<usize>,

        /// Re-sort descending by this column
        #[arg(long, value_enum)]
        sort: Option<serve::OutletSort>,
    },

    /// Paginated transaction rows (JSON)
    #[command(after_help = "\
Examples:
  gadai transactions --page 2 --per-page 100
  gadai transactions --outlet Depok")]
    Transactions {
        #[command(flatten)]
        output: OutputArgs,

        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        page: u64,

        #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..=1000))]
        per_page: u64,

        /// Only rows of this outlet (case-insensitive)
        #[arg(long)]
        outlet: Option<String>,
    },

    /// Show how each sheet of a workbook would be read
    #[command(after_help = "\
Examples:
  gadai inspect gadai.xlsx
  gadai inspect gadai.xlsx -c cabang.toml --json")]
    Inspect {
        /// Workbook or delimited file to inspect
        file: PathBuf,

        #[arg(long, short = 'c', env = "GADAI_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Profile the unified table before dedup (row counts, nulls, duplicates)
    Validate {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Rank persisted transactions with the fitted logistic scorer
    Score {
        #[command(flatten)]
        output: OutputArgs,

        #[arg(long, default_value_t = 20)]
        top: usize,
    },

    /// Check or print pipeline configuration
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

/// Lifecycle stage as a command-line value.
#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Outstanding,
    Active,
    OnDue,
    Late,
    Auction,
}

impl From<StageArg> for LifecycleStage {
    fn from(arg: StageArg) -> Self {
        match arg {
            StageArg::Outstanding => LifecycleStage::Outstanding,
            StageArg::Active => LifecycleStage::Active,
            StageArg::OnDue => LifecycleStage::OnDue,
            StageArg::Late => LifecycleStage::Late,
            StageArg::Auction => LifecycleStage::Auction,
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GADAI_GIT_HASH"), ")",
        "\nengine:  gadai-pipeline ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("GADAI_TARGET"),
    )
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let json = cli.json;

    let result = match cli.command {
        Commands::Run { source, output_dir, as_of } => {
            run::cmd_run(source.config, source.input, output_dir, as_of, json)
        }
        Commands::Process { file, sheet, stage, config, output_dir, as_of } => {
            run::cmd_process(file, sheet, stage.into(), config, output_dir, as_of, json)
        }
        Commands::Summary { output } => serve::cmd_summary(output.config, output.output_dir),
        Commands::Outlets { output, top, sort } => {
            serve::cmd_outlets(output.config, output.output_dir, top, sort)
        }
        Commands::Transactions { output, page, per_page, outlet } => {
            serve::cmd_transactions(output.config, output.output_dir, page, per_page, outlet)
        }
        Commands::Inspect { file, config } => inspect::cmd_inspect(file, config, json),
        Commands::Validate { source } => inspect::cmd_validate(source.config, source.input, json),
        Commands::Score { output, top } => {
            serve::cmd_score(output.config, output.output_dir, top, json)
        }
        Commands::Config(cmd) => config_cmd::cmd_config(cmd, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if json {
                let payload = serde_json::json!({
                    "error": error_kind(code),
                    "message": message,
                    "exit_code": code,
                });
                println!("{}", payload);
            } else {
                if !message.is_empty() {
                    eprintln!("error: {}", message);
                }
                if let Some(hint) = hint {
                    eprintln!("hint:  {}", hint);
                }
            }
            ExitCode::from(code)
        }
    }
}

fn error_kind(code: u8) -> &'static str {
    match code {
        EXIT_USAGE => "usage",
        EXIT_CONFIG => "invalid_config",
        exit_codes::EXIT_NO_VALID_SHEETS => "no_valid_sheets",
        exit_codes::EXIT_MISSING_FIELDS => "missing_fields",
        EXIT_IO => "io",
        exit_codes::EXIT_LOCKED => "locked",
        EXIT_REPORT_MISSING => "report_missing",
        _ => "error",
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Persisted report unreadable; points at the command that produces it.
    pub fn report(msg: impl Into<String>) -> Self {
        Self::new(EXIT_REPORT_MISSING, msg)
            .with_hint("run `gadai run` first to produce the reports")
    }

    pub fn pipeline(err: PipelineError) -> Self {
        let code = pipeline_exit_code(&err);
        let hint = match &err {
            PipelineError::NoValidSheets { .. } => {
                Some("check sheet names with `gadai inspect <workbook>`".to_string())
            }
            PipelineError::MissingFields { .. } => {
                Some("add header keywords for these fields in [[fields]]".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Load and validate the config file, or fall back to the defaults.
pub(crate) fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_CONFIG, format!("cannot read config {}: {}", path.display(), e))
    })?;
    PipelineConfig::from_toml(&text).map_err(CliError::pipeline)
}

/// `--as-of` or today, resolved once per invocation.
pub(crate) fn resolve_as_of(arg: Option<&str>) -> Result<NaiveDate, CliError> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            CliError::args(format!("invalid --as-of '{}'", s)).with_hint("use YYYY-MM-DD")
        }),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let output = serde_json::to_string_pretty(value).map_err(|e| CliError::general(e.to_string()))?;
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_of_parses_iso_dates() {
        assert_eq!(
            resolve_as_of(Some("2025-06-01")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
        let err = resolve_as_of(Some("01/06/2025")).unwrap_err();
        assert_eq!(err.code, EXIT_USAGE);
    }

    #[test]
    fn missing_config_file_is_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/gadai.toml"))).unwrap_err();
        assert_eq!(err.code, EXIT_CONFIG);
        assert!(load_config(None).is_ok());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
