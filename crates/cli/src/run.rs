//! `gadai run` and `gadai process`: the two entry points that build reports.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use gadai_io::fs::fingerprint;
use gadai_io::reports::write_reports;
use gadai_io::{read_sheet, read_workbook, InputFormat};
use gadai_pipeline::evidence::status_count;
use gadai_pipeline::{LifecycleStage, PipelineConfig, PipelineResult, TransactionStatus};
use log::info;
use serde::Serialize;

use crate::exit_codes::{EXIT_IO, EXIT_LOCKED};
use crate::{load_config, print_json, resolve_as_of, CliError};

pub const LOCK_FILE: &str = ".gadai.lock";

/// Holds `<output-dir>/.gadai.lock` for the duration of a run.
///
/// The file is created with `create_new`, so a second run fails fast instead
/// of interleaving writes. Dropping the guard removes it on every exit path.
pub(crate) struct RunLock {
    path: PathBuf,
}

impl RunLock {
    pub(crate) fn acquire(output_dir: &Path) -> Result<Self, CliError> {
        std::fs::create_dir_all(output_dir).map_err(|e| {
            CliError::io(format!("cannot create {}: {}", output_dir.display(), e))
        })?;
        let path = output_dir.join(LOCK_FILE);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(CliError::new(
                EXIT_LOCKED,
                format!("another run holds {}", path.display()),
            )
            .with_hint("wait for it to finish, or delete the lock file if no run is active")),
            Err(e) => Err(CliError::io(format!("cannot create {}: {}", path.display(), e))),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[derive(Serialize)]
struct RunOutput<'a> {
    input: String,
    input_blake3: String,
    output_dir: String,
    #[serde(flatten)]
    result: &'a PipelineResult,
    files: Vec<String>,
}

pub fn cmd_run(
    config_path: Option<PathBuf>,
    input: PathBuf,
    output_dir: PathBuf,
    as_of: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let as_of = resolve_as_of(as_of.as_deref())?;
    check_input(&input)?;

    let _lock = RunLock::acquire(&output_dir)?;
    let workbook = read_workbook(&input).map_err(CliError::io)?;
    info!("read {} sheet(s) from {}", workbook.sheets.len(), input.display());

    let result = gadai_pipeline::run(&config, &workbook, as_of).map_err(CliError::pipeline)?;
    finish(&config, &input, &output_dir, &result, json)
}

pub fn cmd_process(
    file: PathBuf,
    sheet: Option<String>,
    stage: LifecycleStage,
    config_path: Option<PathBuf>,
    output_dir: PathBuf,
    as_of: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config_path.as_deref())?;
    let as_of = resolve_as_of(as_of.as_deref())?;
    check_input(&file)?;

    let _lock = RunLock::acquire(&output_dir)?;
    let table = read_sheet(&file, sheet.as_deref()).map_err(CliError::io)?;
    let result = gadai_pipeline::run_table(&config, &table, stage, as_of)
        .map_err(CliError::pipeline)?;
    finish(&config, &file, &output_dir, &result, json)
}

fn check_input(path: &Path) -> Result<(), CliError> {
    if InputFormat::from_path(path).is_none() {
        return Err(CliError::args(format!("unsupported input '{}'", path.display()))
            .with_hint("expected xlsx, xls, xlsb, ods, csv, tsv or txt"));
    }
    if !path.exists() {
        return Err(CliError::new(EXIT_IO, format!("input not found: {}", path.display())));
    }
    Ok(())
}

fn finish(
    config: &PipelineConfig,
    input: &Path,
    output_dir: &Path,
    result: &PipelineResult,
    json: bool,
) -> Result<(), CliError> {
    let written = write_reports(result, config, output_dir).map_err(CliError::io)?;
    let files: Vec<String> = written.files.iter().map(|p| p.display().to_string()).collect();

    if json {
        let input_blake3 = fingerprint(input).map_err(CliError::io)?;
        return print_json(&RunOutput {
            input: input.display().to_string(),
            input_blake3,
            output_dir: output_dir.display().to_string(),
            result,
            files,
        });
    }

    eprintln!("{} as of {}", input.display(), result.meta.as_of);
    for sheet in &result.load.sheets {
        eprintln!(
            "  sheet {:<12} {:>6} row(s)  header row {}",
            sheet.name,
            sheet.rows_kept,
            sheet.header_row + 1
        );
        if sheet.rows_missing_item_id > 0 {
            eprintln!("    dropped {} row(s) without an item id", sheet.rows_missing_item_id);
        }
    }
    for skipped in &result.load.skipped {
        eprintln!("  skipped {:<10} {}", skipped.name, skipped.reason);
    }

    let s = &result.summary;
    eprintln!(
        "{} transaction(s) from {} row(s), {} outlet(s)",
        s.total_transaksi,
        result.load.rows_loaded(),
        s.total_outlet
    );
    eprintln!(
        "  active {}  overdue {}  paid {}",
        status_count(s, TransactionStatus::Active),
        status_count(s, TransactionStatus::Overdue),
        status_count(s, TransactionStatus::Paid)
    );
    eprintln!("  high risk {} ({:.1}%)", s.transaksi_berisiko, s.persen_berisiko);
    eprintln!("wrote {} file(s) to {}", files.len(), output_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_is_exclusive_and_released_on_drop() {
        let dir = tempdir().unwrap();
        let lock = RunLock::acquire(dir.path()).unwrap();
        assert!(dir.path().join(LOCK_FILE).exists());

        let err = RunLock::acquire(dir.path()).err().unwrap();
        assert_eq!(err.code, EXIT_LOCKED);

        drop(lock);
        assert!(!dir.path().join(LOCK_FILE).exists());
        assert!(RunLock::acquire(dir.path()).is_ok());
    }

    #[test]
    fn unsupported_extension_is_usage_error() {
        let err = check_input(Path::new("report.pdf")).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
        let err = check_input(Path::new("/nonexistent/gadai.xlsx")).unwrap_err();
        assert_eq!(err.code, EXIT_IO);
    }
}
