// Persisted report set: the files a run leaves in the output directory and
// the readers the serving commands use.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use gadai_pipeline::config::OutputConfig;
use gadai_pipeline::model::{LifecycleStage, OutletAggregate};
use gadai_pipeline::report::render_summary;
use gadai_pipeline::{PipelineConfig, PipelineResult, TransactionRecord};
use log::info;
use serde::Serialize;

use crate::csv::{read_table, write_table};
use crate::fs::atomic_write;
use crate::xlsx::export_transactions;

/// Raw columns only: the deduplicated table before enrichment.
#[derive(Serialize)]
struct MasterRow<'a> {
    item_id: &'a str,
    outlet: &'a str,
    lifecycle_stage: LifecycleStage,
    pawn_date: Option<NaiveDate>,
    due_date: Option<NaiveDate>,
    principal_loaned: Option<f64>,
    collateral_value: Option<f64>,
    principal_repaid: Option<f64>,
    company: Option<&'a str>,
    area: Option<&'a str>,
    sbg: Option<&'a str>,
    product: Option<&'a str>,
}

impl<'a> From<&'a TransactionRecord> for MasterRow<'a> {
    fn from(r: &'a TransactionRecord) -> Self {
        Self {
            item_id: &r.item_id,
            outlet: &r.outlet,
            lifecycle_stage: r.lifecycle_stage,
            pawn_date: r.pawn_date,
            due_date: r.due_date,
            principal_loaned: r.principal_loaned,
            collateral_value: r.collateral_value,
            principal_repaid: r.principal_repaid,
            company: r.company.as_deref(),
            area: r.area.as_deref(),
            sbg: r.sbg.as_deref(),
            product: r.product.as_deref(),
        }
    }
}

/// Paths written by [`write_reports`], in write order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WrittenReports {
    pub files: Vec<PathBuf>,
}

/// Write every configured output of `result` into `dir`. Each file is
/// replaced atomically; the transaction table goes last so a reader that
/// sees it also sees the rest.
pub fn write_reports(
    result: &PipelineResult,
    config: &PipelineConfig,
    dir: &Path,
) -> Result<WrittenReports, String> {
    std::fs::create_dir_all(dir)
        .map_err(|e| format!("cannot create {}: {}", dir.display(), e))?;
    let out = &config.output;
    let mut written = WrittenReports::default();
    let mut record = |path: PathBuf| {
        info!("wrote {}", path.display());
        written.files.push(path);
    };

    let path = dir.join(&out.master_dataset);
    let master: Vec<MasterRow> = result.master.iter().map(MasterRow::from).collect();
    write_table(&master, &path)?;
    record(path);

    let path = dir.join(&out.master_transactions);
    let deduped: Vec<MasterRow> = result.transactions.iter().map(MasterRow::from).collect();
    write_table(&deduped, &path)?;
    record(path);

    let path = dir.join(&out.outlets);
    write_table(&result.outlets, &path)?;
    record(path);

    let path = dir.join(&out.outlet_lifecycle);
    write_table(&result.outlet_lifecycle, &path)?;
    record(path);

    let path = dir.join(&out.summary);
    let text = render_summary(&result.meta, &result.summary, &result.outlets, &config.thresholds);
    atomic_write(&path, text.as_bytes())?;
    record(path);

    if let Some(name) = &out.master_xlsx {
        let path = dir.join(name);
        let tmp = crate::fs::tmp_path_for(&path).with_extension("xlsx");
        export_transactions(&result.transactions, "master", &tmp)?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| format!("failed to rename tmp to {}: {}", path.display(), e))?;
        record(path);
    }

    let path = dir.join(&out.transactions);
    write_table(&result.transactions, &path)?;
    record(path);

    Ok(written)
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

pub fn transactions_path(dir: &Path, output: &OutputConfig) -> PathBuf {
    dir.join(&output.transactions)
}

pub fn load_transactions(dir: &Path, output: &OutputConfig) -> Result<Vec<TransactionRecord>, String> {
    read_table(&transactions_path(dir, output))
}

pub fn load_outlets(dir: &Path, output: &OutputConfig) -> Result<Vec<OutletAggregate>, String> {
    read_table(&dir.join(&output.outlets))
}

/// Modification time of the transaction table, RFC 3339.
pub fn last_updated(dir: &Path, output: &OutputConfig) -> Result<String, String> {
    let path = transactions_path(dir, output);
    let modified = std::fs::metadata(&path)
        .and_then(|m| m.modified())
        .map_err(|e| format!("cannot stat {}: {}", path.display(), e))?;
    Ok(chrono::DateTime::<chrono::Utc>::from(modified).to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadai_pipeline::{run, RawSheet, RawWorkbook};
    use tempfile::tempdir;

    fn result() -> (PipelineConfig, PipelineResult) {
        let grid: Vec<Vec<String>> = [
            ["No", "Outlet", "Tanggal Gadai", "Jatuh Tempo", "IMEI", "Pinjaman", "Taksiran", "Terbayar"],
            ["1", "Depok", "2025-01-01", "2025-02-01", "111", "500", "1000", "0"],
            ["2", "Bogor", "2025-05-01", "2025-08-01", "222", "1500", "1000", "0"],
        ]
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
        let mut config = PipelineConfig::default();
        config.output.master_xlsx = Some("master.xlsx".into());
        let workbook = RawWorkbook {
            sheets: vec![
                RawSheet::new("Active", grid.clone()),
                RawSheet::new("Late", grid),
            ],
        };
        let result = run(&config, &workbook, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()).unwrap();
        (config, result)
    }

    #[test]
    fn test_write_then_load_reports() {
        let dir = tempdir().unwrap();
        let (config, result) = result();

        let written = write_reports(&result, &config, dir.path()).unwrap();
        assert_eq!(written.files.len(), 7);
        assert!(written.files.last().unwrap().ends_with("gadai_processed.csv"));
        for f in &written.files {
            assert!(f.exists(), "{} missing", f.display());
        }

        let transactions = load_transactions(dir.path(), &config.output).unwrap();
        assert_eq!(transactions, result.transactions);
        let outlets = load_outlets(dir.path(), &config.output).unwrap();
        assert_eq!(outlets, result.outlets);

        let master = std::fs::read_to_string(dir.path().join("gadai_master_dataset.csv")).unwrap();
        assert_eq!(master.lines().count(), 5);
        assert!(master.starts_with("item_id,outlet,lifecycle_stage,pawn_date"));
        assert!(!master.lines().next().unwrap().contains("risk_category"));

        let summary = std::fs::read_to_string(dir.path().join("summary.txt")).unwrap();
        assert!(summary.contains("Transactions: 2"));

        assert!(last_updated(dir.path(), &config.output).is_ok());
    }

    #[test]
    fn test_load_missing_report_fails() {
        let dir = tempdir().unwrap();
        let err = load_transactions(dir.path(), &OutputConfig::default()).unwrap_err();
        assert!(err.contains("gadai_processed.csv"), "{err}");
    }
}
