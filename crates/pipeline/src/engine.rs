use chrono::NaiveDate;
use log::info;

use crate::aggregate::{aggregate_by_outlet, lifecycle_by_outlet, MonetaryColumn};
use crate::classify::classify_all;
use crate::config::PipelineConfig;
use crate::dedupe::deduplicate;
use crate::error::PipelineError;
use crate::evidence::compute_summary;
use crate::features::derive_all;
use crate::loader::{load_sheet, load_workbook};
use crate::model::{
    LifecycleStage, LoadReport, PipelineResult, RawSheet, RawWorkbook, RunMeta, SkipReason,
    TransactionRecord,
};

/// Run the full pipeline over a pre-loaded workbook.
///
/// `as_of` is the "now" used for overdue detection, fixed for the run.
pub fn run(
    config: &PipelineConfig,
    workbook: &RawWorkbook,
    as_of: NaiveDate,
) -> Result<PipelineResult, PipelineError> {
    let table = load_workbook(config, workbook)?;
    Ok(finish(config, table.records, table.report, as_of))
}

/// Run the pipeline over one flat table tagged with `stage`.
///
/// Unlike the multi-sheet path, a missing required field is fatal here.
pub fn run_table(
    config: &PipelineConfig,
    sheet: &RawSheet,
    stage: LifecycleStage,
    as_of: NaiveDate,
) -> Result<PipelineResult, PipelineError> {
    let (records, load) = load_sheet(config, sheet, stage).map_err(|reason| match reason {
        SkipReason::MissingFields { fields } => PipelineError::MissingFields {
            sheet: sheet.name.clone(),
            fields,
        },
        SkipReason::Empty | SkipReason::NotInWorkbook => PipelineError::EmptyTable {
            sheet: sheet.name.clone(),
        },
    })?;
    let report = LoadReport {
        sheets: vec![load],
        skipped: Vec::new(),
    };
    Ok(finish(config, records, report, as_of))
}

fn finish(
    config: &PipelineConfig,
    master: Vec<TransactionRecord>,
    load: LoadReport,
    as_of: NaiveDate,
) -> PipelineResult {
    let mut transactions = deduplicate(master.clone(), &config.priority);
    info!(
        "dedup: {} row(s) -> {} unique item(s)",
        master.len(),
        transactions.len()
    );

    derive_all(&mut transactions);
    classify_all(&mut transactions, as_of, &config.thresholds);

    let summary = compute_summary(&transactions);
    let outlets = aggregate_by_outlet(&transactions, MonetaryColumn::PrincipalLoaned);
    let outlet_lifecycle = lifecycle_by_outlet(&transactions, &config.thresholds);
    info!(
        "classified {} transaction(s) across {} outlet(s), {} high risk",
        summary.total_transaksi, summary.total_outlet, summary.transaksi_berisiko
    );

    PipelineResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            as_of,
        },
        load,
        master,
        transactions,
        summary,
        outlets,
        outlet_lifecycle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RiskCategory, TransactionStatus};

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    const HEADER: &[&str] = &[
        "No", "Outlet", "Tgl Gadai", "Tgl JT", "IMEI", "Pinjaman", "Taksiran", "Terbayar",
    ];

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn run_table_classifies_and_aggregates() {
        let sheet = RawSheet::new(
            "upload.csv",
            grid(&[
                HEADER,
                &["1", "A", "2025-01-01", "2025-05-01", "111", "500", "1000", "0"],
                &["2", "A", "2025-01-01", "2025-12-01", "222", "500", "1000", "1000"],
                &["3", "B", "2025-05-01", "2025-08-01", "333", "1200", "1000", "0"],
            ]),
        );
        let result = run_table(&PipelineConfig::default(), &sheet, LifecycleStage::Active, as_of()).unwrap();
        assert_eq!(result.transactions.len(), 3);
        assert_eq!(result.transactions[0].transaction_status, Some(TransactionStatus::Overdue));
        assert_eq!(result.transactions[1].transaction_status, Some(TransactionStatus::Paid));
        assert_eq!(result.transactions[2].risk_category, Some(RiskCategory::High));
        assert_eq!(result.summary.transaksi_berisiko, 2);
        assert_eq!(result.outlets[0].outlet, "B");
        assert_eq!(result.outlets[0].total_pinjaman, 1200.0);
        assert_eq!(result.meta.as_of, as_of());
    }

    #[test]
    fn run_table_missing_fields_is_fatal() {
        let sheet = RawSheet::new("upload.csv", grid(&[&["No", "IMEI", "Tanggal", "Outlet"]]));
        let err = run_table(&PipelineConfig::default(), &sheet, LifecycleStage::Active, as_of()).unwrap_err();
        match err {
            PipelineError::MissingFields { sheet, fields } => {
                assert_eq!(sheet, "upload.csv");
                assert_eq!(
                    fields,
                    vec!["due_date", "principal_loaned", "collateral_value", "principal_repaid"]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn run_table_rejects_empty_sheet() {
        let sheet = RawSheet::new("empty.csv", Vec::new());
        let err = run_table(&PipelineConfig::default(), &sheet, LifecycleStage::Active, as_of()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyTable { .. }));
    }
}
