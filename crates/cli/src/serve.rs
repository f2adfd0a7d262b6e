//! Read-only commands over the persisted reports: summary, outlets,
//! transactions, score.

use std::cmp::Ordering;
use std::path::PathBuf;

use clap::ValueEnum;
use gadai_io::reports::{last_updated, load_outlets, load_transactions};
use gadai_pipeline::evidence::compute_summary;
use gadai_pipeline::model::OutletAggregate;
use gadai_pipeline::scoring::{score_records, LogisticScorer, RiskScorer, ScoredRecord};
use gadai_pipeline::{RiskSummary, TransactionRecord};
use serde::Serialize;

use crate::util::{format_rupiah, pad_left, pad_right};
use crate::{load_config, print_json, CliError};

// ============================================================================
// summary
// ============================================================================

#[derive(Serialize)]
struct SummaryOutput {
    #[serde(flatten)]
    summary: RiskSummary,
    last_updated: String,
}

pub fn cmd_summary(config: Option<PathBuf>, output_dir: PathBuf) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let records = load_transactions(&output_dir, &config.output).map_err(CliError::report)?;
    let last_updated = last_updated(&output_dir, &config.output).map_err(CliError::report)?;
    print_json(&SummaryOutput {
        summary: compute_summary(&records),
        last_updated,
    })
}

// ============================================================================
// outlets
// ============================================================================

/// Numeric columns of the outlet table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum OutletSort {
    TotalTransaksi,
    TotalPinjaman,
    RataLtv,
    TransaksiBerisiko,
    TransaksiSedang,
    PersenBerisiko,
}

impl OutletSort {
    fn key(self, row: &OutletAggregate) -> Option<f64> {
        match self {
            Self::TotalTransaksi => Some(row.total_transaksi as f64),
            Self::TotalPinjaman => Some(row.total_pinjaman),
            Self::RataLtv => row.rata_ltv,
            Self::TransaksiBerisiko => Some(row.transaksi_berisiko as f64),
            Self::TransaksiSedang => Some(row.transaksi_sedang as f64),
            Self::PersenBerisiko => Some(row.persen_berisiko),
        }
    }
}

/// Stable descending sort; rows without a value go last.
pub(crate) fn sort_outlets(rows: &mut [OutletAggregate], by: OutletSort) {
    rows.sort_by(|a, b| match (by.key(a), by.key(b)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn cmd_outlets(
    config: Option<PathBuf>,
    output_dir: PathBuf,
    top: Option<usize>,
    sort: Option<OutletSort>,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let mut rows = load_outlets(&output_dir, &config.output).map_err(CliError::report)?;
    if let Some(by) = sort {
        sort_outlets(&mut rows, by);
    }
    if let Some(n) = top {
        rows.truncate(n);
    }
    print_json(&rows)
}

// ============================================================================
// transactions
// ============================================================================

#[derive(Debug, Serialize)]
pub(crate) struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

/// 1-based page of `rows`; a page past the end is empty.
pub(crate) fn paginate<T>(rows: Vec<T>, page: u64, per_page: u64) -> Page<T> {
    let total = rows.len() as u64;
    let per_page = per_page.max(1);
    let page = page.max(1);
    let skip = (page - 1).saturating_mul(per_page);
    let data = rows
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(per_page as usize)
        .collect();
    Page {
        data,
        page,
        per_page,
        total,
        total_pages: total.div_ceil(per_page),
    }
}

pub fn cmd_transactions(
    config: Option<PathBuf>,
    output_dir: PathBuf,
    page: u64,
    per_page: u64,
    outlet: Option<String>,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let mut records = load_transactions(&output_dir, &config.output).map_err(CliError::report)?;
    if let Some(outlet) = outlet {
        let wanted = outlet.trim().to_lowercase();
        records.retain(|r| r.outlet.to_lowercase() == wanted);
    }
    print_json(&paginate(records, page, per_page))
}

// ============================================================================
// score
// ============================================================================

#[derive(Serialize)]
struct ScoreOutput<'a> {
    scorer: &'a str,
    model: &'a LogisticScorer,
    scored: usize,
    top: &'a [ScoredRecord],
}

pub fn cmd_score(
    config: Option<PathBuf>,
    output_dir: PathBuf,
    top: usize,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let records: Vec<TransactionRecord> =
        load_transactions(&output_dir, &config.output).map_err(CliError::report)?;

    let scorer = LogisticScorer::fit(&records).ok_or_else(|| {
        CliError::general("nothing to score: no transaction has LTV, holding days or outstanding share")
    })?;
    let scored = score_records(&scorer, &records);
    let shown = &scored[..top.min(scored.len())];

    if json {
        return print_json(&ScoreOutput {
            scorer: scorer.name(),
            model: &scorer,
            scored: scored.len(),
            top: shown,
        });
    }

    eprintln!("{} scored {} of {} transaction(s)", scorer.name(), scored.len(), records.len());
    println!(
        "{}  {}  {}  {}",
        pad_right("ITEM", 20),
        pad_right("OUTLET", 20),
        pad_left("SCORE", 6),
        "LEVEL"
    );
    for s in shown {
        println!(
            "{}  {}  {}  {}",
            pad_right(&s.item_id, 20),
            pad_right(&s.outlet, 20),
            pad_left(&format!("{:.1}", s.score), 6),
            s.level
        );
    }
    let exposure: f64 = records
        .iter()
        .filter(|r| shown.iter().any(|s| s.item_id == r.item_id))
        .filter_map(|r| r.principal_loaned)
        .sum();
    eprintln!("principal in the top {}: Rp {}", shown.len(), format_rupiah(exposure));
    Ok(())
}
