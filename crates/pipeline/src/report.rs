//! Plain-text summary report. Pure rendering: every figure comes from the
//! summary and the outlet table.

use std::fmt;

use ordered_float::OrderedFloat;
use unicode_width::UnicodeWidthStr;

use crate::config::Thresholds;
use crate::evidence::pct;
use crate::model::{OutletAggregate, RiskCategory, RiskSummary, RunMeta, TransactionStatus};

const TOP_OUTLETS: usize = 10;
const OUTLET_WIDTH: usize = 30;

/// The `summary.txt` document. Rendered through [`fmt::Display`].
pub struct SummaryReport<'a> {
    pub meta: &'a RunMeta,
    pub summary: &'a RiskSummary,
    pub outlets: &'a [OutletAggregate],
    pub thresholds: &'a Thresholds,
}

pub fn render_summary(
    meta: &RunMeta,
    summary: &RiskSummary,
    outlets: &[OutletAggregate],
    thresholds: &Thresholds,
) -> String {
    SummaryReport {
        meta,
        summary,
        outlets,
        thresholds,
    }
    .to_string()
}

/// Left-align `name` to `width` terminal columns.
fn pad_name(name: &str, width: usize) -> String {
    let w = name.width();
    if w >= width {
        name.to_string()
    } else {
        format!("{}{}", name, " ".repeat(width - w))
    }
}

fn ranked<'o>(
    outlets: &'o [OutletAggregate],
    key: impl Fn(&OutletAggregate) -> f64,
) -> Vec<&'o OutletAggregate> {
    let mut sorted: Vec<&OutletAggregate> = outlets.iter().collect();
    sorted.sort_by(|a, b| {
        OrderedFloat(key(b))
            .cmp(&OrderedFloat(key(a)))
            .then_with(|| a.outlet.cmp(&b.outlet))
    });
    sorted.truncate(TOP_OUTLETS);
    sorted
}

impl SummaryReport<'_> {
    fn share_line(&self, f: &mut fmt::Formatter<'_>, label: &str, n: usize) -> fmt::Result {
        writeln!(
            f,
            "  {:<10} {:>8}  {:>5.1}%",
            label,
            n,
            pct(n, self.summary.total_transaksi)
        )
    }
}

impl fmt::Display for SummaryReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        let rule = "=".repeat(60);

        writeln!(f, "{rule}")?;
        writeln!(f, "GADAI RISK SUMMARY: {}", self.meta.config_name)?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Generated : {}", self.meta.run_at)?;
        writeln!(f, "As of     : {}", self.meta.as_of)?;
        writeln!(f, "Transactions: {}", summary.total_transaksi)?;
        writeln!(f, "Outlets     : {}", summary.total_outlet)?;
        writeln!(
            f,
            "High risk   : {} ({:.1}%)",
            summary.transaksi_berisiko, summary.persen_berisiko
        )?;

        writeln!(f, "\nTransaction status")?;
        for status in [
            TransactionStatus::Active,
            TransactionStatus::Paid,
            TransactionStatus::Overdue,
        ] {
            let label = status.to_string();
            let n = summary.status_counts.get(&label).copied().unwrap_or(0);
            self.share_line(f, &label, n)?;
        }

        writeln!(f, "\nRisk category")?;
        for risk in [RiskCategory::High, RiskCategory::Medium, RiskCategory::Low] {
            let label = risk.to_string();
            let n = summary.risiko_counts.get(&label).copied().unwrap_or(0);
            self.share_line(f, &label, n)?;
        }

        writeln!(f, "\nTop {TOP_OUTLETS} outlets by total principal")?;
        for (i, o) in ranked(self.outlets, |o| o.total_pinjaman).iter().enumerate() {
            writeln!(
                f,
                "  {:>2}. {} {:>18.0}  ({} trx)",
                i + 1,
                pad_name(&o.outlet, OUTLET_WIDTH),
                o.total_pinjaman,
                o.total_transaksi
            )?;
        }

        writeln!(f, "\nTop {TOP_OUTLETS} outlets by high-risk share")?;
        for (i, o) in ranked(self.outlets, |o| o.persen_berisiko).iter().enumerate() {
            writeln!(
                f,
                "  {:>2}. {} {:>5.1}%  ({}/{} trx)",
                i + 1,
                pad_name(&o.outlet, OUTLET_WIDTH),
                o.persen_berisiko,
                o.transaksi_berisiko,
                o.total_transaksi
            )?;
        }

        let t = self.thresholds;
        writeln!(f, "\nRules")?;
        writeln!(f, "  high   : overdue, or LTV > {}%", t.ltv_high_pct)?;
        writeln!(
            f,
            "  medium : active, outstanding > {}% of collateral, held > {} days",
            t.outstanding_medium_pct, t.holding_days_medium
        )?;
        writeln!(f, "  low    : everything else")
    }
}
