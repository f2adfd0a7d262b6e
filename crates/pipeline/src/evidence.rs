use std::collections::{BTreeMap, BTreeSet};

use crate::model::{RiskCategory, RiskSummary, TransactionRecord, TransactionStatus};

/// Compute portfolio counts from classified records.
pub fn compute_summary(records: &[TransactionRecord]) -> RiskSummary {
    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut risiko_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut outlets = BTreeSet::new();
    let mut high = 0;

    for r in records {
        outlets.insert(r.outlet.as_str());
        if let Some(status) = r.transaction_status {
            *status_counts.entry(status.to_string()).or_insert(0) += 1;
        }
        if let Some(risk) = r.risk_category {
            *risiko_counts.entry(risk.to_string()).or_insert(0) += 1;
            if risk == RiskCategory::High {
                high += 1;
            }
        }
    }

    RiskSummary {
        total_transaksi: records.len(),
        total_outlet: outlets.len(),
        transaksi_berisiko: high,
        persen_berisiko: round1(pct(high, records.len())),
        status_counts,
        risiko_counts,
    }
}

/// Count of records in `status`, zero when absent.
pub fn status_count(summary: &RiskSummary, status: TransactionStatus) -> usize {
    summary
        .status_counts
        .get(&status.to_string())
        .copied()
        .unwrap_or(0)
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LifecycleStage;

    fn result(outlet: &str, status: TransactionStatus, risk: RiskCategory) -> TransactionRecord {
        let mut r = TransactionRecord::new("x", outlet, LifecycleStage::Active);
        r.transaction_status = Some(status);
        r.risk_category = Some(risk);
        r
    }

    #[test]
    fn summary_counts() {
        let records = vec![
            result("A", TransactionStatus::Overdue, RiskCategory::High),
            result("A", TransactionStatus::Active, RiskCategory::Medium),
            result("B", TransactionStatus::Paid, RiskCategory::Low),
        ];
        let summary = compute_summary(&records);
        assert_eq!(summary.total_transaksi, 3);
        assert_eq!(summary.total_outlet, 2);
        assert_eq!(summary.transaksi_berisiko, 1);
        assert_eq!(summary.persen_berisiko, 33.3);
        assert_eq!(summary.status_counts["overdue"], 1);
        assert_eq!(summary.risiko_counts["medium"], 1);
        assert_eq!(status_count(&summary, TransactionStatus::Paid), 1);
    }

    #[test]
    fn empty_summary_is_zero() {
        let summary = compute_summary(&[]);
        assert_eq!(summary.total_transaksi, 0);
        assert_eq!(summary.persen_berisiko, 0.0);
        assert!(summary.status_counts.is_empty());
    }
}
