use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::config::Thresholds;
use crate::model::{
    LifecycleStage, OutletAggregate, OutletFlag, OutletLifecycle, RiskCategory, TransactionRecord,
};

/// Which amount column feeds `total_pinjaman`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonetaryColumn {
    #[default]
    PrincipalLoaned,
    CollateralValue,
    PrincipalRepaid,
    OutstandingPrincipal,
}

impl MonetaryColumn {
    pub fn value(self, record: &TransactionRecord) -> Option<f64> {
        match self {
            Self::PrincipalLoaned => record.principal_loaned,
            Self::CollateralValue => record.collateral_value,
            Self::PrincipalRepaid => record.principal_repaid,
            Self::OutstandingPrincipal => record.outstanding_principal,
        }
    }
}

#[derive(Default)]
struct OutletTotals {
    count: usize,
    amount: f64,
    ltv_sum: f64,
    ltv_count: usize,
    high: usize,
    medium: usize,
}

/// One row per distinct outlet, sorted by the monetary total descending
/// (outlet name ascending on ties).
///
/// Nulls are skipped by the sum and excluded from the LTV mean; an outlet
/// with no LTV at all gets `rata_ltv = None`.
pub fn aggregate_by_outlet(
    records: &[TransactionRecord],
    column: MonetaryColumn,
) -> Vec<OutletAggregate> {
    let mut groups: BTreeMap<&str, OutletTotals> = BTreeMap::new();

    for record in records {
        let entry = groups.entry(record.outlet.as_str()).or_default();
        entry.count += 1;
        entry.amount += column.value(record).unwrap_or(0.0);
        if let Some(ltv) = record.loan_to_value_ratio {
            entry.ltv_sum += ltv;
            entry.ltv_count += 1;
        }
        match record.risk_category {
            Some(RiskCategory::High) => entry.high += 1,
            Some(RiskCategory::Medium) => entry.medium += 1,
            _ => {}
        }
    }

    let mut rows: Vec<OutletAggregate> = groups
        .into_iter()
        .map(|(outlet, t)| OutletAggregate {
            outlet: outlet.to_string(),
            total_transaksi: t.count,
            total_pinjaman: t.amount,
            rata_ltv: (t.ltv_count > 0).then(|| t.ltv_sum / t.ltv_count as f64),
            transaksi_berisiko: t.high,
            transaksi_sedang: t.medium,
            persen_berisiko: percent(t.high, t.count),
        })
        .collect();

    rows.sort_by(|a, b| {
        OrderedFloat(b.total_pinjaman)
            .cmp(&OrderedFloat(a.total_pinjaman))
            .then_with(|| a.outlet.cmp(&b.outlet))
    });
    rows
}

/// Share of each outlet's book sitting in the Late or Auction sheets.
///
/// Sorted by auction ratio, then late ratio (both descending), then outlet.
pub fn lifecycle_by_outlet(
    records: &[TransactionRecord],
    thresholds: &Thresholds,
) -> Vec<OutletLifecycle> {
    let mut groups: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for record in records {
        let entry = groups.entry(record.outlet.as_str()).or_default();
        entry.0 += 1;
        if record.lifecycle_stage.is_late() {
            entry.1 += 1;
        }
        if record.lifecycle_stage == LifecycleStage::Auction {
            entry.2 += 1;
        }
    }

    let mut rows: Vec<OutletLifecycle> = groups
        .into_iter()
        .map(|(outlet, (total, late, auction))| {
            let late_ratio = ratio(late, total);
            let auction_ratio = ratio(auction, total);
            let flag = if auction_ratio > thresholds.outlet_auction_ratio {
                OutletFlag::VeryRisky
            } else if late_ratio > thresholds.outlet_late_ratio {
                OutletFlag::Risky
            } else {
                OutletFlag::Normal
            };
            OutletLifecycle {
                outlet: outlet.to_string(),
                total_transaksi: total,
                total_late: late,
                total_auction: auction,
                late_ratio,
                auction_ratio,
                flag,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        OrderedFloat(b.auction_ratio)
            .cmp(&OrderedFloat(a.auction_ratio))
            .then_with(|| OrderedFloat(b.late_ratio).cmp(&OrderedFloat(a.late_ratio)))
            .then_with(|| a.outlet.cmp(&b.outlet))
    });
    rows
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn percent(part: usize, total: usize) -> f64 {
    ratio(part, total) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(
        outlet: &str,
        stage: LifecycleStage,
        loaned: Option<f64>,
        ltv: Option<f64>,
        risk: RiskCategory,
    ) -> TransactionRecord {
        let mut r = TransactionRecord::new(format!("{outlet}-{loaned:?}-{ltv:?}"), outlet, stage);
        r.principal_loaned = loaned;
        r.loan_to_value_ratio = ltv;
        r.risk_category = Some(risk);
        r
    }

    #[test]
    fn outlet_totals_and_sorting() {
        use LifecycleStage::Active;
        let records = vec![
            rec("B", Active, Some(100.0), Some(50.0), RiskCategory::High),
            rec("B", Active, Some(300.0), None, RiskCategory::Low),
            rec("A", Active, Some(1_000.0), Some(80.0), RiskCategory::Medium),
            rec("A", Active, None, Some(120.0), RiskCategory::High),
            rec("C", Active, Some(400.0), None, RiskCategory::Low),
        ];
        let rows = aggregate_by_outlet(&records, MonetaryColumn::PrincipalLoaned);
        let order: Vec<_> = rows.iter().map(|r| r.outlet.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);

        let a = &rows[0];
        assert_eq!(a.total_transaksi, 2);
        assert_eq!(a.total_pinjaman, 1_000.0);
        assert_eq!(a.rata_ltv, Some(100.0));
        assert_eq!(a.transaksi_berisiko, 1);
        assert_eq!(a.transaksi_sedang, 1);
        assert_eq!(a.persen_berisiko, 50.0);

        let b = &rows[1];
        assert_eq!(b.total_pinjaman, 400.0);
        assert_eq!(b.rata_ltv, Some(50.0));

        let c = &rows[2];
        assert_eq!(c.rata_ltv, None);
        assert_eq!(c.persen_berisiko, 0.0);
    }

    #[test]
    fn equal_totals_sort_by_outlet_name() {
        use LifecycleStage::Active;
        let records = vec![
            rec("Zeta", Active, Some(10.0), None, RiskCategory::Low),
            rec("Alpha", Active, Some(10.0), None, RiskCategory::Low),
        ];
        let rows = aggregate_by_outlet(&records, MonetaryColumn::PrincipalLoaned);
        assert_eq!(rows[0].outlet, "Alpha");
    }

    #[test]
    fn monetary_column_is_selectable() {
        let mut r = rec("A", LifecycleStage::Active, Some(10.0), None, RiskCategory::Low);
        r.collateral_value = Some(99.0);
        let rows = aggregate_by_outlet(&[r], MonetaryColumn::CollateralValue);
        assert_eq!(rows[0].total_pinjaman, 99.0);
    }

    #[test]
    fn empty_input_has_no_outlets() {
        assert!(aggregate_by_outlet(&[], MonetaryColumn::default()).is_empty());
    }

    #[test]
    fn lifecycle_ratios_and_flags() {
        use LifecycleStage::*;
        let low = RiskCategory::Low;
        let records = vec![
            rec("A", Auction, None, None, low),
            rec("A", Active, None, None, low),
            rec("B", Late, None, None, low),
            rec("B", Active, None, None, low),
            rec("B", Active, None, None, low),
            rec("C", Active, None, None, low),
        ];
        let rows = lifecycle_by_outlet(&records, &Thresholds::default());
        let order: Vec<_> = rows.iter().map(|r| r.outlet.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);

        assert_eq!(rows[0].total_late, 1);
        assert_eq!(rows[0].total_auction, 1);
        assert_eq!(rows[0].auction_ratio, 0.5);
        assert_eq!(rows[0].flag, OutletFlag::VeryRisky);

        assert!((rows[1].late_ratio - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(rows[1].flag, OutletFlag::Risky);

        assert_eq!(rows[2].flag, OutletFlag::Normal);
    }
}
