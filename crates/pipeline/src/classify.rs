use chrono::NaiveDate;

use crate::config::Thresholds;
use crate::model::{RiskCategory, TransactionRecord, TransactionStatus};

/// Status cascade, first match wins:
/// 1. outstanding ≤ 0 → paid
/// 2. due date strictly before `as_of` → overdue
/// 3. otherwise → active (including unknown outstanding)
pub fn transaction_status(record: &TransactionRecord, as_of: NaiveDate) -> TransactionStatus {
    match record.outstanding_principal {
        Some(outstanding) if outstanding <= 0.0 => TransactionStatus::Paid,
        Some(_) if record.due_date.is_some_and(|due| due < as_of) => TransactionStatus::Overdue,
        _ => TransactionStatus::Active,
    }
}

/// Risk cascade over a known status, first match wins:
/// 1. overdue → high
/// 2. LTV above `ltv_high_pct` → high
/// 3. active, outstanding share above `outstanding_medium_pct` and held
///    longer than `holding_days_medium` → medium
/// 4. otherwise → low
///
/// An undefined operand never satisfies its condition.
pub fn risk_category(
    record: &TransactionRecord,
    status: TransactionStatus,
    thresholds: &Thresholds,
) -> RiskCategory {
    if status == TransactionStatus::Overdue {
        return RiskCategory::High;
    }
    if record
        .loan_to_value_ratio
        .is_some_and(|ltv| ltv > thresholds.ltv_high_pct)
    {
        return RiskCategory::High;
    }
    if status == TransactionStatus::Active
        && outstanding_share_pct(record).is_some_and(|s| s > thresholds.outstanding_medium_pct)
        && record
            .holding_days
            .is_some_and(|d| d > thresholds.holding_days_medium)
    {
        return RiskCategory::Medium;
    }
    RiskCategory::Low
}

/// Outstanding principal as a percent of collateral; `None` unless
/// collateral is positive.
pub fn outstanding_share_pct(record: &TransactionRecord) -> Option<f64> {
    let collateral = record.collateral_value.filter(|c| *c > 0.0)?;
    let pct = record.outstanding_principal? / collateral * 100.0;
    pct.is_finite().then_some(pct)
}

pub fn classify(record: &mut TransactionRecord, as_of: NaiveDate, thresholds: &Thresholds) {
    let status = transaction_status(record, as_of);
    record.risk_category = Some(risk_category(record, status, thresholds));
    record.transaction_status = Some(status);
}

/// `as_of` is fixed for the whole batch so every record sees the same day.
pub fn classify_all(records: &mut [TransactionRecord], as_of: NaiveDate, thresholds: &Thresholds) {
    for record in records.iter_mut() {
        classify(record, as_of, thresholds);
    }
}
