use crate::model::TransactionRecord;

/// Fill `holding_days`, `outstanding_principal` and `loan_to_value_ratio`
/// from the raw columns. Null inputs give null outputs.
pub fn derive_features(record: &mut TransactionRecord) {
    record.holding_days = match (record.pawn_date, record.due_date) {
        (Some(pawn), Some(due)) => Some((due - pawn).num_days()),
        _ => None,
    };
    record.outstanding_principal = match (record.collateral_value, record.principal_repaid) {
        (Some(collateral), Some(repaid)) => Some(collateral - repaid),
        _ => None,
    };
    record.loan_to_value_ratio = loan_to_value_pct(record.principal_loaned, record.collateral_value);
}

pub fn derive_all(records: &mut [TransactionRecord]) {
    records.iter_mut().for_each(derive_features);
}

/// Principal over collateral, in percent. `None` when an operand is
/// missing or the quotient is not finite (zero collateral).
pub fn loan_to_value_pct(principal: Option<f64>, collateral: Option<f64>) -> Option<f64> {
    let pct = principal? / collateral? * 100.0;
    pct.is_finite().then_some(pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LifecycleStage;
    use chrono::NaiveDate;

    fn record() -> TransactionRecord {
        let mut r = TransactionRecord::new("1", "A", LifecycleStage::Active);
        r.pawn_date = NaiveDate::from_ymd_opt(2025, 1, 1);
        r.due_date = NaiveDate::from_ymd_opt(2025, 7, 20);
        r.principal_loaned = Some(900_001.0);
        r.collateral_value = Some(1_000_000.0);
        r.principal_repaid = Some(0.0);
        r
    }

    #[test]
    fn derives_all_three_features() {
        let mut r = record();
        derive_features(&mut r);
        assert_eq!(r.holding_days, Some(200));
        assert_eq!(r.outstanding_principal, Some(1_000_000.0));
        let ltv = r.loan_to_value_ratio.unwrap();
        assert!((ltv - 90.0001).abs() < 1e-9);
    }

    #[test]
    fn inconsistent_dates_give_negative_days() {
        let mut r = record();
        r.due_date = NaiveDate::from_ymd_opt(2024, 12, 30);
        derive_features(&mut r);
        assert_eq!(r.holding_days, Some(-2));
    }

    #[test]
    fn nulls_propagate() {
        let mut r = record();
        r.pawn_date = None;
        r.principal_repaid = None;
        r.principal_loaned = None;
        derive_features(&mut r);
        assert_eq!(r.holding_days, None);
        assert_eq!(r.outstanding_principal, None);
        assert_eq!(r.loan_to_value_ratio, None);
    }

    #[test]
    fn zero_collateral_is_undefined_ltv() {
        assert_eq!(loan_to_value_pct(Some(5.0), Some(0.0)), None);
        assert_eq!(loan_to_value_pct(Some(0.0), Some(0.0)), None);
        assert_eq!(loan_to_value_pct(Some(50.0), Some(200.0)), Some(25.0));
    }

    #[test]
    fn recomputation_is_idempotent() {
        let mut r = record();
        derive_features(&mut r);
        let first = r.clone();
        derive_features(&mut r);
        assert_eq!(r, first);
    }
}
