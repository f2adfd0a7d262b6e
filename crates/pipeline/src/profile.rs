use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::fields;
use crate::model::TransactionRecord;

const TOP_DUPLICATES: usize = 10;

/// Validation view of the unified table, taken before dedup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetProfile {
    pub rows: usize,
    pub stage_counts: BTreeMap<String, usize>,
    /// Canonical column → number of null cells.
    pub null_counts: BTreeMap<String, usize>,
    pub distinct_item_ids: usize,
    pub distinct_outlets: usize,
    pub pawn_date_min: Option<NaiveDate>,
    pub pawn_date_max: Option<NaiveDate>,
    /// Most repeated item ids with their occurrence counts.
    pub duplicated_item_ids: Vec<(String, usize)>,
}

pub fn profile(records: &[TransactionRecord]) -> DatasetProfile {
    let mut stage_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut null_counts: BTreeMap<String, usize> = [
        fields::PAWN_DATE,
        fields::DUE_DATE,
        fields::PRINCIPAL_LOANED,
        fields::COLLATERAL_VALUE,
        fields::PRINCIPAL_REPAID,
    ]
    .iter()
    .map(|f| (f.to_string(), 0))
    .collect();
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    let mut outlets = BTreeSet::new();

    for r in records {
        *stage_counts.entry(r.lifecycle_stage.to_string()).or_insert(0) += 1;
        *occurrences.entry(r.item_id.as_str()).or_insert(0) += 1;
        outlets.insert(r.outlet.as_str());

        let nulls = [
            (fields::PAWN_DATE, r.pawn_date.is_none()),
            (fields::DUE_DATE, r.due_date.is_none()),
            (fields::PRINCIPAL_LOANED, r.principal_loaned.is_none()),
            (fields::COLLATERAL_VALUE, r.collateral_value.is_none()),
            (fields::PRINCIPAL_REPAID, r.principal_repaid.is_none()),
        ];
        for (field, is_null) in nulls {
            if is_null {
                *null_counts.entry(field.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut duplicated: Vec<(String, usize)> = occurrences
        .iter()
        .filter(|&(_, &n)| n > 1)
        .map(|(id, &n)| (id.to_string(), n))
        .collect();
    duplicated.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    duplicated.truncate(TOP_DUPLICATES);

    DatasetProfile {
        rows: records.len(),
        stage_counts,
        null_counts,
        distinct_item_ids: occurrences.len(),
        distinct_outlets: outlets.len(),
        pawn_date_min: records.iter().filter_map(|r| r.pawn_date).min(),
        pawn_date_max: records.iter().filter_map(|r| r.pawn_date).max(),
        duplicated_item_ids: duplicated,
    }
}
