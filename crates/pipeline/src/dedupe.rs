use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::config::StagePriority;
use crate::model::TransactionRecord;

/// Collapse records sharing an `item_id` to the most advanced one.
///
/// Order: item_id ascending, stage priority descending, pawn_date
/// descending with missing dates last. The sort is stable, so input order
/// breaks any remaining tie. The first record of each item_id is kept and
/// the output stays ordered by item_id.
pub fn deduplicate(
    mut records: Vec<TransactionRecord>,
    priority: &StagePriority,
) -> Vec<TransactionRecord> {
    records.sort_by(|a, b| {
        a.item_id
            .cmp(&b.item_id)
            .then_with(|| {
                priority
                    .of(b.lifecycle_stage)
                    .cmp(&priority.of(a.lifecycle_stage))
            })
            .then_with(|| newest_first(a.pawn_date, b.pawn_date))
    });
    records.dedup_by(|later, kept| later.item_id == kept.item_id);
    records
}

fn newest_first(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
