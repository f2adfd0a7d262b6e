//! Optional probabilistic risk scoring over the classified table.
//!
//! Scorers only read records; the rule-based classifier never consults them.

use ordered_float::OrderedFloat;
use serde::Serialize;

use crate::classify::outstanding_share_pct;
use crate::model::{RiskCategory, TransactionRecord};

/// Score in 0–100; `None` when the record has nothing to score on.
pub trait RiskScorer {
    fn name(&self) -> &str;
    fn score(&self, record: &TransactionRecord) -> Option<f64>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecord {
    pub item_id: String,
    pub outlet: String,
    pub score: f64,
    pub level: RiskCategory,
}

pub fn score_level(score: f64) -> RiskCategory {
    if score < 30.0 {
        RiskCategory::Low
    } else if score < 70.0 {
        RiskCategory::Medium
    } else {
        RiskCategory::High
    }
}

/// Score every record, highest first (item_id ascending on ties).
pub fn score_records(scorer: &dyn RiskScorer, records: &[TransactionRecord]) -> Vec<ScoredRecord> {
    let mut scored: Vec<ScoredRecord> = records
        .iter()
        .filter_map(|r| {
            let score = scorer.score(r)?;
            Some(ScoredRecord {
                item_id: r.item_id.clone(),
                outlet: r.outlet.clone(),
                score,
                level: score_level(score),
            })
        })
        .collect();
    scored.sort_by(|a, b| {
        OrderedFloat(b.score)
            .cmp(&OrderedFloat(a.score))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    scored
}

// ---------------------------------------------------------------------------
// Logistic regression
// ---------------------------------------------------------------------------

const FEATURES: usize = 3;
const EPOCHS: usize = 500;
const LEARNING_RATE: f64 = 0.5;

fn features(record: &TransactionRecord) -> [Option<f64>; FEATURES] {
    [
        record.loan_to_value_ratio,
        record.holding_days.map(|d| d as f64),
        outstanding_share_pct(record),
    ]
}

/// Logistic model of "classified high risk" over LTV, holding days and
/// outstanding share. Fitted by full-batch gradient descent from zero
/// weights, so the same table always yields the same model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticScorer {
    means: [f64; FEATURES],
    scales: [f64; FEATURES],
    weights: [f64; FEATURES],
    bias: f64,
}

impl LogisticScorer {
    /// `None` when no record carries any feature.
    pub fn fit(records: &[TransactionRecord]) -> Option<Self> {
        let rows: Vec<([Option<f64>; FEATURES], f64)> = records
            .iter()
            .map(|r| (features(r), if r.is_high_risk() { 1.0 } else { 0.0 }))
            .filter(|(x, _)| x.iter().any(Option::is_some))
            .collect();
        if rows.is_empty() {
            return None;
        }

        let mut means = [0.0; FEATURES];
        let mut scales = [1.0; FEATURES];
        for j in 0..FEATURES {
            let values: Vec<f64> = rows.iter().filter_map(|(x, _)| x[j]).collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            means[j] = mean;
            if var > 0.0 {
                scales[j] = var.sqrt();
            }
        }

        let mut model = Self {
            means,
            scales,
            weights: [0.0; FEATURES],
            bias: 0.0,
        };
        let xs: Vec<[f64; FEATURES]> = rows.iter().map(|(x, _)| model.standardize(x)).collect();
        let n = rows.len() as f64;

        for _ in 0..EPOCHS {
            let mut grad_w = [0.0; FEATURES];
            let mut grad_b = 0.0;
            for (x, (_, y)) in xs.iter().zip(&rows) {
                let err = model.probability(x) - y;
                for j in 0..FEATURES {
                    grad_w[j] += err * x[j];
                }
                grad_b += err;
            }
            for j in 0..FEATURES {
                model.weights[j] -= LEARNING_RATE * grad_w[j] / n;
            }
            model.bias -= LEARNING_RATE * grad_b / n;
        }
        Some(model)
    }

    /// Missing features are imputed with the training mean (zero after
    /// standardization).
    fn standardize(&self, x: &[Option<f64>; FEATURES]) -> [f64; FEATURES] {
        let mut out = [0.0; FEATURES];
        for j in 0..FEATURES {
            if let Some(v) = x[j] {
                out[j] = (v - self.means[j]) / self.scales[j];
            }
        }
        out
    }

    fn probability(&self, x: &[f64; FEATURES]) -> f64 {
        let z: f64 = self.bias + self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>();
        1.0 / (1.0 + (-z).exp())
    }
}

impl RiskScorer for LogisticScorer {
    fn name(&self) -> &str {
        "logistic"
    }

    fn score(&self, record: &TransactionRecord) -> Option<f64> {
        let x = features(record);
        if x.iter().all(Option::is_none) {
            return None;
        }
        Some(self.probability(&self.standardize(&x)) * 100.0)
    }
}
