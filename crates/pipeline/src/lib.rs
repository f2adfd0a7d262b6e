//! `gadai-pipeline`: pawn-loan normalization, dedup and risk engine.
//!
//! Pure engine crate: receives pre-loaded sheet grids, returns the canonical
//! transaction table and outlet aggregates. No CLI or IO dependencies.

pub mod aggregate;
pub mod classify;
pub mod coerce;
pub mod config;
pub mod dedupe;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod features;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod profile;
pub mod report;
pub mod scoring;

pub use config::PipelineConfig;
pub use engine::{run, run_table};
pub use error::PipelineError;
pub use model::{
    LifecycleStage, OutletAggregate, OutletLifecycle, PipelineResult, RawSheet, RawWorkbook,
    RiskCategory, RiskSummary, TransactionRecord, TransactionStatus,
};
