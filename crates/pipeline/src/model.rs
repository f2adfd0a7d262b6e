use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One worksheet as a grid of cell text. Row and column positions are
/// absolute: leading empty rows/columns of the source are kept as blanks.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// (rows, widest row)
    pub fn dimensions(&self) -> (usize, usize) {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (self.rows.len(), width)
    }
}

/// Pre-loaded workbook: sheets in workbook order.
#[derive(Debug, Clone, Default)]
pub struct RawWorkbook {
    pub sheets: Vec<RawSheet>,
}

impl RawWorkbook {
    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Lifecycle stage / status / risk
// ---------------------------------------------------------------------------

/// The sheet a transaction came from, describing where the loan sits in
/// its lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    #[serde(alias = "Outstanding")]
    Outstanding,
    #[serde(alias = "Active")]
    Active,
    #[serde(alias = "On-Due")]
    OnDue,
    #[serde(alias = "Late")]
    Late,
    #[serde(alias = "Auction")]
    Auction,
}

impl LifecycleStage {
    pub const ALL: [LifecycleStage; 5] = [
        Self::Outstanding,
        Self::Active,
        Self::OnDue,
        Self::Late,
        Self::Auction,
    ];

    /// Dedup priority when no override is configured. Higher wins.
    pub fn default_priority(self) -> u8 {
        match self {
            Self::Outstanding => 1,
            Self::Active => 2,
            Self::OnDue => 3,
            Self::Late => 4,
            Self::Auction => 5,
        }
    }

    /// Sheet label as it appears in the source workbook.
    pub fn label(self) -> &'static str {
        match self {
            Self::Outstanding => "Outstanding",
            Self::Active => "Active",
            Self::OnDue => "On-Due",
            Self::Late => "Late",
            Self::Auction => "Auction",
        }
    }

    pub fn is_late(self) -> bool {
        matches!(self, Self::Late | Self::Auction)
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Outstanding => write!(f, "outstanding"),
            Self::Active => write!(f, "active"),
            Self::OnDue => write!(f, "on_due"),
            Self::Late => write!(f, "late"),
            Self::Auction => write!(f, "auction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Active,
    Paid,
    Overdue,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paid => write!(f, "paid"),
            Self::Overdue => write!(f, "overdue"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical record
// ---------------------------------------------------------------------------

/// One pawn transaction in canonical form.
///
/// The raw block is filled by the loader. The derived block stays `None`
/// until the feature and classification stages run; after a full run every
/// record carries a status and a risk category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub item_id: String,
    pub outlet: String,
    pub lifecycle_stage: LifecycleStage,
    pub pawn_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub principal_loaned: Option<f64>,
    pub collateral_value: Option<f64>,
    pub principal_repaid: Option<f64>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub sbg: Option<String>,
    #[serde(default)]
    pub product: Option<String>,

    #[serde(default)]
    pub holding_days: Option<i64>,
    #[serde(default)]
    pub outstanding_principal: Option<f64>,
    /// Percent, not fraction.
    #[serde(default)]
    pub loan_to_value_ratio: Option<f64>,
    #[serde(default)]
    pub transaction_status: Option<TransactionStatus>,
    #[serde(default)]
    pub risk_category: Option<RiskCategory>,
}

impl TransactionRecord {
    /// A record with only identity fields set; everything else empty.
    pub fn new(
        item_id: impl Into<String>,
        outlet: impl Into<String>,
        lifecycle_stage: LifecycleStage,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            outlet: outlet.into(),
            lifecycle_stage,
            pawn_date: None,
            due_date: None,
            principal_loaned: None,
            collateral_value: None,
            principal_repaid: None,
            company: None,
            area: None,
            sbg: None,
            product: None,
            holding_days: None,
            outstanding_principal: None,
            loan_to_value_ratio: None,
            transaction_status: None,
            risk_category: None,
        }
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk_category == Some(RiskCategory::High)
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Per-outlet portfolio figures. Column names match the exported CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletAggregate {
    pub outlet: String,
    pub total_transaksi: usize,
    pub total_pinjaman: f64,
    #[serde(alias = "rata_rasio")]
    pub rata_ltv: Option<f64>,
    pub transaksi_berisiko: usize,
    pub transaksi_sedang: usize,
    pub persen_berisiko: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutletFlag {
    VeryRisky,
    Risky,
    Normal,
}

impl fmt::Display for OutletFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VeryRisky => write!(f, "very_risky"),
            Self::Risky => write!(f, "risky"),
            Self::Normal => write!(f, "normal"),
        }
    }
}

/// Per-outlet share of transactions sitting in the Late / Auction sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutletLifecycle {
    pub outlet: String,
    pub total_transaksi: usize,
    pub total_late: usize,
    pub total_auction: usize,
    pub late_ratio: f64,
    pub auction_ratio: f64,
    pub flag: OutletFlag,
}

/// Portfolio-level counts over the final transaction table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub total_transaksi: usize,
    pub total_outlet: usize,
    pub transaksi_berisiko: usize,
    /// Rounded to one decimal.
    pub persen_berisiko: f64,
    pub status_counts: BTreeMap<String, usize>,
    pub risiko_counts: BTreeMap<String, usize>,
}

// ---------------------------------------------------------------------------
// Load report
// ---------------------------------------------------------------------------

/// One canonical field bound to a concrete header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    pub field: String,
    pub header: String,
    pub column: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SheetLoad {
    pub name: String,
    pub stage: LifecycleStage,
    pub header_row: usize,
    pub mapping: Vec<FieldMatch>,
    pub rows_kept: usize,
    pub rows_missing_item_id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    NotInWorkbook,
    Empty,
    MissingFields { fields: Vec<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInWorkbook => write!(f, "not in workbook"),
            Self::Empty => write!(f, "sheet is empty"),
            Self::MissingFields { fields } => {
                write!(f, "missing required field(s): {}", fields.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedSheet {
    pub name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// What the loader did with each configured sheet.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub sheets: Vec<SheetLoad>,
    pub skipped: Vec<SkippedSheet>,
}

impl LoadReport {
    pub fn rows_loaded(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_kept).sum()
    }

    pub fn rows_missing_item_id(&self) -> usize {
        self.sheets.iter().map(|s| s.rows_missing_item_id).sum()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub as_of: NaiveDate,
}

/// Everything a full run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub meta: RunMeta,
    pub load: LoadReport,
    /// Concatenation of all loaded sheets, before dedup.
    #[serde(skip)]
    pub master: Vec<TransactionRecord>,
    /// Deduplicated, enriched and classified; ordered by item_id.
    #[serde(skip)]
    pub transactions: Vec<TransactionRecord>,
    pub summary: RiskSummary,
    pub outlets: Vec<OutletAggregate>,
    pub outlet_lifecycle: Vec<OutletLifecycle>,
}
