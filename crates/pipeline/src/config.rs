use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::model::LifecycleStage;
use crate::normalize::normalize_header;

/// Canonical field names shared by the loader, the exporters and the CLI.
pub mod fields {
    pub const ITEM_ID: &str = "item_id";
    pub const OUTLET: &str = "outlet";
    pub const PAWN_DATE: &str = "pawn_date";
    pub const DUE_DATE: &str = "due_date";
    pub const PRINCIPAL_LOANED: &str = "principal_loaned";
    pub const COLLATERAL_VALUE: &str = "collateral_value";
    pub const PRINCIPAL_REPAID: &str = "principal_repaid";
    pub const COMPANY: &str = "company";
    pub const AREA: &str = "area";
    pub const SBG: &str = "sbg";
    pub const PRODUCT: &str = "product";

    /// Fields every sheet must supply for the pipeline to use it.
    pub const CORE: [&str; 7] = [
        ITEM_ID,
        OUTLET,
        PAWN_DATE,
        DUE_DATE,
        PRINCIPAL_LOANED,
        COLLATERAL_VALUE,
        PRINCIPAL_REPAID,
    ];
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub sheets: Vec<SheetConfig>,
    pub header: HeaderConfig,
    pub fields: Vec<FieldRule>,
    pub priority: StagePriority,
    pub thresholds: Thresholds,
    pub output: OutputConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "gadai".into(),
            sheets: LifecycleStage::ALL
                .iter()
                .map(|&stage| SheetConfig {
                    name: stage.label().to_string(),
                    stage,
                })
                .collect(),
            header: HeaderConfig::default(),
            fields: default_fields(),
            priority: StagePriority::default(),
            thresholds: Thresholds::default(),
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sheets + header detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    pub name: String,
    pub stage: LifecycleStage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// How many leading rows may hold the header.
    pub scan_rows: usize,
    /// Cells that must hit a keyword for a row to count as the header.
    pub min_hits: usize,
    pub keywords: Vec<String>,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            scan_rows: 10,
            min_hits: 3,
            keywords: vec!["no".into(), "outlet".into(), "tanggal".into(), "imei".into()],
        }
    }
}

// ---------------------------------------------------------------------------
// Field keyword table
// ---------------------------------------------------------------------------

/// One canonical field and the header keywords that identify it, in
/// preference order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl FieldRule {
    fn new(name: &str, keywords: &[&str], required: bool) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            required,
        }
    }
}

fn default_fields() -> Vec<FieldRule> {
    use fields::*;
    vec![
        FieldRule::new(ITEM_ID, &["imei", "no seri", "serial"], true),
        FieldRule::new(OUTLET, &["outlet", "cabang"], true),
        FieldRule::new(PAWN_DATE, &["tanggal gadai", "tgl gadai", "tanggal"], true),
        FieldRule::new(DUE_DATE, &["jatuh tempo", "tanggal jt", "tgl jt", "jt"], true),
        FieldRule::new(
            PRINCIPAL_LOANED,
            &["pokok pinjaman", "nilai pinjam", "pinjaman", "loan"],
            true,
        ),
        FieldRule::new(COLLATERAL_VALUE, &["nilai jaminan", "taksiran", "jaminan"], true),
        FieldRule::new(PRINCIPAL_REPAID, &["pokok terbayar", "terbayar"], true),
        FieldRule::new(COMPANY, &["company"], false),
        FieldRule::new(AREA, &["area"], false),
        FieldRule::new(SBG, &["sbg"], false),
        FieldRule::new(PRODUCT, &["produk", "product"], false),
    ]
}

// ---------------------------------------------------------------------------
// Priority + thresholds
// ---------------------------------------------------------------------------

/// Stage → dedup priority. Higher wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagePriority {
    pub outstanding: u8,
    pub active: u8,
    pub on_due: u8,
    pub late: u8,
    pub auction: u8,
}

impl StagePriority {
    pub fn of(&self, stage: LifecycleStage) -> u8 {
        match stage {
            LifecycleStage::Outstanding => self.outstanding,
            LifecycleStage::Active => self.active,
            LifecycleStage::OnDue => self.on_due,
            LifecycleStage::Late => self.late,
            LifecycleStage::Auction => self.auction,
        }
    }
}

impl Default for StagePriority {
    fn default() -> Self {
        Self {
            outstanding: LifecycleStage::Outstanding.default_priority(),
            active: LifecycleStage::Active.default_priority(),
            on_due: LifecycleStage::OnDue.default_priority(),
            late: LifecycleStage::Late.default_priority(),
            auction: LifecycleStage::Auction.default_priority(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// LTV percent above which a loan is high risk.
    pub ltv_high_pct: f64,
    /// Outstanding share of collateral (percent) for the medium tier.
    pub outstanding_medium_pct: f64,
    /// Holding period (days) for the medium tier.
    pub holding_days_medium: i64,
    pub outlet_late_ratio: f64,
    pub outlet_auction_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ltv_high_pct: 100.0,
            outstanding_medium_pct: 70.0,
            holding_days_medium: 180,
            outlet_late_ratio: 0.3,
            outlet_auction_ratio: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// File names (relative to the output directory) of the persisted reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub transactions: String,
    pub master_dataset: String,
    pub master_transactions: String,
    pub outlets: String,
    pub outlet_lifecycle: String,
    pub summary: String,
    pub master_xlsx: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            transactions: "gadai_processed.csv".into(),
            master_dataset: "gadai_master_dataset.csv".into(),
            master_transactions: "gadai_master_transaction.csv".into(),
            outlets: "outlet_summary.csv".into(),
            outlet_lifecycle: "outlet_risk_summary.csv".into(),
            summary: "summary.txt".into(),
            master_xlsx: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, PipelineError> {
        let mut config: PipelineConfig =
            toml::from_str(input).map_err(|e| PipelineError::ConfigParse(e.to_string()))?;
        config.normalize_keywords();
        config.validate()?;
        Ok(config)
    }

    /// Pass keyword tables through the header normalizer so both sides of
    /// every substring test use the same separator convention.
    pub fn normalize_keywords(&mut self) {
        for rule in &mut self.fields {
            for kw in &mut rule.keywords {
                *kw = normalize_header(kw);
            }
        }
        for kw in &mut self.header.keywords {
            *kw = normalize_header(kw);
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.sheets.is_empty() {
            return Err(PipelineError::ConfigValidation(
                "at least one sheet is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for sheet in &self.sheets {
            if sheet.name.trim().is_empty() {
                return Err(PipelineError::ConfigValidation("sheet name is empty".into()));
            }
            if !seen.insert(sheet.name.as_str()) {
                return Err(PipelineError::ConfigValidation(format!(
                    "duplicate sheet '{}'",
                    sheet.name
                )));
            }
        }

        let mut field_names = HashSet::new();
        for rule in &self.fields {
            if !field_names.insert(rule.name.as_str()) {
                return Err(PipelineError::ConfigValidation(format!(
                    "duplicate field '{}'",
                    rule.name
                )));
            }
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(PipelineError::ConfigValidation(format!(
                    "field '{}' has no keywords",
                    rule.name
                )));
            }
        }
        for core in fields::CORE {
            if self.field(core).is_none() {
                return Err(PipelineError::ConfigValidation(format!(
                    "core field '{core}' is not configured"
                )));
            }
        }

        if self.header.min_hits == 0 {
            return Err(PipelineError::ConfigValidation(
                "header.min_hits must be at least 1".into(),
            ));
        }
        if self.header.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(PipelineError::ConfigValidation(
                "header.keywords is empty".into(),
            ));
        }

        let t = &self.thresholds;
        let finite = [
            ("ltv_high_pct", t.ltv_high_pct),
            ("outstanding_medium_pct", t.outstanding_medium_pct),
            ("outlet_late_ratio", t.outlet_late_ratio),
            ("outlet_auction_ratio", t.outlet_auction_ratio),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(PipelineError::ConfigValidation(format!(
                    "thresholds.{name} must be finite"
                )));
            }
        }

        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Serialized form, as accepted by [`PipelineConfig::from_toml`].
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        toml::to_string_pretty(self).map_err(|e| PipelineError::ConfigParse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOM: &str = r#"
name = "Cabang Jakarta"

[[sheets]]
name = "Aktif"
stage = "active"

[[sheets]]
name = "Lelang"
stage = "auction"

[thresholds]
ltv_high_pct = 95.0
holding_days_medium = 90
"#;

    #[test]
    fn empty_input_yields_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.sheets.len(), 5);
        assert_eq!(config.sheets[2].name, "On-Due");
        assert_eq!(config.sheets[2].stage, LifecycleStage::OnDue);
        assert_eq!(config.header.scan_rows, 10);
        assert_eq!(config.thresholds.outstanding_medium_pct, 70.0);
    }

    #[test]
    fn parse_custom_sheets_and_thresholds() {
        let config = PipelineConfig::from_toml(CUSTOM).unwrap();
        assert_eq!(config.name, "Cabang Jakarta");
        assert_eq!(config.sheets.len(), 2);
        assert_eq!(config.sheets[1].stage, LifecycleStage::Auction);
        assert_eq!(config.thresholds.ltv_high_pct, 95.0);
        assert_eq!(config.thresholds.holding_days_medium, 90);
        // Untouched thresholds keep their defaults.
        assert_eq!(config.thresholds.outlet_late_ratio, 0.3);
        assert_eq!(config.fields.len(), 11);
    }

    #[test]
    fn stage_accepts_sheet_label_alias() {
        let input = r#"
[[sheets]]
name = "OnDue"
stage = "On-Due"
"#;
        let config = PipelineConfig::from_toml(input).unwrap();
        assert_eq!(config.sheets[0].stage, LifecycleStage::OnDue);
    }

    #[test]
    fn priority_override_and_fallback() {
        let input = r#"
[priority]
active = 9
"#;
        let config = PipelineConfig::from_toml(input).unwrap();
        assert_eq!(config.priority.of(LifecycleStage::Active), 9);
        assert_eq!(config.priority.of(LifecycleStage::Auction), 5);
    }

    #[test]
    fn keywords_are_normalized_on_load() {
        let input = r#"
[[fields]]
name = "item_id"
keywords = ["No/Seri"]
required = true

[[fields]]
name = "outlet"
keywords = ["OUTLET"]
required = true

[[fields]]
name = "pawn_date"
keywords = ["Tanggal\nGadai"]
required = true

[[fields]]
name = "due_date"
keywords = ["jt"]
required = true

[[fields]]
name = "principal_loaned"
keywords = ["pinjaman"]
required = true

[[fields]]
name = "collateral_value"
keywords = ["jaminan"]
required = true

[[fields]]
name = "principal_repaid"
keywords = ["terbayar"]
required = true
"#;
        let config = PipelineConfig::from_toml(input).unwrap();
        assert_eq!(config.field("item_id").unwrap().keywords, vec!["no seri"]);
        assert_eq!(config.field("outlet").unwrap().keywords, vec!["outlet"]);
        assert_eq!(config.field("pawn_date").unwrap().keywords, vec!["tanggal gadai"]);
    }

    #[test]
    fn rejects_unknown_stage() {
        let input = r#"
[[sheets]]
name = "X"
stage = "lelang"
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigParse(_)));
    }

    #[test]
    fn rejects_duplicate_sheet() {
        let input = r#"
[[sheets]]
name = "Late"
stage = "late"

[[sheets]]
name = "Late"
stage = "auction"
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("duplicate sheet 'Late'"));
    }

    #[test]
    fn rejects_missing_core_field() {
        let input = r#"
[[fields]]
name = "item_id"
keywords = ["imei"]
required = true
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("core field 'outlet'"));
        assert!(PipelineConfig::default().field("outlet").is_some());
        assert!(PipelineConfig::default().field("branch").is_none());
    }

    #[test]
    fn rejects_zero_min_hits() {
        let err = PipelineConfig::from_toml("[header]\nmin_hits = 0\n").unwrap_err();
        assert!(matches!(err, PipelineError::ConfigValidation(_)));
    }

    #[test]
    fn toml_round_trip_of_defaults() {
        let text = PipelineConfig::default().to_toml().unwrap();
        let back = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(back, PipelineConfig::default());
    }
}
