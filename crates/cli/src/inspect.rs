//! `gadai inspect` and `gadai validate`: look at a workbook the way the
//! loader will, without writing anything.

use std::path::PathBuf;

use gadai_io::read_workbook;
use gadai_pipeline::loader::{load_workbook, resolve_layout};
use gadai_pipeline::model::{FieldMatch, LoadReport};
use gadai_pipeline::profile::{profile, DatasetProfile};
use gadai_pipeline::LifecycleStage;
use serde::Serialize;

use crate::util::pad_right;
use crate::{load_config, print_json, CliError};

#[derive(Debug, Serialize)]
pub(crate) struct SheetInspection {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    /// Stage the config assigns to this sheet; `None` when it is not read.
    pub stage: Option<LifecycleStage>,
    /// 0-based; `None` for an empty sheet.
    pub header_row: Option<usize>,
    pub mapped: Vec<FieldMatch>,
    pub missing: Vec<String>,
}

impl SheetInspection {
    fn usable(&self) -> bool {
        self.header_row.is_some() && self.missing.is_empty()
    }
}

pub fn cmd_inspect(file: PathBuf, config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let workbook = read_workbook(&file).map_err(CliError::io)?;

    let sheets: Vec<SheetInspection> = workbook
        .sheets
        .iter()
        .map(|sheet| {
            let (rows, cols) = sheet.dimensions();
            let stage = config
                .sheets
                .iter()
                .find(|s| s.name == sheet.name)
                .map(|s| s.stage);
            match resolve_layout(&config, sheet) {
                Some(layout) => SheetInspection {
                    name: sheet.name.clone(),
                    rows,
                    cols,
                    stage,
                    header_row: Some(layout.header_row),
                    missing: layout.columns.missing_required(&config.fields),
                    mapped: layout.columns.into_matches(),
                },
                None => SheetInspection {
                    name: sheet.name.clone(),
                    rows,
                    cols,
                    stage,
                    header_row: None,
                    mapped: Vec::new(),
                    missing: Vec::new(),
                },
            }
        })
        .collect();

    if json {
        return print_json(&sheets);
    }

    for s in &sheets {
        let stage = s.stage.map(|st| st.to_string()).unwrap_or_else(|| "-".into());
        let status = match (s.stage, s.usable()) {
            (Some(_), true) => "ok".to_string(),
            (None, _) => "not configured".to_string(),
            (Some(_), false) if s.header_row.is_none() => "empty".to_string(),
            (Some(_), false) => format!("missing: {}", s.missing.join(", ")),
        };
        println!(
            "{} {:>6} x {:<4} stage {}  {}",
            pad_right(&s.name, 16),
            s.rows,
            s.cols,
            pad_right(&stage, 11),
            status
        );
        if let Some(h) = s.header_row {
            println!("    header row {}", h + 1);
        }
        for m in &s.mapped {
            println!("    {} <- \"{}\" (col {})", pad_right(&m.field, 16), m.header, m.column + 1);
        }
    }
    let missing_sheets: Vec<&str> = config
        .sheets
        .iter()
        .filter(|c| workbook.sheet(&c.name).is_none())
        .map(|c| c.name.as_str())
        .collect();
    if !missing_sheets.is_empty() {
        eprintln!("not in workbook: {}", missing_sheets.join(", "));
    }
    Ok(())
}

#[derive(Serialize)]
struct ValidateOutput {
    load: LoadReport,
    profile: DatasetProfile,
}

pub fn cmd_validate(config: Option<PathBuf>, input: PathBuf, json: bool) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let workbook = read_workbook(&input).map_err(CliError::io)?;
    let table = load_workbook(&config, &workbook).map_err(CliError::pipeline)?;
    let profile = profile(&table.records);

    if json {
        return print_json(&ValidateOutput {
            load: table.report,
            profile,
        });
    }

    println!("rows              {}", profile.rows);
    println!("distinct items    {}", profile.distinct_item_ids);
    println!("distinct outlets  {}", profile.distinct_outlets);
    if let (Some(min), Some(max)) = (profile.pawn_date_min, profile.pawn_date_max) {
        println!("pawn dates        {} .. {}", min, max);
    }
    println!("by stage");
    for (stage, n) in &profile.stage_counts {
        println!("  {} {}", pad_right(stage, 14), n);
    }
    println!("null cells");
    for (column, n) in profile.null_counts.iter().filter(|&(_, &n)| n > 0) {
        println!("  {} {}", pad_right(column, 20), n);
    }
    if !profile.duplicated_item_ids.is_empty() {
        println!("most repeated items");
        for (id, n) in &profile.duplicated_item_ids {
            println!("  {} x{}", pad_right(id, 20), n);
        }
    }
    for skipped in &table.report.skipped {
        eprintln!("skipped {}: {}", skipped.name, skipped.reason);
    }
    let dropped = table.report.rows_missing_item_id();
    if dropped > 0 {
        eprintln!("{} row(s) dropped without an item id", dropped);
    }
    Ok(())
}
