use log::{debug, info, warn};

use crate::coerce;
use crate::config::{fields, HeaderConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::model::{
    LifecycleStage, LoadReport, RawSheet, RawWorkbook, SheetLoad, SkipReason, SkippedSheet,
    TransactionRecord,
};
use crate::normalize::{map_columns, normalize_header, normalize_headers, ColumnMap};

/// Outlet assigned to rows whose outlet cell is blank.
pub const UNKNOWN_OUTLET: &str = "(unknown)";

/// Unified table of every usable sheet plus what happened to each sheet.
#[derive(Debug, Clone, Default)]
pub struct LoadedTable {
    pub records: Vec<TransactionRecord>,
    pub report: LoadReport,
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

/// Index of the first row among the leading `scan_rows` with at least
/// `min_hits` cells containing a header keyword. Falls back to row 0.
pub fn detect_header_row<I, R>(rows: I, header: &HeaderConfig) -> usize
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    rows.into_iter()
        .take(header.scan_rows)
        .position(|row| keyword_hits(row.as_ref(), &header.keywords) >= header.min_hits)
        .unwrap_or(0)
}

fn keyword_hits(row: &[String], keywords: &[String]) -> usize {
    row.iter()
        .filter(|cell| {
            let cell = normalize_header(cell);
            !cell.is_empty()
                && keywords
                    .iter()
                    .any(|kw| !kw.is_empty() && cell.contains(kw.as_str()))
        })
        .count()
}

// ---------------------------------------------------------------------------
// Single sheet
// ---------------------------------------------------------------------------

/// Header resolution for one sheet, before any data row is read.
#[derive(Debug, Clone)]
pub struct SheetLayout {
    pub header_row: usize,
    pub headers: Vec<String>,
    pub columns: ColumnMap,
}

/// Detect the header row of `sheet` and bind the configured fields to it.
/// `None` when the sheet has no rows at all.
pub fn resolve_layout(config: &PipelineConfig, sheet: &RawSheet) -> Option<SheetLayout> {
    if sheet.rows.is_empty() {
        return None;
    }
    let header_row = detect_header_row(&sheet.rows, &config.header);
    let headers = normalize_headers(&sheet.rows[header_row]);
    let columns = map_columns(&headers, &config.fields);
    Some(SheetLayout {
        header_row,
        headers,
        columns,
    })
}

/// Load one sheet as `stage`. Rejected when empty or when a required field
/// has no matching header.
pub fn load_sheet(
    config: &PipelineConfig,
    sheet: &RawSheet,
    stage: LifecycleStage,
) -> Result<(Vec<TransactionRecord>, SheetLoad), SkipReason> {
    let layout = resolve_layout(config, sheet).ok_or(SkipReason::Empty)?;
    debug!(
        "sheet '{}': header at row {}, {} field(s) mapped",
        sheet.name,
        layout.header_row,
        layout.columns.matches().len()
    );

    let missing = layout.columns.missing_required(&config.fields);
    if !missing.is_empty() {
        return Err(SkipReason::MissingFields { fields: missing });
    }

    let mut records = Vec::new();
    let mut missing_item_id = 0;
    for row in &sheet.rows[layout.header_row + 1..] {
        match read_row(row, &layout.columns, stage) {
            RowOutcome::Blank => {}
            RowOutcome::MissingItemId => missing_item_id += 1,
            RowOutcome::Record(record) => records.push(record),
        }
    }
    if missing_item_id > 0 {
        warn!(
            "sheet '{}': dropped {missing_item_id} row(s) with a blank item id",
            sheet.name
        );
    }

    let load = SheetLoad {
        name: sheet.name.clone(),
        stage,
        header_row: layout.header_row,
        mapping: layout.columns.into_matches(),
        rows_kept: records.len(),
        rows_missing_item_id: missing_item_id,
    };
    Ok((records, load))
}

enum RowOutcome {
    Blank,
    MissingItemId,
    Record(TransactionRecord),
}

fn read_row(row: &[String], columns: &ColumnMap, stage: LifecycleStage) -> RowOutcome {
    let cell = |field: &str| -> &str {
        columns
            .get(field)
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .unwrap_or("")
    };

    if columns.matches().iter().all(|m| cell(&m.field).is_empty()) {
        return RowOutcome::Blank;
    }

    let Some(item_id) = coerce::text(cell(fields::ITEM_ID)) else {
        return RowOutcome::MissingItemId;
    };
    let outlet = coerce::text(cell(fields::OUTLET)).unwrap_or_else(|| UNKNOWN_OUTLET.to_string());

    let mut record = TransactionRecord::new(item_id, outlet, stage);
    record.pawn_date = coerce::date(cell(fields::PAWN_DATE));
    record.due_date = coerce::date(cell(fields::DUE_DATE));
    record.principal_loaned = coerce::number(cell(fields::PRINCIPAL_LOANED));
    record.collateral_value = coerce::number(cell(fields::COLLATERAL_VALUE));
    record.principal_repaid = coerce::number(cell(fields::PRINCIPAL_REPAID));
    record.company = coerce::text(cell(fields::COMPANY));
    record.area = coerce::text(cell(fields::AREA));
    record.sbg = coerce::text(cell(fields::SBG));
    record.product = coerce::text(cell(fields::PRODUCT));
    RowOutcome::Record(record)
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

/// Load every configured sheet, skipping the unusable ones, and concatenate
/// the survivors in configuration order.
pub fn load_workbook(
    config: &PipelineConfig,
    workbook: &RawWorkbook,
) -> Result<LoadedTable, PipelineError> {
    let mut table = LoadedTable::default();

    for sheet_config in &config.sheets {
        let outcome = match workbook.sheet(&sheet_config.name) {
            Some(sheet) => load_sheet(config, sheet, sheet_config.stage),
            None => Err(SkipReason::NotInWorkbook),
        };
        match outcome {
            Ok((records, load)) => {
                info!("sheet '{}': {} row(s) loaded", load.name, load.rows_kept);
                table.records.extend(records);
                table.report.sheets.push(load);
            }
            Err(reason) => {
                warn!("skipping sheet '{}': {reason}", sheet_config.name);
                table.report.skipped.push(SkippedSheet {
                    name: sheet_config.name.clone(),
                    reason,
                });
            }
        }
    }

    if table.report.sheets.is_empty() {
        return Err(PipelineError::NoValidSheets {
            attempted: config.sheets.iter().map(|s| s.name.clone()).collect(),
        });
    }
    Ok(table)
}
