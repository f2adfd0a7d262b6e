// Excel import (xlsx, xls, xlsb, ods) into raw grids, and xlsx export of
// the master transaction table.
//
// Import keeps absolute cell positions: a range that starts at C4 yields
// three blank rows and two blank leading columns, so header detection sees
// the sheet the way a person does.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use gadai_pipeline::coerce::excel_serial_to_date;
use gadai_pipeline::{RawSheet, RawWorkbook, TransactionRecord};
use log::debug;
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

/// Import every sheet of a workbook, in workbook order.
pub fn import(path: &Path) -> Result<RawWorkbook, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err("Excel file contains no sheets".to_string());
    }

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for sheet_name in &sheet_names {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

        let (height, width) = range.get_size();
        if height == 0 || width == 0 {
            sheets.push(RawSheet::new(sheet_name.as_str(), Vec::new()));
            continue;
        }

        // Range start offset (data may not begin at A1)
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row as usize];
        for row in range.rows() {
            let mut cells = vec![String::new(); start_col as usize];
            cells.extend(row.iter().map(cell_text));
            rows.push(cells);
        }
        debug!(
            "sheet '{}': {}x{} at offset ({}, {})",
            sheet_name, height, width, start_row, start_col
        );
        sheets.push(RawSheet::new(sheet_name.as_str(), rows));
    }

    Ok(RawWorkbook { sheets })
}

/// Cell as text. Dates become ISO `YYYY-MM-DD`, whole floats drop the
/// decimal point.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            excel_serial_to_date(serial)
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| serial.to_string())
        }
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

const MASTER_COLUMNS: [&str; 17] = [
    "item_id",
    "outlet",
    "lifecycle_stage",
    "pawn_date",
    "due_date",
    "principal_loaned",
    "collateral_value",
    "principal_repaid",
    "company",
    "area",
    "sbg",
    "product",
    "holding_days",
    "outstanding_principal",
    "loan_to_value_ratio",
    "transaction_status",
    "risk_category",
];

/// Write records to a single-sheet xlsx with typed numeric cells and
/// ISO date text.
pub fn export_transactions(
    records: &[TransactionRecord],
    sheet_name: &str,
    path: &Path,
) -> Result<(), String> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = xlsx_workbook
        .add_worksheet()
        .set_name(sheet_name)
        .map_err(|e| format!("Failed to create sheet '{}': {}", sheet_name, e))?;

    for (col, name) in MASTER_COLUMNS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, &header_format)
            .map_err(|e| format!("Failed to write header: {}", e))?;
    }

    for (i, r) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string());
        let cells: [Cell; 17] = [
            Cell::Text(Some(r.item_id.clone())),
            Cell::Text(Some(r.outlet.clone())),
            Cell::Text(Some(r.lifecycle_stage.label().to_string())),
            Cell::Text(date(r.pawn_date)),
            Cell::Text(date(r.due_date)),
            Cell::Number(r.principal_loaned),
            Cell::Number(r.collateral_value),
            Cell::Number(r.principal_repaid),
            Cell::Text(r.company.clone()),
            Cell::Text(r.area.clone()),
            Cell::Text(r.sbg.clone()),
            Cell::Text(r.product.clone()),
            Cell::Number(r.holding_days.map(|d| d as f64)),
            Cell::Number(r.outstanding_principal),
            Cell::Number(r.loan_to_value_ratio),
            Cell::Text(r.transaction_status.map(|s| s.to_string())),
            Cell::Text(r.risk_category.map(|c| c.to_string())),
        ];
        for (col, cell) in cells.iter().enumerate() {
            write_cell(worksheet, row, col as u16, cell)?;
        }
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))
}

enum Cell {
    Text(Option<String>),
    Number(Option<f64>),
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), String> {
    let written = match cell {
        Cell::Text(Some(s)) => worksheet.write_string(row, col, s).map(|_| ()),
        Cell::Number(Some(n)) => worksheet.write_number(row, col, *n).map(|_| ()),
        Cell::Text(None) | Cell::Number(None) => Ok(()),
    };
    written.map_err(|e| format!("Failed to write cell ({}, {}): {}", row, col, e))
}
