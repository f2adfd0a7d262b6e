// File I/O operations

pub mod csv;
pub mod fs;
pub mod reports;
pub mod xlsx;

use std::path::Path;

use gadai_pipeline::{RawSheet, RawWorkbook};

/// Input formats accepted by [`read_workbook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// xlsx, xlsm, xls, xlsb, ods
    Workbook,
    /// csv, tsv, txt: a single sheet named after the file stem
    Delimited,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Some(Self::Workbook),
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            _ => None,
        }
    }
}

/// Load every sheet of an input file as raw grids.
pub fn read_workbook(path: &Path) -> Result<RawWorkbook, String> {
    match InputFormat::from_path(path) {
        Some(InputFormat::Workbook) => xlsx::import(path),
        Some(InputFormat::Delimited) => Ok(RawWorkbook {
            sheets: vec![csv::import(path)?],
        }),
        None => Err(format!(
            "unsupported input '{}' (expected xlsx, xls, xlsb, ods, csv, tsv or txt)",
            path.display()
        )),
    }
}

/// Load a single table. For workbooks `sheet` picks the sheet and defaults
/// to the first one; delimited files have only one.
pub fn read_sheet(path: &Path, sheet: Option<&str>) -> Result<RawSheet, String> {
    let mut workbook = read_workbook(path)?;
    match sheet {
        Some(name) if InputFormat::from_path(path) == Some(InputFormat::Workbook) => {
            let available = workbook.sheet_names().join(", ");
            workbook
                .sheets
                .into_iter()
                .find(|s| s.name == name)
                .ok_or_else(|| format!("sheet '{}' not found (available: {})", name, available))
        }
        _ => {
            if workbook.sheets.is_empty() {
                return Err(format!("{} contains no sheets", path.display()));
            }
            Ok(workbook.sheets.swap_remove(0))
        }
    }
}
