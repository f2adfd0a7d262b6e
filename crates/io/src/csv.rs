// CSV import (raw grids) and typed report tables

use std::io::Read;
use std::path::Path;

use gadai_pipeline::RawSheet;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::fs::atomic_write;

/// Import a delimited text file as a raw grid named after the file stem.
pub fn import(path: &Path) -> Result<RawSheet, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "csv".to_string());
    import_from_string(&name, &content, delimiter)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins; a delimiter that never
/// splits a line scores zero and the default comma is kept.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Title rows often sit above the header, so any multi-field count
        // may be the target: lines agreeing with it, weighted by its width.
        let mut score = 0u64;
        for &target in counts.iter().filter(|&&c| c > 1) {
            let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
            score = score.max(consistent * target as u64);
        }

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel exports are often Windows-1252)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn import_from_string(name: &str, content: &str, delimiter: u8) -> Result<RawSheet, String> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawSheet::new(name, rows))
}

// ---------------------------------------------------------------------------
// Typed tables
// ---------------------------------------------------------------------------

/// Serialize rows with a header line taken from the row type's field names.
pub fn to_csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, String> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    for row in rows {
        writer.serialize(row).map_err(|e| e.to_string())?;
    }
    writer
        .into_inner()
        .map_err(|e| format!("failed to flush CSV buffer: {}", e))
}

/// Write a typed table atomically.
pub fn write_table<T: Serialize>(rows: &[T], path: &Path) -> Result<(), String> {
    let bytes = to_csv_bytes(rows)?;
    atomic_write(path, &bytes)
}

/// Read a typed table written by [`write_table`].
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, String> {
    let content = read_file_as_utf8(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(content.as_bytes());
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| row.map_err(|e| format!("{}: row {}: {}", path.display(), i + 2, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadai_pipeline::model::OutletAggregate;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n"), b';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n"), b'\t');
        assert_eq!(sniff_delimiter("a,b,c\n1,2,3\n"), b',');
        assert_eq!(sniff_delimiter("single\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_import_keeps_ragged_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("upload.csv");
        fs::write(&path, "title\nNo;Outlet;IMEI\n1;Depok;111\n").unwrap();

        let sheet = import(&path).unwrap();
        assert_eq!(sheet.name, "upload");
        assert_eq!(sheet.rows.len(), 3);
        assert_eq!(sheet.rows[0], vec!["title"]);
        assert_eq!(sheet.rows[2], vec!["1", "Depok", "111"]);
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Caf\xe9" is invalid UTF-8
        fs::write(&path, b"Outlet,Kota\nCaf\xe9,Bogor\n").unwrap();

        let sheet = import(&path).unwrap();
        assert_eq!(sheet.rows[1][0], "Café");
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}No,Outlet\n1,A\n").unwrap();
        let sheet = import(&path).unwrap();
        assert_eq!(sheet.rows[0][0], "No");
    }

    #[test]
    fn test_table_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("outlet_summary.csv");
        let rows = vec![OutletAggregate {
            outlet: "Depok".into(),
            total_transaksi: 3,
            total_pinjaman: 1500.5,
            rata_ltv: None,
            transaksi_berisiko: 1,
            transaksi_sedang: 0,
            persen_berisiko: 33.333,
        }];
        write_table(&rows, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "outlet,total_transaksi,total_pinjaman,rata_ltv,transaksi_berisiko,transaksi_sedang,persen_berisiko\n"
        ));
        let back: Vec<OutletAggregate> = read_table(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn test_read_table_reports_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(
            &path,
            "outlet,total_transaksi,total_pinjaman,rata_ltv,transaksi_berisiko,transaksi_sedang,persen_berisiko\nA,x,1,,0,0,0\n",
        )
        .unwrap();
        let err = read_table::<OutletAggregate>(&path).unwrap_err();
        assert!(err.contains("row 2"), "{err}");
    }
}
