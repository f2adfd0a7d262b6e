//! Header text normalization and keyword-substring column matching.
//!
//! One separator convention everywhere: lowercase, trimmed, newlines, tabs
//! and slashes folded to a space, whitespace runs collapsed to one space.
//! Keyword tables go through the same function when the config is loaded.

use crate::config::FieldRule;
use crate::model::FieldMatch;

pub fn normalize_header(raw: &str) -> String {
    let folded: String = raw
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '/' | '\\' => ' ',
            c if c.is_whitespace() => ' ',
            c => c,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    raw.iter().map(|h| normalize_header(h.as_ref())).collect()
}

/// Canonical field → matched header, in field-table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    matches: Vec<FieldMatch>,
}

impl ColumnMap {
    /// Column index of a canonical field.
    pub fn get(&self, field: &str) -> Option<usize> {
        self.matches
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.column)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Required fields of `rules` this map has no column for.
    pub fn missing_required(&self, rules: &[FieldRule]) -> Vec<String> {
        rules
            .iter()
            .filter(|r| r.required && !self.contains(&r.name))
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn matches(&self) -> &[FieldMatch] {
        &self.matches
    }

    pub fn into_matches(self) -> Vec<FieldMatch> {
        self.matches
    }
}

/// Bind each field to the first header containing one of its keywords.
///
/// Keywords are tried in order; for each keyword the headers are scanned
/// left to right, so an earlier keyword beats an earlier column. Fields are
/// matched independently: two fields may land on the same header.
pub fn map_columns(headers: &[String], rules: &[FieldRule]) -> ColumnMap {
    let mut matches = Vec::new();
    for rule in rules {
        let hit = rule.keywords.iter().filter(|kw| !kw.is_empty()).find_map(|kw| {
            headers
                .iter()
                .position(|h| h.contains(kw.as_str()))
        });
        if let Some(column) = hit {
            matches.push(FieldMatch {
                field: rule.name.clone(),
                header: headers[column].clone(),
                column,
            });
        }
    }
    ColumnMap { matches }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    fn headers(raw: &[&str]) -> Vec<String> {
        normalize_headers(raw)
    }

    #[test]
    fn folds_case_separators_and_whitespace() {
        assert_eq!(normalize_header("  Tanggal\nGadai "), "tanggal gadai");
        assert_eq!(normalize_header("Nilai/Jaminan"), "nilai jaminan");
        assert_eq!(normalize_header("No  Seri\t IMEI"), "no seri imei");
        assert_eq!(normalize_header(""), "");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["A / B", "Pokok\r\nPinjaman", "OUTLET"] {
            let once = normalize_header(raw);
            assert_eq!(normalize_header(&once), once);
        }
    }

    #[test]
    fn substring_match_on_default_table() {
        let config = PipelineConfig::default();
        let h = headers(&[
            "No",
            "Nama Outlet",
            "Tanggal Gadai",
            "Tgl JT",
            "IMEI / No Seri",
            "Pokok Pinjaman",
            "Nilai Jaminan",
            "Pokok Terbayar",
        ]);
        let map = map_columns(&h, &config.fields);
        assert_eq!(map.get("outlet"), Some(1));
        assert_eq!(map.get("pawn_date"), Some(2));
        assert_eq!(map.get("due_date"), Some(3));
        assert_eq!(map.get("item_id"), Some(4));
        assert_eq!(map.get("principal_loaned"), Some(5));
        assert_eq!(map.get("collateral_value"), Some(6));
        assert_eq!(map.get("principal_repaid"), Some(7));
        assert!(map.missing_required(&config.fields).is_empty());
        assert!(!map.contains("product"));
    }

    #[test]
    fn earlier_keyword_beats_earlier_column() {
        let config = PipelineConfig::default();
        // "tanggal jt" precedes "tanggal gadai" but pawn_date prefers the
        // "tanggal gadai" keyword.
        let h = headers(&["Tanggal JT", "Tanggal Gadai"]);
        let map = map_columns(&h, &config.fields);
        assert_eq!(map.get("pawn_date"), Some(1));
        assert_eq!(map.get("due_date"), Some(0));
    }

    #[test]
    fn first_column_wins_for_same_keyword() {
        let config = PipelineConfig::default();
        let h = headers(&["Outlet Kode", "Outlet Nama"]);
        let map = map_columns(&h, &config.fields);
        assert_eq!(map.get("outlet"), Some(0));
        assert_eq!(map.matches()[0].header, "outlet kode");
    }

    #[test]
    fn reports_missing_required_fields_in_table_order() {
        let config = PipelineConfig::default();
        let h = headers(&["IMEI", "Tanggal", "Pinjaman"]);
        let map = map_columns(&h, &config.fields);
        assert_eq!(
            map.missing_required(&config.fields),
            vec!["outlet", "due_date", "collateral_value", "principal_repaid"]
        );
    }
}
