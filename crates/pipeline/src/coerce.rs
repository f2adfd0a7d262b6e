//! Permissive cell coercion: anything that does not parse becomes `None`.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Largest serial the 1900 date system represents (9999-12-31).
const EXCEL_SERIAL_MAX: f64 = 2_958_465.0;

/// Smallest serial accepted from date-column text (1901-01-01). Lower values
/// are far more likely to be stray counts than dates.
const DATE_TEXT_SERIAL_MIN: f64 = 367.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Trimmed text, `None` when blank.
pub fn text(raw: &str) -> Option<String> {
    let t = raw.trim();
    (!t.is_empty()).then(|| t.to_string())
}

/// Parse a monetary/numeric cell. Tolerates an `Rp` prefix and `,`, `_` or
/// space thousands separators. Separators must split the integer part into
/// groups of three, so a decimal comma such as `2,5` is rejected.
pub fn number(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    let parsed = t.parse::<f64>().ok().or_else(|| {
        let stripped = t
            .strip_prefix("Rp.")
            .or_else(|| t.strip_prefix("Rp"))
            .or_else(|| t.strip_prefix("rp"))
            .unwrap_or(t);
        strip_group_separators(stripped.trim())?.parse::<f64>().ok()
    })?;
    parsed.is_finite().then_some(parsed)
}

fn is_group_separator(c: char) -> bool {
    matches!(c, ',' | '_') || c.is_whitespace()
}

/// `1,250,000.50` to `1250000.50`. `None` when a separator sits anywhere but
/// between well-formed thousands groups of the integer part.
fn strip_group_separators(s: &str) -> Option<String> {
    let (sign, unsigned) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.strip_prefix('+').unwrap_or(s)),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (unsigned, None),
    };
    if frac_part.is_some_and(|f| f.contains(is_group_separator)) {
        return None;
    }

    let groups: Vec<&str> = int_part.split(is_group_separator).collect();
    let digits = |g: &str| !g.is_empty() && g.bytes().all(|b| b.is_ascii_digit());
    let (first, rest) = groups.split_first()?;
    if !digits(first) {
        return None;
    }
    if !rest.is_empty() && (first.len() > 3 || !rest.iter().all(|g| g.len() == 3 && digits(g))) {
        return None;
    }

    let mut cleaned = String::with_capacity(s.len());
    cleaned.push_str(sign);
    cleaned.extend(groups);
    if let Some(frac) = frac_part {
        cleaned.push('.');
        cleaned.push_str(frac);
    }
    Some(cleaned)
}

/// Parse a date cell: ISO / day-first text or an Excel serial day number.
pub fn date(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Some(dt.date());
        }
    }
    t.parse::<f64>()
        .ok()
        .filter(|serial| *serial >= DATE_TEXT_SERIAL_MIN)
        .and_then(excel_serial_to_date)
}

/// 1900 date system, epoch 1899-12-30 (absorbs the Lotus leap-year bug
/// for every serial after February 1900).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=EXCEL_SERIAL_MAX).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
