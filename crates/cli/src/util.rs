use unicode_width::UnicodeWidthStr;

/// Display width of a string (outlet names may carry wide characters).
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to `width` display columns, marking the cut with "..".
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    out.push_str("..");
    out
}

/// Pad or truncate to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Right-align within `width` columns; used for numeric columns.
pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - sw), s)
    }
}

/// Integer part with `.` thousands separators, Rupiah style: 1500000 → "1.500.000".
pub(crate) fn format_rupiah(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    if rounded < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_cjk() {
        assert_eq!(display_width("\u{4e16}\u{754c}"), 4);
        assert_eq!(display_width("Depok"), 5);
    }

    #[test]
    fn truncate_cuts() {
        assert_eq!(truncate_display("abcdef", 5), "abc..");
        assert_eq!(truncate_display("abc", 3), "abc");
        assert_eq!(truncate_display("abc", 2), "a");
        assert_eq!(truncate_display("", 0), "");
    }

    #[test]
    fn pads() {
        assert_eq!(pad_right("ab", 5), "ab   ");
        assert_eq!(pad_right("abcdef", 5), "abc..");
        assert_eq!(pad_left("42", 5), "   42");
        assert_eq!(pad_left("123456", 3), "123456");
    }

    #[test]
    fn rupiah_grouping() {
        assert_eq!(format_rupiah(0.0), "0");
        assert_eq!(format_rupiah(999.0), "999");
        assert_eq!(format_rupiah(1_500_000.0), "1.500.000");
        assert_eq!(format_rupiah(-12_345.4), "-12.345");
    }
}
