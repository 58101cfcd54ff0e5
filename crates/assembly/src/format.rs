//! Display formatting of cell values.

use reportdeck_core::ValueFormat;

/// Render a normalized cell value for display.
///
/// - `CURRENCY`: `$` + grouped number
/// - `PERCENTAGE`: two decimals + `%`
/// - `DECIMAL`: two decimals
/// - `NUMBER`: grouped integer
/// - `STRING`: the value as-is
///
/// Non-numeric input under a numeric format falls through to string
/// coercion.
pub fn format_value(raw: &str, format: ValueFormat) -> String {
    match format {
        ValueFormat::String => raw.to_string(),
        ValueFormat::Currency => match parse_numeric(raw) {
            Some(n) => format!("${}", localized_number(n)),
            None => raw.to_string(),
        },
        ValueFormat::Percentage => match parse_numeric(raw) {
            Some(n) => format!("{n:.2}%"),
            None => raw.to_string(),
        },
        ValueFormat::Decimal => match parse_numeric(raw) {
            Some(n) => format!("{n:.2}"),
            None => raw.to_string(),
        },
        ValueFormat::Number => match parse_numeric(raw) {
            Some(n) => group_thousands(n.round() as i64),
            None => raw.to_string(),
        },
    }
}

/// Parse a numeric cell, tolerating leading `$` and grouping commas left
/// over from unnormalized sources.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Locale-style rendering of a number: grouped integer part, two-decimal
/// fraction when the value is not whole.
fn localized_number(n: f64) -> String {
    let rounded = (n * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        group_thousands(rounded as i64)
    } else {
        let sign = if rounded < 0.0 { "-" } else { "" };
        let abs = rounded.abs();
        let fraction = format!("{:.2}", abs.fract());
        format!("{sign}{}.{}", group_thousands(abs.trunc() as i64), &fraction[2..])
    }
}

/// Group an integer with comma thousands separators.
fn group_thousands(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if n < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
