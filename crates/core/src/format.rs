//! Value formats attached to view columns.

use serde::{Deserialize, Serialize};

/// Display/parse format of a view column.
///
/// The transformer uses the format to decide how raw CSV cells are
/// normalized; the assembly engine uses it again when rendering the final
/// string (grouping, `$` prefix, `%` suffix).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueFormat {
    Currency,
    Number,
    Decimal,
    Percentage,
    String,
}

impl ValueFormat {
    /// Whether values under this format are expected to parse as numbers.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueFormat::String)
    }
}

/// Normalize a raw CSV cell for a given format.
///
/// Numeric formats have thousands separators stripped so downstream parsing
/// works; strings are trimmed and otherwise left alone. Absent cells become
/// empty strings at the call site.
pub fn normalize(raw: &str, format: ValueFormat) -> String {
    let trimmed = raw.trim();
    if format.is_numeric() {
        trimmed.replace(',', "")
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_formats_strip_thousands_separators() {
        assert_eq!(normalize("1,234,567", ValueFormat::Number), "1234567");
        assert_eq!(normalize("$1,234", ValueFormat::Currency), "$1234");
        assert_eq!(normalize("12.34", ValueFormat::Decimal), "12.34");
    }

    #[test]
    fn strings_are_trimmed_but_untouched() {
        assert_eq!(normalize("  CTV, Display  ", ValueFormat::String), "CTV, Display");
    }

    #[test]
    fn format_serde_uses_screaming_snake_case() {
        let f: ValueFormat = serde_json::from_str("\"PERCENTAGE\"").unwrap();
        assert_eq!(f, ValueFormat::Percentage);
        assert_eq!(serde_json::to_string(&ValueFormat::Currency).unwrap(), "\"CURRENCY\"");
    }
}
