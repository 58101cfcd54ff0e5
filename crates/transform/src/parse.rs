//! RFC-4180 CSV decoding.

use csv::ReaderBuilder;

use crate::transformer::TransformError;

/// A decoded CSV payload: the first non-empty record as headers, everything
/// after it as data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvDocument {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Parse a CSV payload.
///
/// Quoted fields may contain commas, newlines and `""`-escaped quotes.
/// Records are allowed to be ragged (short rows read as empty cells at the
/// projection stage). Returns `None` when the payload contains no non-empty
/// record at all.
pub fn parse_csv(input: &str) -> Result<Option<CsvDocument>, TransformError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input.as_bytes());

    let mut headers: Option<Vec<String>> = None;
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record?;
        let cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        match headers {
            None => headers = Some(cells),
            Some(_) => rows.push(cells),
        }
    }

    Ok(headers.map(|headers| CsvDocument { headers, rows }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quoted_fields_with_commas_and_newlines() {
        let input = "Channel,Note\nCTV,\"spend, up\nsharply\"\n";
        let doc = parse_csv(input).unwrap().unwrap();
        assert_eq!(doc.headers, vec!["Channel", "Note"]);
        assert_eq!(doc.rows, vec![vec!["CTV".to_string(), "spend, up\nsharply".to_string()]]);
    }

    #[test]
    fn doubled_quotes_unescape() {
        let input = "Name\n\"say \"\"hi\"\"\"\n";
        let doc = parse_csv(input).unwrap().unwrap();
        assert_eq!(doc.rows[0][0], "say \"hi\"");
    }

    #[test]
    fn first_non_empty_record_becomes_header() {
        let input = "\n\nChannel,Spend\nCTV,10\n";
        let doc = parse_csv(input).unwrap().unwrap();
        assert_eq!(doc.headers, vec!["Channel", "Spend"]);
        assert_eq!(doc.rows.len(), 1);
    }

    #[test]
    fn empty_payload_yields_none() {
        assert_eq!(parse_csv("").unwrap(), None);
        assert_eq!(parse_csv("\n\n").unwrap(), None);
    }

    #[test]
    fn logical_cells_round_trip() {
        // Parsing then rejoining the detected cells reproduces the logical
        // content, quoting aside.
        let input = "a,b,c\n1,\"x,y\",3\n";
        let doc = parse_csv(input).unwrap().unwrap();
        assert_eq!(doc.rows[0].join("|"), "1|x,y|3");
    }
}
