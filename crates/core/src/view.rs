//! Typed view data produced by the transformer and consumed by assembly.

use serde::{Deserialize, Serialize};

use crate::format::ValueFormat;

/// Kind of remote view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewType {
    /// A single scalar with a label (one cell).
    FlagCard,
    /// A rectangular table of cells.
    Table,
}

/// A single typed cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Logical field key (schema key, not the CSV header).
    pub field: String,
    /// Normalized string value.
    pub value: String,
    /// Format used when the cell is rendered.
    pub format: ValueFormat,
}

impl Cell {
    pub fn new(field: impl Into<String>, value: impl Into<String>, format: ValueFormat) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            format,
        }
    }
}

/// Header of one table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableHeader {
    pub field: String,
    pub display_name: String,
    pub format: ValueFormat,
}

/// Shaped data for one view, keyed by view-key in the pipeline.
///
/// Table invariant: every row has exactly `headers.len()` cells, and only
/// fields marked as needed in the view schema appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewData {
    FlagCard(Cell),
    Table {
        headers: Vec<TableHeader>,
        rows: Vec<Vec<Cell>>,
    },
}

impl ViewData {
    /// The scalar cell, when this is a flag card.
    pub fn as_flag_card(&self) -> Option<&Cell> {
        match self {
            ViewData::FlagCard(cell) => Some(cell),
            ViewData::Table { .. } => None,
        }
    }

    /// Headers and rows, when this is a table.
    pub fn as_table(&self) -> Option<(&[TableHeader], &[Vec<Cell>])> {
        match self {
            ViewData::Table { headers, rows } => Some((headers, rows)),
            ViewData::FlagCard(_) => None,
        }
    }

    /// Check the rectangularity invariant (always true for flag cards).
    pub fn is_rectangular(&self) -> bool {
        match self {
            ViewData::FlagCard(_) => true,
            ViewData::Table { headers, rows } => {
                rows.iter().all(|r| r.len() == headers.len())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangularity_holds_for_well_formed_tables() {
        let table = ViewData::Table {
            headers: vec![
                TableHeader {
                    field: "CHANNEL".into(),
                    display_name: "Channel".into(),
                    format: ValueFormat::String,
                },
                TableHeader {
                    field: "SPEND".into(),
                    display_name: "Spend".into(),
                    format: ValueFormat::Currency,
                },
            ],
            rows: vec![vec![
                Cell::new("CHANNEL", "CTV", ValueFormat::String),
                Cell::new("SPEND", "1234", ValueFormat::Currency),
            ]],
        };
        assert!(table.is_rectangular());
    }

    #[test]
    fn rectangularity_detects_ragged_rows() {
        let table = ViewData::Table {
            headers: vec![TableHeader {
                field: "A".into(),
                display_name: "A".into(),
                format: ValueFormat::String,
            }],
            rows: vec![vec![]],
        };
        assert!(!table.is_rectangular());
    }

    #[test]
    fn accessors_match_variants() {
        let card = ViewData::FlagCard(Cell::new("TOTAL", "42", ValueFormat::Number));
        assert!(card.as_flag_card().is_some());
        assert!(card.as_table().is_none());
    }
}
