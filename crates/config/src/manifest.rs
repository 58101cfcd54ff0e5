//! Serde models for the declarative manifests.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use reportdeck_core::{ValueFormat, ViewType};

/// Workbook/site binding for one use case (`usecase-mapping.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseMeta {
    pub workbook_name: String,
    pub site_name: String,
}

/// One column of a view schema: logical field key, the CSV header it is
/// projected from, and how the value is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Logical field key used throughout the pipeline.
    pub field: String,
    /// Column header as it appears in the fetched CSV.
    pub column: String,
    /// Human-readable name used in table headers.
    pub display: String,
    pub format: ValueFormat,
    /// Columns not needed for the view are projected out.
    #[serde(default = "default_true")]
    pub needed: bool,
}

fn default_true() -> bool {
    true
}

/// Configuration of one remote view within a use case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Logical view key (binding key across fetch/transform/assembly).
    pub key: String,
    /// View name on the remote analytics server.
    pub name: String,
    #[serde(rename = "type")]
    pub view_type: ViewType,
    /// Ordered column schema.
    pub columns: Vec<ColumnSchema>,
    /// Filter keys this view consumes, in declaration order.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl ViewConfig {
    /// Columns that survive projection, in schema order.
    pub fn needed_columns(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter().filter(|c| c.needed)
    }
}

/// View catalog + filter bindings for one use case (`tableau-views.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UseCaseCatalog {
    /// Ordered list of views; catalog order drives fetch and output order.
    pub views: Vec<ViewConfig>,
    /// Logical filter key -> remote query parameter name.
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl UseCaseCatalog {
    pub fn view(&self, key: &str) -> Option<&ViewConfig> {
        self.views.iter().find(|v| v.key == key)
    }
}

// ---------------------------------------------------------------------------
// Slide manifest (`slide-view-mapping.json`)
// ---------------------------------------------------------------------------

/// Rectangle in centimetres, as authored in the manifest.
///
/// Converted to inches by the assembly engine (1 in = 2.54 cm).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectCm {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// Shape primitive kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShapeKind {
    Line,
    Rectangle,
    Circle,
}

/// Fill/line/shadow styling for a shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeStyle {
    #[serde(default)]
    pub fill: Option<String>,
    #[serde(default)]
    pub line: Option<String>,
    #[serde(default)]
    pub shadow: bool,
}

/// Inline style of a text segment. Colors and alignments are palette tokens
/// resolved by the assembly engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    #[serde(default)]
    pub font_size: Option<f64>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub align: Option<String>,
}

/// One segment of a text element: either a literal or a value bound from
/// view data by `value_key`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    #[serde(default)]
    pub text: Option<String>,
    /// View key whose flag-card value is substituted in.
    #[serde(default)]
    pub value_key: Option<String>,
    /// Format override applied when rendering a bound value.
    #[serde(default)]
    pub format: Option<ValueFormat>,
    /// Literal used when the bound view data is absent. Without a fallback
    /// the whole element is dropped.
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub options: TextStyle,
}

/// Table border rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorderRules {
    #[serde(default = "default_true")]
    pub outer: bool,
    #[serde(default = "default_true")]
    pub header_separator: bool,
    #[serde(default)]
    pub first_column_separator: bool,
    #[serde(default)]
    pub internal: bool,
}

impl Default for BorderRules {
    fn default() -> Self {
        Self {
            outer: true,
            header_separator: true,
            first_column_separator: false,
            internal: false,
        }
    }
}

/// Table element options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Explicit column widths in inches. When absent, widths are computed
    /// from content and scaled to `total_width`.
    #[serde(default)]
    pub col_widths: Option<Vec<f64>>,
    #[serde(default = "default_table_width")]
    pub total_width: f64,
    #[serde(default)]
    pub borders: BorderRules,
    #[serde(default)]
    pub font_size: Option<f64>,
}

fn default_table_width() -> f64 {
    11.0
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            col_widths: None,
            total_width: default_table_width(),
            borders: BorderRules::default(),
            font_size: None,
        }
    }
}

/// Chart family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    BarLine,
}

/// Chart element options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartOptions {
    /// For BAR_LINE: the field rendered as the line series. Defaults to the
    /// last numeric column.
    #[serde(default)]
    pub line_field: Option<String>,
    /// For BAR_LINE: whether the line series targets a secondary value axis.
    #[serde(default)]
    pub secondary_axis: bool,
    /// Series color tokens, resolved against the palette.
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// One declarative slide element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementDescriptor {
    Image {
        path: String,
        position: RectCm,
    },
    Shape {
        shape: ShapeKind,
        position: RectCm,
        #[serde(default)]
        style: ShapeStyle,
    },
    Text {
        position: RectCm,
        /// Shorthand for a single literal segment.
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        segments: Vec<TextSegment>,
        #[serde(default)]
        options: TextStyle,
    },
    Table {
        /// View key bound to a `Table` view data entry.
        data_key: String,
        position: RectCm,
        #[serde(default)]
        options: TableOptions,
    },
    Chart {
        /// View key bound to a `Table` view data entry.
        data_key: String,
        chart: ChartKind,
        position: RectCm,
        #[serde(default)]
        options: ChartOptions,
    },
}

/// One slide: a background reference plus an ordered element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideDescriptor {
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub elements: Vec<ElementDescriptor>,
}

/// Slide manifest for one use case. Immutable at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideManifest {
    pub title: String,
    #[serde(default = "default_layout")]
    pub layout: String,
    pub slides: Vec<SlideDescriptor>,
}

fn default_layout() -> String {
    "LAYOUT_WIDE".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_descriptors_deserialize_by_tag() {
        let json = serde_json::json!({
            "type": "CHART",
            "data_key": "CHANNEL_DATA",
            "chart": "BAR_LINE",
            "position": {"x": 1.0, "y": 2.0, "w": 20.0, "h": 10.0},
            "options": {"secondary_axis": true}
        });
        let el: ElementDescriptor = serde_json::from_value(json).unwrap();
        match el {
            ElementDescriptor::Chart { chart, options, .. } => {
                assert_eq!(chart, ChartKind::BarLine);
                assert!(options.secondary_axis);
            }
            other => panic!("unexpected element: {other:?}"),
        }
    }

    #[test]
    fn slide_manifest_defaults_layout() {
        let json = serde_json::json!({
            "title": "Export Report",
            "slides": []
        });
        let manifest: SlideManifest = serde_json::from_value(json).unwrap();
        assert_eq!(manifest.layout, "LAYOUT_WIDE");
    }

    #[test]
    fn column_schema_defaults_needed() {
        let json = serde_json::json!({
            "field": "SPEND",
            "column": "Total Spend",
            "display": "Spend",
            "format": "CURRENCY"
        });
        let col: ColumnSchema = serde_json::from_value(json).unwrap();
        assert!(col.needed);
    }
}
