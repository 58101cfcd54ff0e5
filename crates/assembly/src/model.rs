//! The produced presentation manifest: purely data, no render state.

use serde::{Deserialize, Serialize};

use reportdeck_config::{BorderRules, ChartKind, ShapeKind};

/// Rectangle in inches (the writer's unit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectIn {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageElement {
    pub path: String,
    pub frame: RectIn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeElement {
    pub kind: ShapeKind,
    pub frame: RectIn,
    /// Resolved fill color (hex), when any.
    pub fill: Option<String>,
    /// Resolved line color (hex), when any.
    pub line: Option<String>,
    pub shadow: bool,
}

/// One styled run within a text element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub font_size: Option<f64>,
    pub bold: bool,
    /// Resolved color (hex), when any.
    pub color: Option<String>,
    pub align: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub frame: RectIn,
    pub runs: Vec<TextRun>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableElement {
    pub frame: RectIn,
    /// One width per column, in inches.
    pub col_widths: Vec<f64>,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub borders: BorderRules,
    pub font_size: Option<f64>,
}

/// Role of a chart series (only meaningful for combo charts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeriesRole {
    Bar,
    Line,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
    pub color: Option<String>,
    pub role: SeriesRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartElement {
    pub kind: ChartKind,
    pub frame: RectIn,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub title: Option<String>,
    /// Whether the line series of a combo chart targets a secondary axis.
    pub secondary_axis: bool,
}

/// One assembled slide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    pub background: Option<String>,
    pub images: Vec<ImageElement>,
    pub shapes: Vec<ShapeElement>,
    pub texts: Vec<TextElement>,
    pub tables: Vec<TableElement>,
    pub charts: Vec<ChartElement>,
}

/// The full artifact handed to the external presentation writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationManifest {
    pub title: String,
    pub layout: String,
    pub slides: Vec<Slide>,
}
