//! The manifest interpreter: descriptor in, assembled element out.
//!
//! Element assembly is lossy by design: a descriptor whose data binding
//! cannot be satisfied is dropped with a warning, never a failure. The slide
//! itself (background and remaining elements) always emits.

use std::collections::HashMap;

use tracing::warn;

use reportdeck_config::{
    ChartKind, ChartOptions, ElementDescriptor, RectCm, SlideManifest, TableOptions, TextSegment,
    TextStyle,
};
use reportdeck_core::{TableHeader, ValueFormat, ViewData};

use crate::format::{format_value, parse_numeric};
use crate::model::{
    ChartElement, ImageElement, PresentationManifest, RectIn, Series, SeriesRole, ShapeElement,
    Slide, TableElement, TextElement, TextRun,
};
use crate::palette;

const CM_PER_INCH: f64 = 2.54;

/// Convert a manifest rectangle (centimetres) into writer units (inches).
fn to_inches(rect: &RectCm) -> RectIn {
    RectIn {
        x: rect.x / CM_PER_INCH,
        y: rect.y / CM_PER_INCH,
        w: rect.w / CM_PER_INCH,
        h: rect.h / CM_PER_INCH,
    }
}

/// Walk the slide manifest and emit the presentation manifest.
pub fn assemble(
    manifest: &SlideManifest,
    view_data: &HashMap<String, ViewData>,
) -> PresentationManifest {
    let slides = manifest
        .slides
        .iter()
        .map(|descriptor| {
            let mut slide = Slide {
                background: descriptor.background.clone(),
                ..Slide::default()
            };
            for element in &descriptor.elements {
                emit_element(element, view_data, &mut slide);
            }
            slide
        })
        .collect();

    PresentationManifest {
        title: manifest.title.clone(),
        layout: manifest.layout.clone(),
        slides,
    }
}

fn emit_element(
    element: &ElementDescriptor,
    view_data: &HashMap<String, ViewData>,
    slide: &mut Slide,
) {
    match element {
        ElementDescriptor::Image { path, position } => {
            slide.images.push(ImageElement {
                path: path.clone(),
                frame: to_inches(position),
            });
        }
        ElementDescriptor::Shape {
            shape,
            position,
            style,
        } => {
            slide.shapes.push(ShapeElement {
                kind: *shape,
                frame: to_inches(position),
                fill: style.fill.as_deref().and_then(palette::resolve_color),
                line: style.line.as_deref().and_then(palette::resolve_color),
                shadow: style.shadow,
            });
        }
        ElementDescriptor::Text {
            position,
            text,
            segments,
            options,
        } => {
            // A bare string is shorthand for a single literal segment.
            let shorthand;
            let segments = match (text, segments.is_empty()) {
                (Some(text), true) => {
                    shorthand = vec![TextSegment {
                        text: Some(text.clone()),
                        ..TextSegment::default()
                    }];
                    &shorthand
                }
                _ => segments,
            };
            if let Some(runs) = resolve_text_runs(segments, options, view_data) {
                slide.texts.push(TextElement {
                    frame: to_inches(position),
                    runs,
                });
            }
        }
        ElementDescriptor::Table {
            data_key,
            position,
            options,
        } => {
            match view_data.get(data_key).and_then(ViewData::as_table) {
                Some((headers, rows)) => {
                    slide
                        .tables
                        .push(build_table(headers, rows, position, options));
                }
                None => warn!(data_key = %data_key, "table data missing, element dropped"),
            }
        }
        ElementDescriptor::Chart {
            data_key,
            chart,
            position,
            options,
        } => {
            match view_data.get(data_key).and_then(ViewData::as_table) {
                Some((headers, rows)) => {
                    slide
                        .charts
                        .push(build_chart(headers, rows, *chart, position, options));
                }
                None => warn!(data_key = %data_key, "chart data missing, element dropped"),
            }
        }
    }
}

/// Resolve text segments into styled runs.
///
/// A bound segment with no data and no fallback drops the whole element.
fn resolve_text_runs(
    segments: &[TextSegment],
    element_style: &TextStyle,
    view_data: &HashMap<String, ViewData>,
) -> Option<Vec<TextRun>> {
    let mut runs = Vec::with_capacity(segments.len());
    for segment in segments {
        let text = match (&segment.value_key, &segment.text) {
            (Some(value_key), _) => {
                match view_data.get(value_key).and_then(ViewData::as_flag_card) {
                    Some(cell) => {
                        let format = segment.format.unwrap_or(cell.format);
                        format_value(&cell.value, format)
                    }
                    None => match &segment.fallback {
                        Some(fallback) => fallback.clone(),
                        None => {
                            warn!(value_key = %value_key, "bound value missing and no fallback, text element dropped");
                            return None;
                        }
                    },
                }
            }
            (None, Some(text)) => text.clone(),
            (None, None) => String::new(),
        };

        let style = merge_styles(element_style, &segment.options);
        runs.push(TextRun {
            text,
            font_size: style.font_size,
            bold: style.bold,
            color: style.color.as_deref().and_then(palette::resolve_color),
            align: style.align.as_deref().and_then(palette::resolve_align),
        });
    }
    Some(runs)
}

/// Segment style wins over element style, field by field.
fn merge_styles(element: &TextStyle, segment: &TextStyle) -> TextStyle {
    TextStyle {
        font_size: segment.font_size.or(element.font_size),
        bold: segment.bold || element.bold,
        color: segment.color.clone().or_else(|| element.color.clone()),
        align: segment.align.clone().or_else(|| element.align.clone()),
    }
}

fn build_table(
    headers: &[TableHeader],
    rows: &[Vec<reportdeck_core::Cell>],
    position: &RectCm,
    options: &TableOptions,
) -> TableElement {
    let header: Vec<String> = headers.iter().map(|h| h.display_name.clone()).collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| format_value(&cell.value, cell.format))
                .collect()
        })
        .collect();

    let col_widths = match &options.col_widths {
        Some(explicit) if explicit.len() == header.len() => explicit.clone(),
        Some(explicit) => {
            warn!(
                expected = header.len(),
                got = explicit.len(),
                "explicit column widths do not match column count, computing dynamically"
            );
            fit_col_widths(&header, &body, options.total_width)
        }
        None => fit_col_widths(&header, &body, options.total_width),
    };

    TableElement {
        frame: to_inches(position),
        col_widths,
        header,
        rows: body,
        borders: options.borders.clone(),
        font_size: options.font_size,
    }
}

/// Column widths proportional to each column's widest cell, scaled so the
/// sum equals `total_width`.
fn fit_col_widths(header: &[String], rows: &[Vec<String>], total_width: f64) -> Vec<f64> {
    if header.is_empty() {
        return Vec::new();
    }
    let widest: Vec<f64> = (0..header.len())
        .map(|col| {
            let content_max = rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            content_max.max(header[col].chars().count()).max(1) as f64
        })
        .collect();
    let sum: f64 = widest.iter().sum();
    widest.into_iter().map(|w| w / sum * total_width).collect()
}

fn build_chart(
    headers: &[TableHeader],
    rows: &[Vec<reportdeck_core::Cell>],
    kind: ChartKind,
    position: &RectCm,
    options: &ChartOptions,
) -> ChartElement {
    // Category axis: first string column, or 1-based row indices.
    let category_col = headers
        .iter()
        .position(|h| h.format == ValueFormat::String);
    let categories: Vec<String> = match category_col {
        Some(col) => rows
            .iter()
            .map(|row| row.get(col).map(|c| c.value.clone()).unwrap_or_default())
            .collect(),
        None => (1..=rows.len()).map(|i| i.to_string()).collect(),
    };

    // Every numeric column becomes a series, in header order.
    let numeric_cols: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.format.is_numeric())
        .map(|(i, _)| i)
        .collect();

    // For combo charts one series is the line: the configured field, or the
    // last numeric column.
    let line_col = match kind {
        ChartKind::BarLine => options
            .line_field
            .as_ref()
            .and_then(|field| {
                numeric_cols
                    .iter()
                    .copied()
                    .find(|&col| headers[col].field == *field)
            })
            .or_else(|| numeric_cols.last().copied()),
        ChartKind::Line => None, // every series is a line
        _ => None,
    };

    let series: Vec<Series> = numeric_cols
        .iter()
        .enumerate()
        .map(|(series_idx, &col)| {
            let values = rows
                .iter()
                .map(|row| {
                    let raw = row.get(col).map(|c| c.value.as_str()).unwrap_or("");
                    parse_numeric(raw).unwrap_or_else(|| {
                        if !raw.is_empty() {
                            warn!(column = %headers[col].field, value = %raw, "non-numeric chart cell coerced to 0");
                        }
                        0.0
                    })
                })
                .collect();

            let role = match kind {
                ChartKind::Line => SeriesRole::Line,
                ChartKind::BarLine if Some(col) == line_col => SeriesRole::Line,
                _ => SeriesRole::Bar,
            };

            let color = options
                .colors
                .get(series_idx)
                .map(String::as_str)
                .or_else(|| palette::DEFAULT_SERIES_COLORS.get(series_idx).copied())
                .and_then(palette::resolve_color);

            Series {
                name: headers[col].display_name.clone(),
                values,
                color,
                role,
            }
        })
        .collect();

    ChartElement {
        kind,
        frame: to_inches(position),
        categories,
        series,
        title: options.title.clone(),
        secondary_axis: kind == ChartKind::BarLine && options.secondary_axis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportdeck_config::{BorderRules, ShapeKind, ShapeStyle, SlideDescriptor};
    use reportdeck_core::Cell;

    fn rect() -> RectCm {
        RectCm {
            x: 2.54,
            y: 5.08,
            w: 25.4,
            h: 12.7,
        }
    }

    fn channel_table() -> ViewData {
        ViewData::Table {
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
                TableHeader {
                    field: "CTR".into(),
                    display_name: "CTR".into(),
                    format: ValueFormat::Percentage,
                },
            ],
            rows: vec![
                vec![
                    Cell::new("CHANNEL", "CTV", ValueFormat::String),
                    Cell::new("SPEND", "1200", ValueFormat::Currency),
                    Cell::new("CTR", "1.25", ValueFormat::Percentage),
                ],
                vec![
                    Cell::new("CHANNEL", "Display", ValueFormat::String),
                    Cell::new("SPEND", "3400", ValueFormat::Currency),
                    Cell::new("CTR", "0.75", ValueFormat::Percentage),
                ],
            ],
        }
    }

    fn data_with(key: &str, data: ViewData) -> HashMap<String, ViewData> {
        [(key.to_string(), data)].into_iter().collect()
    }

    fn manifest_with(elements: Vec<ElementDescriptor>) -> SlideManifest {
        SlideManifest {
            title: "Export Report".into(),
            layout: "LAYOUT_WIDE".into(),
            slides: vec![SlideDescriptor {
                background: Some("assets/background.png".into()),
                elements,
            }],
        }
    }

    #[test]
    fn centimetres_convert_to_inches() {
        let frame = to_inches(&rect());
        assert!((frame.x - 1.0).abs() < 1e-9);
        assert!((frame.y - 2.0).abs() < 1e-9);
        assert!((frame.w - 10.0).abs() < 1e-9);
        assert!((frame.h - 5.0).abs() < 1e-9);
    }

    #[test]
    fn slide_emits_background_and_static_elements() {
        let manifest = manifest_with(vec![
            ElementDescriptor::Image {
                path: "assets/logo.png".into(),
                position: rect(),
            },
            ElementDescriptor::Shape {
                shape: ShapeKind::Rectangle,
                position: rect(),
                style: ShapeStyle {
                    fill: Some("primary".into()),
                    line: None,
                    shadow: true,
                },
            },
        ]);

        let deck = assemble(&manifest, &HashMap::new());
        assert_eq!(deck.slides.len(), 1);
        let slide = &deck.slides[0];
        assert_eq!(slide.background.as_deref(), Some("assets/background.png"));
        assert_eq!(slide.images.len(), 1);
        assert_eq!(slide.shapes[0].fill.as_deref(), Some("1F4E79"));
        assert!(slide.shapes[0].shadow);
    }

    #[test]
    fn bound_text_formats_the_flag_card_value() {
        let manifest = manifest_with(vec![ElementDescriptor::Text {
            position: rect(),
            text: None,
            segments: vec![
                TextSegment {
                    text: Some("Total spend: ".into()),
                    ..TextSegment::default()
                },
                TextSegment {
                    value_key: Some("TOTAL_SPEND".into()),
                    ..TextSegment::default()
                },
            ],
            options: TextStyle::default(),
        }]);
        let data = data_with(
            "TOTAL_SPEND",
            ViewData::FlagCard(Cell::new("TOTAL_SPEND", "1234567", ValueFormat::Currency)),
        );

        let deck = assemble(&manifest, &data);
        let runs = &deck.slides[0].texts[0].runs;
        assert_eq!(runs[0].text, "Total spend: ");
        assert_eq!(runs[1].text, "$1,234,567");
    }

    #[test]
    fn missing_binding_without_fallback_drops_the_element() {
        let manifest = manifest_with(vec![ElementDescriptor::Text {
            position: rect(),
            text: None,
            segments: vec![TextSegment {
                value_key: Some("MISSING".into()),
                ..TextSegment::default()
            }],
            options: TextStyle::default(),
        }]);

        let deck = assemble(&manifest, &HashMap::new());
        assert!(deck.slides[0].texts.is_empty());
        // Slide itself still emits.
        assert_eq!(deck.slides.len(), 1);
    }

    #[test]
    fn missing_binding_with_fallback_uses_it() {
        let manifest = manifest_with(vec![ElementDescriptor::Text {
            position: rect(),
            text: None,
            segments: vec![TextSegment {
                value_key: Some("MISSING".into()),
                fallback: Some("n/a".into()),
                ..TextSegment::default()
            }],
            options: TextStyle::default(),
        }]);

        let deck = assemble(&manifest, &HashMap::new());
        assert_eq!(deck.slides[0].texts[0].runs[0].text, "n/a");
    }

    #[test]
    fn table_rows_match_header_width_and_values_are_formatted() {
        let manifest = manifest_with(vec![ElementDescriptor::Table {
            data_key: "CHANNEL_DATA".into(),
            position: rect(),
            options: TableOptions::default(),
        }]);
        let deck = assemble(&manifest, &data_with("CHANNEL_DATA", channel_table()));

        let table = &deck.slides[0].tables[0];
        assert_eq!(table.header, vec!["Channel", "Spend", "CTR"]);
        for row in &table.rows {
            assert_eq!(row.len(), table.header.len());
        }
        assert_eq!(table.rows[0][1], "$1,200");
        assert_eq!(table.rows[1][2], "0.75%");
        assert_eq!(table.col_widths.len(), 3);
    }

    #[test]
    fn dynamic_widths_scale_to_total() {
        let widths = fit_col_widths(
            &["A".into(), "Long header".into()],
            &[vec!["x".into(), "y".into()]],
            12.0,
        );
        let sum: f64 = widths.iter().sum();
        assert!((sum - 12.0).abs() < 1e-9);
        assert!(widths[1] > widths[0]);
    }

    #[test]
    fn explicit_widths_pass_through_when_they_match() {
        let manifest = manifest_with(vec![ElementDescriptor::Table {
            data_key: "CHANNEL_DATA".into(),
            position: rect(),
            options: TableOptions {
                col_widths: Some(vec![2.0, 4.0, 3.0]),
                total_width: 9.0,
                borders: BorderRules::default(),
                font_size: None,
            },
        }]);
        let deck = assemble(&manifest, &data_with("CHANNEL_DATA", channel_table()));
        assert_eq!(deck.slides[0].tables[0].col_widths, vec![2.0, 4.0, 3.0]);
    }

    #[test]
    fn table_bound_to_missing_data_is_dropped_with_slide_intact() {
        let manifest = manifest_with(vec![ElementDescriptor::Table {
            data_key: "NOPE".into(),
            position: rect(),
            options: TableOptions::default(),
        }]);
        let deck = assemble(&manifest, &HashMap::new());
        assert!(deck.slides[0].tables.is_empty());
        assert_eq!(
            deck.slides[0].background.as_deref(),
            Some("assets/background.png")
        );
    }

    #[test]
    fn bar_chart_extracts_categories_and_series() {
        let manifest = manifest_with(vec![ElementDescriptor::Chart {
            data_key: "CHANNEL_DATA".into(),
            chart: ChartKind::Bar,
            position: rect(),
            options: ChartOptions::default(),
        }]);
        let deck = assemble(&manifest, &data_with("CHANNEL_DATA", channel_table()));

        let chart = &deck.slides[0].charts[0];
        assert_eq!(chart.categories, vec!["CTV", "Display"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "Spend");
        assert_eq!(chart.series[0].values, vec![1200.0, 3400.0]);
        assert!(chart.series.iter().all(|s| s.role == SeriesRole::Bar));
        assert!(!chart.secondary_axis);
    }

    #[test]
    fn combo_chart_marks_the_line_series() {
        let manifest = manifest_with(vec![ElementDescriptor::Chart {
            data_key: "CHANNEL_DATA".into(),
            chart: ChartKind::BarLine,
            position: rect(),
            options: ChartOptions {
                secondary_axis: true,
                ..ChartOptions::default()
            },
        }]);
        let deck = assemble(&manifest, &data_with("CHANNEL_DATA", channel_table()));

        let chart = &deck.slides[0].charts[0];
        // Last numeric column (CTR) defaults to the line.
        assert_eq!(chart.series[0].role, SeriesRole::Bar);
        assert_eq!(chart.series[1].role, SeriesRole::Line);
        assert!(chart.secondary_axis);
    }

    #[test]
    fn non_numeric_chart_cells_coerce_to_zero() {
        let data = ViewData::Table {
            headers: vec![
                TableHeader {
                    field: "LABEL".into(),
                    display_name: "Label".into(),
                    format: ValueFormat::String,
                },
                TableHeader {
                    field: "N".into(),
                    display_name: "N".into(),
                    format: ValueFormat::Number,
                },
            ],
            rows: vec![vec![
                Cell::new("LABEL", "a", ValueFormat::String),
                Cell::new("N", "oops", ValueFormat::Number),
            ]],
        };
        let manifest = manifest_with(vec![ElementDescriptor::Chart {
            data_key: "D".into(),
            chart: ChartKind::Pie,
            position: rect(),
            options: ChartOptions::default(),
        }]);
        let deck = assemble(&manifest, &data_with("D", data));
        assert_eq!(deck.slides[0].charts[0].series[0].values, vec![0.0]);
    }
}
