//! Schema-driven projection of CSV payloads into typed view data.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use reportdeck_config::{UseCaseCatalog, ViewConfig};
use reportdeck_core::{format, Cell, TableHeader, ViewData, ViewType};

use crate::parse::parse_csv;

/// Error shaping one view. Individual failures are logged and excluded from
/// the aggregate result; only the fully-empty aggregate is fatal upstream.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("csv decode failed: {0}")]
    Csv(#[from] csv::Error),
}

/// One view to fetch: remote name, binding key, bound filter parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    pub view_key: String,
    pub view_name: String,
    /// Remote query parameter name -> value, in catalog filter order.
    pub filter_params: Vec<(String, String)>,
}

/// Enumerate the views of a use case with their filter values bound.
///
/// Ordering follows the catalog. Filter keys declared by a view but not
/// present in the submitted filters are omitted; submitted filters with no
/// configured binding are ignored with a warning.
pub fn build_view_configs(
    catalog: &UseCaseCatalog,
    filters: &HashMap<String, String>,
) -> Vec<FetchSpec> {
    for key in filters.keys() {
        if !catalog.filters.contains_key(key) {
            warn!(filter_key = %key, "submitted filter has no configured binding, ignoring");
        }
    }

    catalog
        .views
        .iter()
        .map(|view| {
            let mut params = Vec::new();
            for filter_key in &view.filters {
                let Some(param_name) = catalog.filters.get(filter_key) else {
                    warn!(
                        view_key = %view.key,
                        filter_key = %filter_key,
                        "view declares filter key with no binding, skipping"
                    );
                    continue;
                };
                if let Some(value) = filters.get(filter_key) {
                    params.push((param_name.clone(), value.clone()));
                }
            }
            FetchSpec {
                view_key: view.key.clone(),
                view_name: view.name.clone(),
                filter_params: params,
            }
        })
        .collect()
}

/// Shape one view's CSV payload into [`ViewData`].
///
/// Returns `Ok(None)` when the payload holds no usable data (no records, no
/// resolvable columns, or no surviving rows for a flag card).
pub fn transform(view: &ViewConfig, csv_text: &str) -> Result<Option<ViewData>, TransformError> {
    let Some(doc) = parse_csv(csv_text)? else {
        debug!(view_key = %view.key, "empty csv payload");
        return Ok(None);
    };

    // Resolve each needed schema column to its CSV column index. Missing
    // columns are skipped, not fatal.
    let mut projection: Vec<(usize, &reportdeck_config::ColumnSchema)> = Vec::new();
    for column in view.needed_columns() {
        match doc.headers.iter().position(|h| h.trim() == column.column) {
            Some(idx) => projection.push((idx, column)),
            None => warn!(
                view_key = %view.key,
                column = %column.column,
                "schema column missing from csv, skipping"
            ),
        }
    }
    if projection.is_empty() {
        warn!(view_key = %view.key, "no schema columns resolved, dropping view");
        return Ok(None);
    }

    // Ordered row maps keyed by field, with per-format normalization.
    // Rows where every projected cell is empty are dropped.
    let rows: Vec<Vec<Cell>> = doc
        .rows
        .iter()
        .map(|raw| {
            projection
                .iter()
                .map(|(idx, column)| {
                    let cell = raw.get(*idx).map(String::as_str).unwrap_or("");
                    Cell::new(
                        column.field.clone(),
                        format::normalize(cell, column.format),
                        column.format,
                    )
                })
                .collect::<Vec<_>>()
        })
        .filter(|cells| cells.iter().any(|c| !c.value.is_empty()))
        .collect();

    match view.view_type {
        ViewType::FlagCard => {
            let Some(first) = rows.into_iter().next() else {
                debug!(view_key = %view.key, "flag card has no data rows");
                return Ok(None);
            };
            // The first projected field carries the scalar.
            Ok(first.into_iter().next().map(ViewData::FlagCard))
        }
        ViewType::Table => {
            let headers = projection
                .iter()
                .map(|(_, column)| TableHeader {
                    field: column.field.clone(),
                    display_name: column.display.clone(),
                    format: column.format,
                })
                .collect();
            Ok(Some(ViewData::Table { headers, rows }))
        }
    }
}

/// Shape every fetched view of a use case.
///
/// Per-view failures are logged and excluded; the result may be empty, which
/// the orchestrator treats as fatal when the input was non-empty.
pub fn transform_all(
    catalog: &UseCaseCatalog,
    raw: &HashMap<String, String>,
) -> HashMap<String, ViewData> {
    let mut shaped = HashMap::new();
    for view in &catalog.views {
        let Some(csv_text) = raw.get(&view.key) else {
            continue;
        };
        match transform(view, csv_text) {
            Ok(Some(data)) => {
                shaped.insert(view.key.clone(), data);
            }
            Ok(None) => {
                warn!(view_key = %view.key, "view produced no data, excluded from result");
            }
            Err(err) => {
                warn!(view_key = %view.key, error = %err, "view transform failed, excluded from result");
            }
        }
    }
    shaped
}
