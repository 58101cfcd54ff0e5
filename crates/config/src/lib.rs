//! Use-case configuration: manifest models and the startup registry.
//!
//! Three declarative JSON manifests are read once at startup:
//! - `usecase-mapping.json`: use case -> workbook/site
//! - `tableau-views.json`: use case -> view catalog + filter bindings
//! - `slide-view-mapping.json`: use case -> slide manifest
//!
//! The [`Registry`] built from them is immutable and shared read-only across
//! the process.

pub mod manifest;
pub mod registry;

pub use manifest::{
    BorderRules, ChartKind, ChartOptions, ColumnSchema, ElementDescriptor, RectCm, ShapeKind,
    ShapeStyle, SlideDescriptor, SlideManifest, TableOptions, TextSegment, TextStyle,
    UseCaseCatalog, UseCaseMeta, ViewConfig,
};
pub use registry::{ConfigError, Registry};
