//! Declarative transformation engine: raw CSV payloads in, typed view data
//! out, driven entirely by the view catalog.

pub mod parse;
pub mod transformer;

pub use parse::{parse_csv, CsvDocument};
pub use transformer::{
    build_view_configs, transform, transform_all, FetchSpec, TransformError,
};
