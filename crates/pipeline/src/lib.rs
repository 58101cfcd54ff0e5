//! Orchestration of one report job: config, fetch, transform, assembly,
//! render, email.

pub mod emails;
pub mod error;
pub mod processor;
pub mod writer;

pub use error::PipelineError;
pub use processor::{ReportProcessor, ViewSource};
pub use writer::{ManifestBytesWriter, PresentationWriter, RenderError};
