//! Report assembly: walks a use case's slide manifest, binds view data into
//! declarative elements, and emits a language-neutral presentation manifest.
//!
//! Rendering the manifest into presentation bytes is delegated to an
//! external writer; nothing in here holds render state.

pub mod engine;
pub mod format;
pub mod model;
pub mod palette;

pub use engine::assemble;
pub use format::format_value;
pub use model::{
    ChartElement, ImageElement, PresentationManifest, RectIn, Series, SeriesRole, ShapeElement,
    Slide, TableElement, TextElement, TextRun,
};
