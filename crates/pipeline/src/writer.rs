//! Boundary to the external presentation writer.

use async_trait::async_trait;
use thiserror::Error;

use reportdeck_assembly::PresentationManifest;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Serializes a presentation manifest into artifact bytes. Deployments plug
/// the real binary writer in here; it may be local or remote.
#[async_trait]
pub trait PresentationWriter: Send + Sync {
    async fn render(&self, manifest: &PresentationManifest) -> Result<Vec<u8>, RenderError>;
}

/// Default writer: emits the declarative manifest itself as JSON bytes.
pub struct ManifestBytesWriter;

#[async_trait]
impl PresentationWriter for ManifestBytesWriter {
    async fn render(&self, manifest: &PresentationManifest) -> Result<Vec<u8>, RenderError> {
        serde_json::to_vec(manifest).map_err(|err| RenderError::new(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manifest_writer_emits_bytes() {
        let manifest = PresentationManifest {
            title: "Export Report".to_string(),
            layout: "LAYOUT_WIDE".to_string(),
            slides: vec![],
        };
        let bytes = ManifestBytesWriter.render(&manifest).await.unwrap();
        assert!(!bytes.is_empty());
    }
}
