//! Startup-loaded, read-only configuration registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use reportdeck_core::{DomainError, DomainResult};

use crate::manifest::{SlideManifest, UseCaseCatalog, UseCaseMeta};

/// Manifest file names expected under the config directory.
const USECASE_MAPPING_FILE: &str = "usecase-mapping.json";
const VIEW_CATALOG_FILE: &str = "tableau-views.json";
const SLIDE_MANIFEST_FILE: &str = "slide-view-mapping.json";

/// Error loading or validating the manifests. Any of these fails startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("use case {use_case} referenced in {manifest} has no entry in {missing_from}")]
    DanglingUseCase {
        use_case: String,
        manifest: &'static str,
        missing_from: &'static str,
    },
}

/// The three lookups the rest of the system sees. Built once at startup,
/// read-only afterwards; all lookups are pure.
#[derive(Debug, Clone)]
pub struct Registry {
    use_cases: HashMap<String, UseCaseMeta>,
    catalogs: HashMap<String, UseCaseCatalog>,
    slides: HashMap<String, SlideManifest>,
}

impl Registry {
    /// Load all three manifests from a directory.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let dir = dir.as_ref();
        let use_cases = read_manifest(&dir.join(USECASE_MAPPING_FILE))?;
        let catalogs = read_manifest(&dir.join(VIEW_CATALOG_FILE))?;
        let slides = read_manifest(&dir.join(SLIDE_MANIFEST_FILE))?;

        let registry = Self::from_parts(use_cases, catalogs, slides)?;
        info!(
            use_cases = registry.use_cases.len(),
            dir = %dir.display(),
            "configuration registry loaded"
        );
        Ok(registry)
    }

    /// Build a registry from already-parsed manifests (used in tests).
    pub fn from_parts(
        use_cases: HashMap<String, UseCaseMeta>,
        catalogs: HashMap<String, UseCaseCatalog>,
        slides: HashMap<String, SlideManifest>,
    ) -> Result<Self, ConfigError> {
        for key in catalogs.keys() {
            if !use_cases.contains_key(key) {
                return Err(ConfigError::DanglingUseCase {
                    use_case: key.clone(),
                    manifest: VIEW_CATALOG_FILE,
                    missing_from: USECASE_MAPPING_FILE,
                });
            }
        }
        for key in slides.keys() {
            if !use_cases.contains_key(key) {
                return Err(ConfigError::DanglingUseCase {
                    use_case: key.clone(),
                    manifest: SLIDE_MANIFEST_FILE,
                    missing_from: USECASE_MAPPING_FILE,
                });
            }
        }
        Ok(Self {
            use_cases,
            catalogs,
            slides,
        })
    }

    /// Workbook/site binding for a use case.
    pub fn use_case_meta(&self, use_case: &str) -> DomainResult<&UseCaseMeta> {
        self.use_cases
            .get(use_case)
            .ok_or_else(|| DomainError::use_case_not_found(use_case))
    }

    /// Ordered view catalog for a use case.
    pub fn view_catalog(&self, use_case: &str) -> DomainResult<&UseCaseCatalog> {
        self.catalogs
            .get(use_case)
            .ok_or_else(|| DomainError::use_case_not_found(use_case))
    }

    /// Configuration of one view within a use case.
    pub fn view_config(&self, use_case: &str, view_key: &str) -> DomainResult<&crate::manifest::ViewConfig> {
        self.view_catalog(use_case)?
            .view(view_key)
            .ok_or_else(|| DomainError::view_config_missing(view_key))
    }

    /// Slide manifest for a use case.
    pub fn slide_manifest(&self, use_case: &str) -> DomainResult<&SlideManifest> {
        self.slides
            .get(use_case)
            .ok_or_else(|| DomainError::use_case_not_found(use_case))
    }

    /// Whether a use case is configured (meta + catalog + slides).
    pub fn contains(&self, use_case: &str) -> bool {
        self.use_cases.contains_key(use_case)
            && self.catalogs.contains_key(use_case)
            && self.slides.contains_key(use_case)
    }

    pub fn known_use_cases(&self) -> impl Iterator<Item = &str> {
        self.use_cases.keys().map(String::as_str)
    }
}

fn read_manifest<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
