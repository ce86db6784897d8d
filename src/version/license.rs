//! License metadata zipping and ordering

use std::cmp::Ordering;

use serde::Serialize;
use tracing::error;

use crate::version::error::StoreError;

/// Type and location of a license file within a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LicenseMetadata {
    #[serde(rename = "type")]
    pub license_type: String,
    pub file_path: String,
}

impl LicenseMetadata {
    pub fn new(license_type: &str, file_path: &str) -> Self {
        Self {
            license_type: license_type.to_string(),
            file_path: file_path.to_string(),
        }
    }

    /// Number of `/`-separated components of the file path
    pub fn depth(&self) -> usize {
        self.file_path.split('/').count()
    }
}

/// A license file with its contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct License {
    #[serde(flatten)]
    pub metadata: LicenseMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<u8>,
}

/// License display order: deeper files first, then path ascending, then type
/// ascending.
pub fn compare_licenses(a: &LicenseMetadata, b: &LicenseMetadata) -> Ordering {
    b.depth()
        .cmp(&a.depth())
        .then_with(|| a.file_path.cmp(&b.file_path))
        .then_with(|| a.license_type.cmp(&b.license_type))
}

pub fn sort_licenses(licenses: &mut [License]) {
    licenses.sort_by(|a, b| compare_licenses(&a.metadata, &b.metadata));
}

/// Pair license types with license paths by position and sort the result.
///
/// Both lists come from one storage projection, so a length mismatch is a
/// data-integrity bug rather than bad input.
pub fn zip_license_metadata(
    license_types: &[String],
    license_paths: &[String],
) -> Result<Vec<LicenseMetadata>, StoreError> {
    if license_types.len() != license_paths.len() {
        error!(
            ?license_types,
            ?license_paths,
            "license types and paths have different lengths"
        );
        return Err(StoreError::Inconsistency(format!(
            "got {} license types and {} license paths",
            license_types.len(),
            license_paths.len()
        )));
    }

    let mut metadata: Vec<LicenseMetadata> = license_types
        .iter()
        .zip(license_paths)
        .map(|(t, p)| LicenseMetadata::new(t, p))
        .collect();
    metadata.sort_by(compare_licenses);
    Ok(metadata)
}
