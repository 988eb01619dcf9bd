use crate::error::PersistenceError;

/// Where a persisted file lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StoreArea {
    /// Raw API description documents (served to the rendered site)
    Documents,
    /// Rendered human-readable companion artifacts
    Artifacts,
}

/// Port for on-disk persistence of catalog files
///
/// File names are already derived from the service name by the caller.
pub trait ArtifactStore: Send + Sync {
    /// Create or replace a file
    fn write(&self, area: StoreArea, file_name: &str, bytes: &[u8]) -> Result<(), PersistenceError>;

    /// Read a file back
    fn read(&self, area: StoreArea, file_name: &str) -> Result<Vec<u8>, PersistenceError>;

    /// Delete a file; a missing file is `PersistenceError::NotFound`
    fn delete(&self, area: StoreArea, file_name: &str) -> Result<(), PersistenceError>;
}
