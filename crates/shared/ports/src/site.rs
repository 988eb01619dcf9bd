use async_trait::async_trait;

use crate::error::SiteError;

/// Port for the external static-site generator
///
/// Regeneration is a side effect of catalog changes; callers treat failures as
/// non-fatal.
#[async_trait]
pub trait SiteGenerator: Send + Sync {
    /// Rebuild the site, returning the generator's combined output
    async fn regenerate(&self) -> Result<String, SiteError>;

    /// Get the generator's name for logging
    fn name(&self) -> &str {
        "SiteGenerator"
    }
}
