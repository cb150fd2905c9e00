//! Site and parameter metadata.

pub mod seed;
pub mod sqlite;

use crate::error::CatalogError;

pub use sqlite::SqliteCatalog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub site_id: i64,
    pub site_code: String,
}

/// Read side of the metadata store used by the pipeline.
pub trait MetadataStore {
    /// Sites registered for a source, ordered by site code.
    fn list_sites(&self, source_id: i64) -> Result<Vec<Site>, CatalogError>;

    /// Parameter codes configured for a site, ordered by code.
    fn list_parameters(&self, site_id: i64) -> Result<Vec<String>, CatalogError>;
}
