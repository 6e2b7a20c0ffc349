//! `Database` trait: the document-store contract the onboarding core uses.
//!
//! Documents are JSON objects addressed by `(collection, id)`. Writes are
//! field-level merges: a partial write never clobbers fields it doesn't name.

use async_trait::async_trait;

use crate::error::DatabaseError;
use crate::onboarding::merge::Fields;

/// Backend-agnostic document store.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn init_schema(&self) -> Result<(), DatabaseError>;

    /// Fetch a document, or `None` if it doesn't exist.
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Fields>, DatabaseError>;

    /// Merge `fields` into a document, creating it if absent.
    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<(), DatabaseError>;

    /// Create a document only if none exists yet (first write wins).
    ///
    /// Returns `false`, without writing, when the document already exists.
    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<bool, DatabaseError>;
}
