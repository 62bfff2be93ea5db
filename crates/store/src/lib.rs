//! Whole-document storage for the bookshelf service.
//!
//! A store hands out the entire document on [`DocumentStore::load`] and replaces it
//! wholesale on [`DocumentStore::save`]. There is no record-level access and no
//! coordination between callers; serializing read-modify-write cycles is the
//! caller's job.

use async_trait::async_trait;

mod error;
mod file;
mod memory;

pub use error::StoreError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Capability to read and replace a single persisted document.
#[async_trait]
pub trait DocumentStore<D>: Send + Sync {
    /// Read the full document.
    async fn load(&self) -> Result<D, StoreError>;

    /// Replace the full document.
    async fn save(&self, document: &D) -> Result<(), StoreError>;
}
