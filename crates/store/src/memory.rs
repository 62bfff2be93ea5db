use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{DocumentStore, StoreError};

/// In-process store holding the document behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore<D> {
    document: Mutex<D>,
}

impl<D> MemoryStore<D> {
    pub fn new(document: D) -> Self {
        Self {
            document: Mutex::new(document),
        }
    }

    pub fn into_inner(self) -> D {
        self.document.into_inner()
    }
}

impl<D: Clone> MemoryStore<D> {
    /// Copy of the current document.
    pub fn snapshot(&self) -> D {
        self.document.lock().clone()
    }
}

#[async_trait]
impl<D> DocumentStore<D> for MemoryStore<D>
where
    D: Clone + Send + Sync + 'static,
{
    async fn load(&self) -> Result<D, StoreError> {
        Ok(self.document.lock().clone())
    }

    async fn save(&self, document: &D) -> Result<(), StoreError> {
        *self.document.lock() = document.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_replaces_whole_document() {
        let store = MemoryStore::new(vec![1, 2, 3]);
        store.save(&vec![4]).await.unwrap();

        assert_eq!(store.load().await.unwrap(), vec![4]);
        assert_eq!(store.into_inner(), vec![4]);
    }
}
