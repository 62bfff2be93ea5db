use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;

use crate::{DocumentStore, StoreError};

/// Document persisted as a single JSON file, read and rewritten in full.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `default` if no document exists yet. Returns `true` when a file was created.
    pub async fn ensure_exists<D>(&self, default: &D) -> Result<bool, StoreError>
    where
        D: Serialize + Sync,
    {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(false),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|source| self.io_error(source))?;
                }
                self.write(default).await?;
                tracing::info!(path = %self.path.display(), "created empty document");
                Ok(true)
            }
            Err(source) => Err(self.io_error(source)),
        }
    }

    async fn write<D: Serialize + Sync>(&self, document: &D) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(document).map_err(StoreError::Encode)?;
        let len = bytes.len();

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || persist_atomically(&path, &bytes))
            .await
            .map_err(|join| self.io_error(std::io::Error::other(join)))?
            .map_err(|source| self.io_error(source))?;

        tracing::debug!(path = %self.path.display(), bytes = len, "document written");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Write `bytes` to a fresh staging file beside `path`, then rename it over `path`.
/// Each call gets its own staging file, so concurrent writers never share one and
/// readers only ever see a complete document.
fn persist_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staging = NamedTempFile::new_in(dir)?;
    staging.write_all(bytes)?;
    staging.as_file().sync_all()?;
    staging.persist(path).map_err(|err| err.error)?;
    Ok(())
}

#[async_trait]
impl<D> DocumentStore<D> for JsonFileStore
where
    D: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn load(&self) -> Result<D, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    path: self.path.clone(),
                })
            }
            Err(source) => return Err(self.io_error(source)),
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, document: &D) -> Result<(), StoreError> {
        self.write(document).await
    }
}
