//! A JSON file-backed implementation of the [`BootStore`][super::BootStore] trait.
//!
//! Wraps a [`InMemoryBootStore`][super::memory::InMemoryBootStore] instance, loading its
//! catalog from a JSON document on disk that can be re-read without a restart.
use crate::boot_store::memory::InMemoryBootStore;
use crate::boot_store::BootStore;
use crate::catalog::{Catalog, CatalogDocument};
use crate::error::Error;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// A file-backed boot store. The whole document is validated on every load, and a document that
/// fails validation never replaces the catalog currently being served.
///
/// Wraps a [`InMemoryBootStore`][super::memory::InMemoryBootStore], operating the same way
/// except for being able to reload from disk.
#[derive(Default, Debug, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct FileBootStore {
    boot_store: InMemoryBootStore,
    path: String,
}

impl FileBootStore {
    /// Load a [`FileBootStore`] from the JSON catalog located at the given path, or return an
    /// Error. A missing file is created holding an empty catalog.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidJSON`] if the document is invalid JSON or invalid boot data.
    ///
    /// Returns [`Error::IO`] if the path can't be opened, created or read.
    pub async fn try_from_file(p: &str) -> Result<Self, Error> {
        let contents = match File::open(p).await {
            Ok(f) => Self::read_all(f).await?,
            Err(err) => match err.kind() {
                ErrorKind::NotFound => Self::write_empty_state(File::create(&p).await?).await?,
                _ => return Err(Error::IO(err)),
            },
        };

        let catalog: Catalog = serde_json::from_slice(&contents)?;
        Ok(Self {
            boot_store: InMemoryBootStore::new(catalog),
            path: p.to_string(),
        })
    }

    async fn read_all(mut f: File) -> io::Result<Vec<u8>> {
        let mut buf = vec![];
        f.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn write_empty_state(mut f: File) -> io::Result<Vec<u8>> {
        let default_data = serde_json::to_string_pretty(&CatalogDocument::default())?;
        let default_bytes = default_data.as_bytes();
        f.write_all(default_bytes).await?;
        f.flush().await?;
        Ok(default_bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl BootStore for FileBootStore {
    async fn snapshot(&self) -> Arc<Catalog> {
        self.boot_store.snapshot().await
    }

    async fn reload(&mut self) -> Result<(), Error> {
        let contents = Self::read_all(File::open(&self.path).await?).await?;
        let catalog: Catalog = serde_json::from_slice(&contents)?;
        self.boot_store.replace(catalog);
        tracing::debug!("loaded boot data from {}", self.path);
        Ok(())
    }
}
