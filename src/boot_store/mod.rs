//! Boot data storage.
//!
//! Supports a generic interface for handing out immutable [`Catalog`] snapshots. Requests
//! resolve against the snapshot they were given, so a reload never changes a configuration
//! that is being rendered.
//!
//! Two implementations are provided, [`memory::InMemoryBootStore`] and [`file::FileBootStore`].
//! The former holds a fixed catalog. The latter loads its catalog from a JSON document on disk
//! and can re-read it on demand.

use crate::catalog::Catalog;
use crate::error::Error;
use std::sync::Arc;
use tokio::sync::RwLock;

pub mod file;
pub mod memory;

#[allow(clippy::module_name_repetitions)]
pub use file::FileBootStore;
#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryBootStore;

/// `DynBootStore` is a type alias for a [`BootStore`] that can be used by multiple consumers
/// that coordinate through an [`Arc`] and a [`RwLock`] wrapping the [`BootStore`].
#[allow(clippy::module_name_repetitions)]
pub type DynBootStore = Arc<RwLock<dyn BootStore + Send + Sync>>;

/// An async trait describing a source of boot data.
#[async_trait::async_trait]
pub trait BootStore {
    /// The current catalog.
    async fn snapshot(&self) -> Arc<Catalog>;

    /// Refresh the catalog from its backing source. On error the previous catalog is kept.
    async fn reload(&mut self) -> Result<(), Error>;
}
