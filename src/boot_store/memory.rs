use crate::boot_store::BootStore;
use crate::catalog::Catalog;
use crate::error::Error;
use std::sync::Arc;

#[derive(Default, Debug, Clone)]
pub struct InMemoryBootStore {
    catalog: Arc<Catalog>,
}

impl InMemoryBootStore {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    pub(crate) fn replace(&mut self, catalog: Catalog) {
        self.catalog = Arc::new(catalog);
    }
}

#[async_trait::async_trait]
impl BootStore for InMemoryBootStore {
    async fn snapshot(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    async fn reload(&mut self) -> Result<(), Error> {
        Ok(())
    }
}
