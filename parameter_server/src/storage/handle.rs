use std::{ops::Deref, sync::Arc};

use comms::specs::table::TableShape;
use tokio::task;

use super::{Result, TableStore};

/// The actual interface to interact with a `TableStore` from the connection tasks.
///
/// It bridges the async runtime with the blocking CPU-bound implementation of the `TableStore`,
/// so it must be used from within a multi threaded runtime.
#[derive(Clone)]
pub struct StoreHandle(Arc<TableStore>);

impl Deref for StoreHandle {
    type Target = TableStore;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl StoreHandle {
    /// Creates a new `StoreHandle`.
    ///
    /// # Arguments
    /// * `store` - The underlying table store.
    pub fn new(store: TableStore) -> Self {
        Self(Arc::new(store))
    }

    /// Async call to the synchronous implementation of `TableStore::attach`.
    pub async fn attach(&self, ordinal: u32, shape: TableShape) -> Result<u32> {
        self.0.attach(ordinal, shape)
    }

    /// Async call to the synchronous implementation of `TableStore::add`.
    pub async fn add(&self, table: u32, rows: &[u32], values: &[f32]) -> Result<()> {
        task::block_in_place(|| self.0.add(table, rows, values))
    }

    /// Async call to the synchronous implementation of `TableStore::read`.
    pub async fn read(&self, table: u32, rows: Option<&[u32]>, out: &mut Vec<f32>) -> Result<()> {
        task::block_in_place(|| self.0.read(table, rows, out))
    }

    /// Async call to the synchronous implementation of `TableStore::commit`.
    pub async fn commit(&self) {
        task::block_in_place(|| self.0.commit());
    }
}
