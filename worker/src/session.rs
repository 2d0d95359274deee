use std::sync::Arc;

use log::info;

use crate::{
    config::ClientConfig,
    context::WorkerContext,
    error::Result,
    store::{RemoteStore, Store},
    sync::{DeltaSync, ParameterSet},
    table::{ArrayTable, MatrixTable},
};

/// A worker's membership in a training group, owned by the caller.
///
/// Tables and adapters created from a session keep using its store, once the session is
/// shut down every one of them fails with `UninitializedHandle`.
pub struct Session {
    store: Arc<dyn Store>,
    context: WorkerContext,
}

impl Session {
    /// Connects to the store named in `args` and joins its worker group.
    ///
    /// # Arguments
    /// * `args` - The process arguments, see `ClientConfig::from_args`.
    pub fn init<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let config = ClientConfig::from_args(args)?;
        Self::connect(&config)
    }

    /// Connects to the store described by `config` and joins its worker group.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let store = RemoteStore::connect(config)?;
        Ok(Self::new(store))
    }

    /// Creates a session over an already joined store.
    pub fn new<S: Store + 'static>(store: S) -> Self {
        let store: Arc<dyn Store> = Arc::new(store);
        let context = WorkerContext::from(store.membership());

        info!(
            worker_id = context.worker_id(),
            workers = context.workers(),
            master = context.is_master();
            "session started"
        );

        Self { store, context }
    }

    pub fn context(&self) -> WorkerContext {
        self.context
    }

    /// Blocks until every worker of the group called `barrier`.
    ///
    /// Additions completed before the barrier are visible to every read issued after it.
    pub fn barrier(&self) -> Result<()> {
        self.store.barrier()
    }

    pub fn workers(&self) -> usize {
        self.context.workers()
    }

    pub fn worker_id(&self) -> usize {
        self.context.worker_id()
    }

    pub fn server_id(&self) -> usize {
        self.context.server_id()
    }

    pub fn is_master(&self) -> bool {
        self.context.is_master()
    }

    /// Creates a one dimensional table of `size` elements.
    ///
    /// Every worker must create the same tables, with the same shapes, in the same order.
    pub fn new_array_table(&self, size: usize) -> Result<ArrayTable> {
        ArrayTable::new(Arc::clone(&self.store), size)
    }

    /// Creates a `rows x cols` table, see `new_array_table`.
    pub fn new_matrix_table(&self, rows: usize, cols: usize) -> Result<MatrixTable> {
        MatrixTable::new(Arc::clone(&self.store), rows, cols)
    }

    /// Creates a table sized for `params` and synchronizes the group's initial values.
    ///
    /// This is a group operation, every worker must call it in the same order.
    pub fn delta_sync<P: ParameterSet>(&self, params: P) -> Result<DeltaSync<P>> {
        let len = params
            .describe_shapes()
            .iter()
            .map(|shape| shape.iter().product::<usize>())
            .sum();

        let table = self.new_array_table(len)?;
        let mut adapter = DeltaSync::new(Arc::clone(&self.store), table, params)?;
        adapter.initialize()?;
        Ok(adapter)
    }

    /// Leaves the group.
    pub fn shutdown(&self) -> Result<()> {
        self.store.shutdown()?;
        info!(worker_id = self.context.worker_id(); "session shut down");
        Ok(())
    }
}
