use std::sync::Arc;

use comms::specs::server::SyncMode;
use log::debug;

use super::{ParamLayout, ParameterSet};
use crate::{
    context::WorkerContext,
    error::{Result, WorkerErr},
    store::Store,
    table::{ArrayTable, TableHandle},
};

/// Keeps a framework owned parameter set consistent with one remote table.
///
/// Local mutations are submitted as additive deltas against the last value observed
/// from the table, and the refreshed global value is written back into the parameters.
pub struct DeltaSync<P: ParameterSet, T: TableHandle = ArrayTable> {
    store: Arc<dyn Store>,
    context: WorkerContext,
    table: T,
    params: P,
    layout: ParamLayout,
    snapshot: Option<Vec<f32>>,
    current: Vec<f32>,
    elems: Vec<P::Elem>,
}

impl<P: ParameterSet, T: TableHandle> DeltaSync<P, T> {
    /// Wraps `params` over `table`, without synchronizing anything yet.
    ///
    /// `initialize` must be called by every worker of the group before the first `sync`.
    ///
    /// # Returns
    /// A `SizeMismatch` if the table can't hold the flattened parameters.
    pub fn new(store: Arc<dyn Store>, table: T, params: P) -> Result<Self> {
        let layout = ParamLayout::new(params.describe_shapes());

        if table.len() != layout.len() {
            return Err(WorkerErr::SizeMismatch {
                what: "table",
                got: table.len(),
                expected: layout.len(),
            });
        }

        let context = WorkerContext::from(store.membership());

        Ok(Self {
            store,
            context,
            table,
            current: vec![0.; layout.len()],
            elems: Vec::with_capacity(layout.len()),
            layout,
            params,
            snapshot: None,
        })
    }

    /// Seeds the table with the master's parameters and adopts them on every other worker.
    ///
    /// This is a group operation, it includes a barrier. It may only run once per adapter,
    /// later calls fail with `AlreadyInitialized` and leave the table untouched.
    pub fn initialize(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(WorkerErr::AlreadyInitialized);
        }

        self.read_params()?;

        if self.context.is_master() {
            self.table.add(&self.current)?;
        }

        self.store.barrier()?;

        if !self.context.is_master() {
            self.table.get_into(&mut self.current)?;
            self.write_params()?;
        }

        debug!(
            worker_id = self.context.worker_id(),
            len = self.layout.len();
            "parameters initialized"
        );

        self.snapshot = Some(self.current.clone());
        Ok(())
    }

    /// Submits the local changes since the last synchronization and adopts the global value.
    ///
    /// When the store runs in `Sync` mode every sync is a group round: the delta is only
    /// visible after a barrier, so all workers must call `sync` the same amount of times.
    ///
    /// Once the delta is accepted the snapshot already accounts for it, so if the barrier or
    /// the read back fails the next `sync` doesn't submit it again. The parameters keep their
    /// local values until a read back succeeds.
    pub fn sync(&mut self) -> Result<()> {
        if self.snapshot.is_none() {
            return Err(WorkerErr::UninitializedHandle);
        }

        self.read_params()?;
        let snapshot = self.snapshot.as_mut().ok_or(WorkerErr::UninitializedHandle)?;

        self.current
            .iter_mut()
            .zip(snapshot.iter())
            .for_each(|(value, last)| *value -= last);

        self.table.add(&self.current)?;

        snapshot
            .iter_mut()
            .zip(&self.current)
            .for_each(|(last, delta)| *last += delta);

        if self.context.mode() == SyncMode::Sync {
            self.store.barrier()?;
        }

        self.table.get_into(snapshot)?;
        self.current.copy_from_slice(snapshot);
        self.write_params()
    }

    /// Returns the last value observed from the table, `None` before initialization.
    pub fn snapshot(&self) -> Option<&[f32]> {
        self.snapshot.as_deref()
    }

    pub fn params(&self) -> &P {
        &self.params
    }

    /// Mutable access to the wrapped parameters, for the framework to update them.
    pub fn params_mut(&mut self) -> &mut P {
        &mut self.params
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    /// Unwraps the parameter set.
    pub fn into_params(self) -> P {
        self.params
    }

    fn read_params(&mut self) -> Result<()> {
        self.layout.check(&self.params.describe_shapes())?;
        self.elems.clear();
        self.params.read_current_values(&mut self.elems);
        self.layout.flatten(&self.elems, &mut self.current)
    }

    fn write_params(&mut self) -> Result<()> {
        self.layout.unflatten(&self.current, &mut self.elems)?;
        self.params.write_values(&self.elems)
    }
}
