mod local;
mod remote;

use comms::specs::table::{Membership, TableShape};

pub use local::{LocalGroup, LocalStore};
pub use remote::RemoteStore;

use crate::error::Result;

/// The boundary between a worker and the parameter store.
///
/// Every call blocks until the store applied it. Implementations assume their inputs were
/// already validated against the addressed table.
pub trait Store: Send + Sync {
    /// Returns this worker's place in the group, as assigned when joining.
    fn membership(&self) -> Membership;

    /// Blocks until every worker of the group reached the barrier.
    fn barrier(&self) -> Result<()>;

    /// Creates or attaches to the next table of this worker, returning its id.
    fn new_table(&self, shape: TableShape) -> Result<u32>;

    /// Reads the whole table, or the given rows in order, into `out`.
    fn get(&self, table: u32, rows: Option<&[u32]>, out: &mut [f32]) -> Result<()>;

    /// Adds `values` into the whole table, or into the given rows if any.
    fn add(&self, table: u32, rows: &[u32], values: &[f32]) -> Result<()>;

    /// Leaves the group, every later call fails with `UninitializedHandle`.
    fn shutdown(&self) -> Result<()>;
}
