use comms::specs::{server::SyncMode, table::Membership};

/// The identity and role of this process within the worker group.
///
/// Assigned once by the store when joining and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerContext {
    worker_id: usize,
    server_id: usize,
    workers: usize,
    mode: SyncMode,
}

impl WorkerContext {
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn server_id(&self) -> usize {
        self.server_id
    }

    /// Returns the total amount of workers in the group.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns `true` for the single worker in charge of seeding initial values.
    pub fn is_master(&self) -> bool {
        self.worker_id == 0
    }

    /// Returns the visibility mode of the store this worker is attached to.
    pub fn mode(&self) -> SyncMode {
        self.mode
    }
}

impl From<Membership> for WorkerContext {
    fn from(value: Membership) -> Self {
        Self {
            worker_id: value.worker_id as usize,
            server_id: value.server_id as usize,
            workers: value.workers as usize,
            mode: value.mode,
        }
    }
}
