use std::{
    num::NonZeroUsize,
    sync::{
        Arc, Barrier,
        atomic::{AtomicBool, AtomicU32, Ordering},
    },
};

use comms::specs::{
    server::SyncMode,
    table::{Membership, TableShape},
};
use parameter_server::storage::{StorageErr, TableStore};

use super::Store;
use crate::error::{Result, WorkerErr};

/// The in-process counterpart of a store process, for groups of workers living in threads.
pub struct LocalGroup;

impl LocalGroup {
    /// Creates the stores of a group of `workers`, one per worker, in worker id order.
    ///
    /// # Arguments
    /// * `workers` - The size of the group.
    /// * `mode` - Whether additions are visible immediately or after the next barrier.
    pub fn spawn(workers: NonZeroUsize, mode: SyncMode) -> Vec<LocalStore> {
        let shared = Arc::new(Shared {
            tables: TableStore::new(4096, mode),
            barrier: Barrier::new(workers.get()),
            mode,
        });

        (0..workers.get() as u32)
            .map(|worker_id| LocalStore {
                membership: Membership {
                    worker_id,
                    server_id: 0,
                    workers: workers.get() as u32,
                    mode,
                },
                shared: Arc::clone(&shared),
                created: AtomicU32::new(0),
                open: AtomicBool::new(true),
            })
            .collect()
    }
}

struct Shared {
    tables: TableStore,
    barrier: Barrier,
    mode: SyncMode,
}

/// A single worker's view of a `LocalGroup`.
pub struct LocalStore {
    membership: Membership,
    shared: Arc<Shared>,
    created: AtomicU32,
    open: AtomicBool,
}

impl LocalStore {
    fn check_open(&self) -> Result<()> {
        if !self.open.load(Ordering::Acquire) {
            return Err(WorkerErr::UninitializedHandle);
        }

        Ok(())
    }
}

fn rejected(e: StorageErr) -> WorkerErr {
    WorkerErr::Store(e.to_string())
}

impl Store for LocalStore {
    fn membership(&self) -> Membership {
        self.membership
    }

    fn barrier(&self) -> Result<()> {
        self.check_open()?;
        let shared = &self.shared;
        let leader = shared.barrier.wait().is_leader();

        if shared.mode == SyncMode::Sync {
            if leader {
                shared.tables.commit();
            }

            shared.barrier.wait();
        }

        Ok(())
    }

    fn new_table(&self, shape: TableShape) -> Result<u32> {
        self.check_open()?;
        let ordinal = self.created.load(Ordering::Acquire);
        let table = self.shared.tables.attach(ordinal, shape).map_err(rejected)?;
        self.created.store(ordinal + 1, Ordering::Release);
        Ok(table)
    }

    fn get(&self, table: u32, rows: Option<&[u32]>, out: &mut [f32]) -> Result<()> {
        self.check_open()?;
        let mut values = Vec::with_capacity(out.len());
        self.shared
            .tables
            .read(table, rows, &mut values)
            .map_err(rejected)?;

        if values.len() != out.len() {
            return Err(WorkerErr::SizeMismatch {
                what: "reply",
                got: values.len(),
                expected: out.len(),
            });
        }

        out.copy_from_slice(&values);
        Ok(())
    }

    fn add(&self, table: u32, rows: &[u32], values: &[f32]) -> Result<()> {
        self.check_open()?;
        self.shared.tables.add(table, rows, values).map_err(rejected)
    }

    fn shutdown(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::AcqRel) {
            return Err(WorkerErr::UninitializedHandle);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn group(workers: usize, mode: SyncMode) -> Vec<LocalStore> {
        LocalGroup::spawn(NonZeroUsize::new(workers).unwrap(), mode)
    }

    #[test]
    fn members_are_numbered() {
        let stores = group(3, SyncMode::Async);
        let ids: Vec<_> = stores.iter().map(|s| s.membership().worker_id).collect();

        assert_eq!(ids, [0, 1, 2]);
        assert!(stores.iter().all(|s| s.membership().workers == 3));
    }

    #[test]
    fn sync_mode_commits_at_barrier() {
        let stores = group(2, SyncMode::Sync);

        thread::scope(|s| {
            for store in &stores {
                s.spawn(move || {
                    let table = store.new_table(TableShape::Array(2)).unwrap();
                    store.add(table, &[], &[1.0, 1.0]).unwrap();

                    let mut out = [0.0; 2];
                    store.get(table, None, &mut out).unwrap();
                    assert_eq!(out, [0.0, 0.0]);

                    store.barrier().unwrap();
                    store.get(table, None, &mut out).unwrap();
                    assert_eq!(out, [2.0, 2.0]);
                });
            }
        });
    }

    #[test]
    fn shutdown_closes_the_store() {
        let store = group(1, SyncMode::Async).remove(0);
        store.shutdown().unwrap();

        assert!(matches!(
            store.new_table(TableShape::Array(1)),
            Err(WorkerErr::UninitializedHandle)
        ));
        assert!(matches!(store.shutdown(), Err(WorkerErr::UninitializedHandle)));
    }
}
