use std::sync::Arc;

use comms::specs::server::SyncMode;
use tokio::sync::Barrier;

use crate::storage::StoreHandle;

/// The rendezvous point shared by the connection tasks of a server.
///
/// In `Sync` mode the leader of each epoch commits the staged additions while the
/// rest wait, so that every worker leaves the barrier with the same view.
#[derive(Clone)]
pub struct GroupBarrier {
    barrier: Arc<Barrier>,
    mode: SyncMode,
}

impl GroupBarrier {
    /// Creates a new `GroupBarrier`.
    ///
    /// # Arguments
    /// * `workers` - The amount of workers to wait on before releasing any of them.
    /// * `mode` - The visibility mode of the server.
    pub fn new(workers: usize, mode: SyncMode) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(workers)),
            mode,
        }
    }

    /// Waits until every worker of the group reached the barrier.
    ///
    /// # Arguments
    /// * `handle` - The store to commit when leaving the barrier in `Sync` mode.
    pub async fn wait(&self, handle: &StoreHandle) {
        let leader = self.barrier.wait().await.is_leader();

        if self.mode == SyncMode::Async {
            return;
        }

        if leader {
            handle.commit().await;
        }

        self.barrier.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use comms::specs::table::TableShape;

    use super::*;
    use crate::storage::TableStore;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn leader_commits_before_release() {
        let handle = StoreHandle::new(TableStore::new(8, SyncMode::Sync));
        handle.attach(0, TableShape::Array(2)).await.unwrap();

        let barrier = GroupBarrier::new(2, SyncMode::Sync);

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let handle = handle.clone();
                let barrier = barrier.clone();

                tokio::spawn(async move {
                    handle.add(0, &[], &[1.0, 2.0]).await.unwrap();
                    barrier.wait(&handle).await;

                    let mut out = Vec::new();
                    handle.read(0, None, &mut out).await.unwrap();
                    out
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), [2.0, 4.0]);
        }
    }
}
