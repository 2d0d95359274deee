use std::num::NonZeroUsize;

/// Defines at which steps to synchronize.
#[derive(Debug, Clone)]
pub struct SyncSchedule {
    pub every: NonZeroUsize,
}

impl SyncSchedule {
    pub fn new(every: NonZeroUsize) -> Self {
        Self { every }
    }

    /// Synchronizes at every step.
    pub fn every_step() -> Self {
        Self::new(NonZeroUsize::MIN)
    }

    /// Returns true if this step ends a synchronization window.
    #[inline]
    pub fn should_sync(&self, step: usize) -> bool {
        let k = self.every.get();
        step % k == k - 1
    }
}
