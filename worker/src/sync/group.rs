use log::debug;

use super::{DeltaSync, ParameterSet, SyncSchedule};
use crate::{error::Result, table::TableHandle};

/// Anything that can be brought in line with its remote table.
pub trait Synchronize {
    fn sync(&mut self) -> Result<()>;
}

impl<P: ParameterSet, T: TableHandle> Synchronize for DeltaSync<P, T> {
    fn sync(&mut self) -> Result<()> {
        DeltaSync::sync(self)
    }
}

impl<S: Synchronize + ?Sized> Synchronize for Box<S> {
    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }
}

impl<S: Synchronize + ?Sized> Synchronize for &mut S {
    fn sync(&mut self) -> Result<()> {
        (**self).sync()
    }
}

/// A caller owned set of synchronized parameter sets, synced together.
///
/// Every worker must register the same members in the same order. Mixed kinds of
/// members can be held as `Box<dyn Synchronize>`.
pub struct SyncGroup<S: Synchronize = Box<dyn Synchronize>> {
    members: Vec<S>,
    schedule: SyncSchedule,
}

impl<S: Synchronize> Default for SyncGroup<S> {
    fn default() -> Self {
        Self::new(SyncSchedule::every_step())
    }
}

impl<S: Synchronize> SyncGroup<S> {
    /// Creates an empty `SyncGroup` following `schedule` in `step`.
    pub fn new(schedule: SyncSchedule) -> Self {
        Self {
            members: Vec::new(),
            schedule,
        }
    }

    /// Registers a new member, it will be synced after the ones already registered.
    pub fn push(&mut self, member: S) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[S] {
        &self.members
    }

    /// Mutable access to the members, for the training loop to update their parameters.
    pub fn members_mut(&mut self) -> &mut [S] {
        &mut self.members
    }

    /// Synchronizes every member, in registration order.
    pub fn sync_all(&mut self) -> Result<()> {
        self.members.iter_mut().try_for_each(S::sync)
    }

    /// Notifies the end of a training step, syncing every member if the schedule says so.
    ///
    /// # Returns
    /// Whether the members were synced.
    pub fn step(&mut self, step: usize) -> Result<bool> {
        if !self.schedule.should_sync(step) {
            return Ok(false);
        }

        debug!(step = step, members = self.members.len(); "syncing parameter sets");
        self.sync_all()?;
        Ok(true)
    }
}
