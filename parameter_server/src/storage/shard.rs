use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use super::{Result, StorageErr};

/// A contiguous block of whole rows of a table.
///
/// When created as staged, additions land in a pending buffer and only become
/// visible once `commit` folds them into the values.
#[derive(Debug)]
pub struct TableShard {
    rows: usize,
    cols: usize,
    values: RwLock<Box<[f32]>>,
    pending: Option<Mutex<Box<[f32]>>>,
    dirty: AtomicBool,
}

impl TableShard {
    /// Creates a new zeroed `TableShard`.
    ///
    /// # Arguments
    /// * `rows` - The amount of rows this shard holds.
    /// * `cols` - The amount of elements per row.
    /// * `staged` - Whether additions wait for a `commit` to become visible.
    pub fn new(rows: usize, cols: usize, staged: bool) -> Self {
        let len = rows * cols;
        let pending = staged.then(|| Mutex::new(vec![0.; len].into_boxed_slice()));

        Self {
            rows,
            cols,
            values: RwLock::new(vec![0.; len].into_boxed_slice()),
            pending,
            dirty: AtomicBool::new(false),
        }
    }

    /// Returns the amount of rows of this shard.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Adds `delta` elementwise into the whole shard.
    ///
    /// # Returns
    /// A `SizeMismatch` if `delta` isn't the same size as this shard.
    pub fn add(&self, delta: &[f32]) -> Result<()> {
        self.check_len(delta.len(), self.rows * self.cols)?;
        self.add_at(0, delta);
        Ok(())
    }

    /// Adds `delta` elementwise into a single row of the shard.
    ///
    /// # Arguments
    /// * `row` - The row index, local to this shard.
    /// * `delta` - A buffer of exactly one row.
    pub fn add_row(&self, row: usize, delta: &[f32]) -> Result<()> {
        self.check_row(row)?;
        self.check_len(delta.len(), self.cols)?;
        self.add_at(row * self.cols, delta);
        Ok(())
    }

    /// Copies the visible values of the whole shard into `out`.
    pub fn read(&self, out: &mut [f32]) -> Result<()> {
        self.check_len(out.len(), self.rows * self.cols)?;
        out.copy_from_slice(&self.values.read());
        Ok(())
    }

    /// Copies the visible values of a single row into `out`.
    pub fn read_row(&self, row: usize, out: &mut [f32]) -> Result<()> {
        self.check_row(row)?;
        self.check_len(out.len(), self.cols)?;

        let start = row * self.cols;
        out.copy_from_slice(&self.values.read()[start..start + self.cols]);
        Ok(())
    }

    /// Folds the staged additions into the visible values and clears them.
    ///
    /// Does nothing for shards that aren't staged or that didn't receive additions.
    pub fn commit(&self) {
        let Some(pending) = &self.pending else {
            return;
        };

        if !self.dirty.swap(false, Ordering::AcqRel) {
            return;
        }

        let mut pending = pending.lock();
        let mut values = self.values.write();

        values
            .iter_mut()
            .zip(pending.iter())
            .for_each(|(v, d)| *v += d);

        pending.fill(0.);
    }

    fn add_at(&self, start: usize, delta: &[f32]) {
        let accumulate = |buf: &mut [f32]| {
            buf[start..start + delta.len()]
                .iter_mut()
                .zip(delta)
                .for_each(|(acc, d)| *acc += d);
        };

        match &self.pending {
            Some(pending) => {
                accumulate(&mut pending.lock());
                self.dirty.store(true, Ordering::Release);
            }
            None => accumulate(&mut self.values.write()),
        }
    }

    fn check_len(&self, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(StorageErr::SizeMismatch { got, expected });
        }

        Ok(())
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.rows {
            return Err(StorageErr::InvalidRow {
                row: row as u32,
                rows: self.rows,
            });
        }

        Ok(())
    }
}
