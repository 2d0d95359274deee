use comms::specs::{server::SyncMode, table::TableShape};
use rayon::prelude::*;

use super::{Result, StorageErr, TableShard};

/// A single additive table, laid out row-major and split in shards of whole rows.
#[derive(Debug)]
pub struct Table {
    shape: TableShape,
    shard_rows: usize,
    shards: Box<[TableShard]>,
}

impl Table {
    /// Creates a new zeroed `Table`.
    ///
    /// # Arguments
    /// * `shape` - The shape of the table.
    /// * `shard_size` - The target amount of elements per shard, rounded to whole rows.
    /// * `mode` - Whether additions are applied immediately or staged until the next commit.
    pub fn new(shape: TableShape, shard_size: usize, mode: SyncMode) -> Self {
        let rows = shape.rows();
        let cols = shape.cols();
        let shard_rows = (shard_size / cols).max(1);
        let staged = mode == SyncMode::Sync;

        let shards = (0..rows)
            .step_by(shard_rows)
            .map(|start| TableShard::new(shard_rows.min(rows - start), cols, staged))
            .collect();

        Self {
            shape,
            shard_rows,
            shards,
        }
    }

    /// Returns the shape this table was created with.
    pub fn shape(&self) -> TableShape {
        self.shape
    }

    /// Adds `values` into the table.
    ///
    /// # Arguments
    /// * `rows` - The addressed row ids, an empty list addresses the whole table.
    /// * `values` - One row of values per row id, or the whole table.
    ///
    /// # Returns
    /// An error if the request doesn't fit the table, in which case nothing was added.
    pub fn add(&self, rows: &[u32], values: &[f32]) -> Result<()> {
        if rows.is_empty() {
            self.check_len(values.len(), self.shape.len())?;

            return self
                .shards
                .par_iter()
                .zip(values.par_chunks(self.shard_len()))
                .try_for_each(|(shard, delta)| shard.add(delta));
        }

        self.check_rows(rows)?;
        let cols = self.cols();
        self.check_len(values.len(), rows.len() * cols)?;

        rows.iter()
            .zip(values.chunks_exact(cols))
            .try_for_each(|(&row, delta)| {
                let (shard, local) = self.locate(row);
                shard.add_row(local, delta)
            })
    }

    /// Reads the visible values of the table into `out`.
    ///
    /// # Arguments
    /// * `rows` - The addressed row ids, `None` reads the whole table.
    /// * `out` - The destination buffer, resized to fit the answer.
    pub fn read(&self, rows: Option<&[u32]>, out: &mut Vec<f32>) -> Result<()> {
        let Some(rows) = rows else {
            out.resize(self.shape.len(), 0.);

            return self
                .shards
                .par_iter()
                .zip(out.par_chunks_mut(self.shard_len()))
                .try_for_each(|(shard, dst)| shard.read(dst));
        };

        if rows.is_empty() {
            return Err(StorageErr::EmptyRows);
        }

        self.check_rows(rows)?;
        let cols = self.cols();
        out.resize(rows.len() * cols, 0.);

        rows.iter()
            .zip(out.chunks_exact_mut(cols))
            .try_for_each(|(&row, dst)| {
                let (shard, local) = self.locate(row);
                shard.read_row(local, dst)
            })
    }

    /// Makes every staged addition visible.
    pub fn commit(&self) {
        self.shards.par_iter().for_each(TableShard::commit);
    }

    fn cols(&self) -> usize {
        self.shape.cols()
    }

    fn shard_len(&self) -> usize {
        self.shard_rows * self.cols()
    }

    fn locate(&self, row: u32) -> (&TableShard, usize) {
        let row = row as usize;
        (&self.shards[row / self.shard_rows], row % self.shard_rows)
    }

    fn check_rows(&self, rows: &[u32]) -> Result<()> {
        let nrows = self.shape.rows();

        match rows.iter().find(|&&row| row as usize >= nrows) {
            Some(&row) => Err(StorageErr::InvalidRow { row, rows: nrows }),
            None => Ok(()),
        }
    }

    fn check_len(&self, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(StorageErr::SizeMismatch { got, expected });
        }

        Ok(())
    }
}
