use std::sync::Arc;

use comms::specs::table::TableShape;
use ndarray::{Array2, ArrayView2};

use super::{TableHandle, TableRef, check_dims, check_rows};
use crate::{
    error::{Result, WorkerErr},
    store::Store,
};

/// A handle to a row major `rows x cols` remote table, with whole and row-partial access.
#[derive(Clone)]
pub struct MatrixTable {
    table: TableRef,
    rows: usize,
    cols: usize,
}

impl MatrixTable {
    /// Creates or attaches to the next table of the calling worker.
    ///
    /// # Returns
    /// An `InvalidShape` error if any dimension is zero or doesn't fit an `i32`.
    pub fn new(store: Arc<dyn Store>, rows: usize, cols: usize) -> Result<Self> {
        let (rows32, cols32) = check_dims(rows, cols)?;
        let shape = TableShape::Matrix {
            rows: rows32,
            cols: cols32,
        };

        Ok(Self {
            table: TableRef::create(store, shape)?,
            rows,
            cols,
        })
    }

    pub fn id(&self) -> u32 {
        self.table.id
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the accumulated value of the whole table.
    pub fn get(&self) -> Result<Array2<f32>> {
        let mut out = vec![0.; self.rows * self.cols];
        self.table.get_all(&mut out)?;
        self.shaped(self.rows, out)
    }

    /// Returns the addressed rows, in the order of `row_ids`.
    ///
    /// Duplicated ids yield duplicated rows.
    pub fn get_rows(&self, row_ids: &[usize]) -> Result<Array2<f32>> {
        let mut out = vec![0.; row_ids.len() * self.cols];
        self.get_rows_into(row_ids, &mut out)?;
        self.shaped(row_ids.len(), out)
    }

    /// Reads the whole table into `out`, row major.
    pub fn get_into(&self, out: &mut [f32]) -> Result<()> {
        self.table.get_all(out)
    }

    /// Reads the addressed rows into `out`, which must hold `row_ids.len() * cols` elements.
    pub fn get_rows_into(&self, row_ids: &[usize], out: &mut [f32]) -> Result<()> {
        let rows = check_rows(row_ids, self.rows)?;
        self.table
            .check_len("output buffer", out.len(), rows.len() * self.cols)?;

        self.table.store.get(self.table.id, Some(rows.as_slice()), out)
    }

    /// Adds `delta` elementwise into the whole table, row major.
    pub fn add(&self, delta: &[f32]) -> Result<()> {
        self.table.add_all(delta)
    }

    /// Adds one row of `delta` into each addressed row, leaving the rest of the table untouched.
    ///
    /// # Returns
    /// An `InvalidRowId` or a `SizeMismatch` error if the request doesn't fit the table,
    /// nothing is sent then.
    pub fn add_rows(&self, row_ids: &[usize], delta: &[f32]) -> Result<()> {
        let rows = check_rows(row_ids, self.rows)?;
        self.table
            .check_len("delta", delta.len(), rows.len() * self.cols)?;

        self.table.store.add(self.table.id, &rows, delta)
    }

    /// Same as `add`, `delta` must be shaped `rows x cols`.
    pub fn add_view(&self, delta: ArrayView2<'_, f32>) -> Result<()> {
        self.check_view(delta, self.rows)?;
        self.add(&Self::row_major(delta))
    }

    /// Same as `add_rows`, `delta` must be shaped `row_ids.len() x cols`.
    pub fn add_rows_view(&self, row_ids: &[usize], delta: ArrayView2<'_, f32>) -> Result<()> {
        self.check_view(delta, row_ids.len())?;
        self.add_rows(row_ids, &Self::row_major(delta))
    }

    fn check_view(&self, delta: ArrayView2<'_, f32>, rows: usize) -> Result<()> {
        if delta.dim() != (rows, self.cols) {
            return Err(WorkerErr::SizeMismatch {
                what: "delta",
                got: delta.len(),
                expected: rows * self.cols,
            });
        }

        Ok(())
    }

    fn row_major(delta: ArrayView2<'_, f32>) -> Vec<f32> {
        delta.iter().copied().collect()
    }

    fn shaped(&self, rows: usize, values: Vec<f32>) -> Result<Array2<f32>> {
        Array2::from_shape_vec((rows, self.cols), values).map_err(|_| WorkerErr::InvalidShape {
            rows,
            cols: self.cols,
        })
    }
}

impl TableHandle for MatrixTable {
    fn len(&self) -> usize {
        self.rows * self.cols
    }

    fn get_into(&self, out: &mut [f32]) -> Result<()> {
        MatrixTable::get_into(self, out)
    }

    fn add(&self, delta: &[f32]) -> Result<()> {
        MatrixTable::add(self, delta)
    }
}
