use std::sync::Arc;

use comms::specs::table::TableShape;
use ndarray::{Array1, ArrayView1};

use super::{TableHandle, TableRef, check_dims};
use crate::{error::Result, store::Store};

/// A handle to a one dimensional remote table.
#[derive(Clone)]
pub struct ArrayTable {
    table: TableRef,
    size: usize,
}

impl ArrayTable {
    /// Creates or attaches to the next table of the calling worker, holding `size` elements.
    ///
    /// # Returns
    /// An `InvalidShape` error if `size` is zero or doesn't fit an `i32`.
    pub fn new(store: Arc<dyn Store>, size: usize) -> Result<Self> {
        let (size32, _) = check_dims(size, 1)?;
        let table = TableRef::create(store, TableShape::Array(size32))?;

        Ok(Self { table, size })
    }

    /// Returns the id of the remote table.
    pub fn id(&self) -> u32 {
        self.table.id
    }

    /// Returns the accumulated value of the whole table.
    pub fn get(&self) -> Result<Array1<f32>> {
        let mut out = vec![0.; self.size];
        self.table.get_all(&mut out)?;
        Ok(Array1::from_vec(out))
    }

    /// Reads the whole table into `out`, which must hold exactly `len()` elements.
    pub fn get_into(&self, out: &mut [f32]) -> Result<()> {
        self.table.get_all(out)
    }

    /// Adds `delta` elementwise into the whole table.
    ///
    /// # Returns
    /// A `SizeMismatch` if `delta` isn't exactly `len()` elements long, nothing is sent then.
    pub fn add(&self, delta: &[f32]) -> Result<()> {
        self.table.add_all(delta)
    }

    /// Same as `add`, for any memory layout of `delta`.
    pub fn add_view(&self, delta: ArrayView1<'_, f32>) -> Result<()> {
        match delta.as_slice() {
            Some(delta) => self.add(delta),
            None => self.add(&delta.to_vec()),
        }
    }
}

impl TableHandle for ArrayTable {
    fn len(&self) -> usize {
        self.size
    }

    fn get_into(&self, out: &mut [f32]) -> Result<()> {
        ArrayTable::get_into(self, out)
    }

    fn add(&self, delta: &[f32]) -> Result<()> {
        ArrayTable::add(self, delta)
    }
}
