mod array;
mod matrix;

use std::sync::Arc;

use comms::specs::table::TableShape;
use log::debug;

pub use array::ArrayTable;
pub use matrix::MatrixTable;

use crate::{
    error::{Result, WorkerErr},
    store::Store,
};

/// The whole-table access shared by every kind of table handle.
pub trait TableHandle {
    /// Returns the total amount of elements of the table.
    fn len(&self) -> usize;

    /// Returns `true` if the table holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the whole table into `out`, row major.
    fn get_into(&self, out: &mut [f32]) -> Result<()>;

    /// Adds `delta` elementwise into the whole table.
    fn add(&self, delta: &[f32]) -> Result<()>;
}

/// The remote side of a handle: the store it lives in, its id and its shape.
#[derive(Clone)]
struct TableRef {
    store: Arc<dyn Store>,
    id: u32,
    shape: TableShape,
}

impl TableRef {
    /// Creates or attaches to the next table of the calling worker.
    fn create(store: Arc<dyn Store>, shape: TableShape) -> Result<Self> {
        let id = store.new_table(shape)?;
        debug!(table = id, len = shape.len(); "table handle ready");

        Ok(Self { store, id, shape })
    }

    fn check_len(&self, what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(WorkerErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }

    fn get_all(&self, out: &mut [f32]) -> Result<()> {
        self.check_len("output buffer", out.len(), self.shape.len())?;
        self.store.get(self.id, None, out)
    }

    fn add_all(&self, delta: &[f32]) -> Result<()> {
        self.check_len("delta", delta.len(), self.shape.len())?;
        self.store.add(self.id, &[], delta)
    }
}

/// Validates a dimension of a new table, it must fit a positive 32 bit signed integer.
fn check_dims(rows: usize, cols: usize) -> Result<(u32, u32)> {
    let valid = |dim: usize| dim > 0 && dim <= i32::MAX as usize;

    if !valid(rows) || !valid(cols) {
        return Err(WorkerErr::InvalidShape { rows, cols });
    }

    Ok((rows as u32, cols as u32))
}

/// Validates a row id list against a table of `rows` rows, converting it to the wire type.
fn check_rows(ids: &[usize], rows: usize) -> Result<Vec<u32>> {
    if ids.is_empty() {
        return Err(WorkerErr::InvalidRowId { row: None, rows });
    }

    ids.iter()
        .map(|&row| {
            if row >= rows {
                return Err(WorkerErr::InvalidRowId {
                    row: Some(row),
                    rows,
                });
            }

            Ok(row as u32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_must_be_positive_i32() {
        assert_eq!(check_dims(3, 4).unwrap(), (3, 4));
        assert!(matches!(
            check_dims(0, 4),
            Err(WorkerErr::InvalidShape { rows: 0, cols: 4 })
        ));
        assert!(check_dims(1, i32::MAX as usize + 1).is_err());
    }

    #[test]
    fn row_ids() {
        assert_eq!(check_rows(&[2, 0, 2], 3).unwrap(), [2, 0, 2]);
        assert!(matches!(
            check_rows(&[5], 3),
            Err(WorkerErr::InvalidRowId {
                row: Some(5),
                rows: 3
            })
        ));
        assert!(matches!(
            check_rows(&[], 3),
            Err(WorkerErr::InvalidRowId { row: None, .. })
        ));
    }
}
