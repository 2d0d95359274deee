use std::sync::Arc;

use comms::specs::{server::SyncMode, table::TableShape};
use log::debug;
use parking_lot::RwLock;

use super::{Result, StorageErr, Table};

/// The set of tables held by a server.
///
/// Every worker creates tables in the same order, so the k-th creation request
/// of any worker names table k. The first request allocates it, the rest attach.
#[derive(Debug)]
pub struct TableStore {
    shard_size: usize,
    mode: SyncMode,
    tables: RwLock<Vec<Arc<Table>>>,
}

impl TableStore {
    /// Creates a new empty `TableStore`.
    ///
    /// # Arguments
    /// * `shard_size` - The target amount of elements per table shard.
    /// * `mode` - Whether additions become visible immediately or at the next commit.
    pub fn new(shard_size: usize, mode: SyncMode) -> Self {
        Self {
            shard_size: shard_size.max(1),
            mode,
            tables: RwLock::new(Vec::new()),
        }
    }

    /// Returns the visibility mode of this store.
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Returns the amount of tables created so far.
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns `true` if no table has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates or attaches to the table at position `ordinal`.
    ///
    /// # Arguments
    /// * `ordinal` - How many tables the requesting worker created before this one.
    /// * `shape` - The requested shape.
    ///
    /// # Returns
    /// The id of the table, or an error if the shape disagrees with an existing table
    /// or the ordinal skips tables that don't exist yet.
    pub fn attach(&self, ordinal: u32, shape: TableShape) -> Result<u32> {
        if shape.is_empty() {
            return Err(StorageErr::EmptyShape(shape));
        }

        if let Some(table) = self.tables.read().get(ordinal as usize) {
            return Self::check_shape(ordinal, table, shape);
        }

        let mut tables = self.tables.write();
        let idx = ordinal as usize;

        match idx.cmp(&tables.len()) {
            std::cmp::Ordering::Less => Self::check_shape(ordinal, &tables[idx], shape),
            std::cmp::Ordering::Equal => {
                debug!(table = ordinal, len = shape.len(); "allocating table");
                tables.push(Arc::new(Table::new(shape, self.shard_size, self.mode)));
                Ok(ordinal)
            }
            std::cmp::Ordering::Greater => Err(StorageErr::OutOfOrderTable {
                ordinal,
                tables: tables.len(),
            }),
        }
    }

    /// Returns the table with the given id.
    pub fn get(&self, table: u32) -> Result<Arc<Table>> {
        self.tables
            .read()
            .get(table as usize)
            .cloned()
            .ok_or(StorageErr::UnknownTable(table))
    }

    /// Adds `values` into `table`, see `Table::add`.
    pub fn add(&self, table: u32, rows: &[u32], values: &[f32]) -> Result<()> {
        self.get(table)?.add(rows, values)
    }

    /// Reads `table` into `out`, see `Table::read`.
    pub fn read(&self, table: u32, rows: Option<&[u32]>, out: &mut Vec<f32>) -> Result<()> {
        self.get(table)?.read(rows, out)
    }

    /// Makes every staged addition of every table visible.
    pub fn commit(&self) {
        let tables = self.tables.read().clone();
        tables.iter().for_each(|table| table.commit());
    }

    fn check_shape(ordinal: u32, table: &Table, shape: TableShape) -> Result<u32> {
        if table.shape() != shape {
            return Err(StorageErr::ShapeMismatch {
                table: ordinal,
                got: shape,
                expected: table.shape(),
            });
        }

        Ok(ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creators_share_tables_by_ordinal() {
        let store = TableStore::new(16, SyncMode::Async);
        let shape = TableShape::Matrix { rows: 2, cols: 3 };

        assert_eq!(store.attach(0, TableShape::Array(4)), Ok(0));
        assert_eq!(store.attach(1, shape), Ok(1));
        assert_eq!(store.attach(0, TableShape::Array(4)), Ok(0));
        assert_eq!(store.attach(1, shape), Ok(1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn attach_rejects_other_shape() {
        let store = TableStore::new(16, SyncMode::Async);
        store.attach(0, TableShape::Array(4)).unwrap();

        assert!(matches!(
            store.attach(0, TableShape::Array(5)),
            Err(StorageErr::ShapeMismatch { table: 0, .. })
        ));
    }

    #[test]
    fn attach_rejects_gaps_and_empty_shapes() {
        let store = TableStore::new(16, SyncMode::Async);

        assert_eq!(
            store.attach(2, TableShape::Array(4)),
            Err(StorageErr::OutOfOrderTable {
                ordinal: 2,
                tables: 0
            })
        );
        assert!(matches!(
            store.attach(0, TableShape::Matrix { rows: 3, cols: 0 }),
            Err(StorageErr::EmptyShape(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_table() {
        let store = TableStore::new(16, SyncMode::Async);
        assert_eq!(store.add(0, &[], &[]), Err(StorageErr::UnknownTable(0)));
    }

    #[test]
    fn commit_reaches_every_table() {
        let store = TableStore::new(2, SyncMode::Sync);
        store.attach(0, TableShape::Array(3)).unwrap();
        store.attach(1, TableShape::Matrix { rows: 2, cols: 2 }).unwrap();

        store.add(0, &[], &[1.0; 3]).unwrap();
        store.add(1, &[1], &[2.0; 2]).unwrap();
        store.commit();

        let mut out = Vec::new();
        store.read(0, None, &mut out).unwrap();
        assert_eq!(out, vec![1.0; 3]);
        store.read(1, None, &mut out).unwrap();
        assert_eq!(out, [0.0, 0.0, 2.0, 2.0]);
    }
}
