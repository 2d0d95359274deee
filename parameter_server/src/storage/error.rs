use std::{
    error::Error,
    fmt::{self, Display},
};

use comms::specs::table::TableShape;

/// The specific result type for the storage module.
pub type Result<T> = std::result::Result<T, StorageErr>;

/// Errors raised by the tables whenever a request doesn't fit the addressed table.
///
/// None of them leave a table partially modified, requests are validated before being applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageErr {
    SizeMismatch { got: usize, expected: usize },
    InvalidRow { row: u32, rows: usize },
    EmptyRows,
    UnknownTable(u32),
    EmptyShape(TableShape),
    ShapeMismatch { table: u32, got: TableShape, expected: TableShape },
    OutOfOrderTable { ordinal: u32, tables: usize },
}

impl Display for StorageErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageErr::SizeMismatch { got, expected } => write!(
                f,
                "the provided buffer length {got} doesn't match the addressed size {expected}"
            ),
            StorageErr::InvalidRow { row, rows } => {
                write!(f, "row id {row} is out of bounds for a table of {rows} rows")
            }
            StorageErr::EmptyRows => f.write_str("the row id list is empty"),
            StorageErr::UnknownTable(table) => write!(f, "unknown table {table}"),
            StorageErr::EmptyShape(shape) => write!(f, "can't create an empty table {shape:?}"),
            StorageErr::ShapeMismatch {
                table,
                got,
                expected,
            } => write!(
                f,
                "table {table} was created as {expected:?}, can't attach to it as {got:?}"
            ),
            StorageErr::OutOfOrderTable { ordinal, tables } => write!(
                f,
                "table {ordinal} requested before the {tables} tables preceding it were created"
            ),
        }
    }
}

impl Error for StorageErr {}
