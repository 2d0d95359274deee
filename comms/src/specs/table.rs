use serde::{Deserialize, Serialize};

use super::server::SyncMode;

/// The shape of a remote table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableShape {
    /// A one dimensional table of `n` elements.
    Array(u32),
    /// A row major `rows x cols` table.
    Matrix { rows: u32, cols: u32 },
}

impl TableShape {
    /// Returns the amount of rows of the table, an array is a single column.
    pub fn rows(&self) -> usize {
        match *self {
            Self::Array(n) => n as usize,
            Self::Matrix { rows, .. } => rows as usize,
        }
    }

    /// Returns the amount of elements in a row.
    pub fn cols(&self) -> usize {
        match *self {
            Self::Array(_) => 1,
            Self::Matrix { cols, .. } => cols as usize,
        }
    }

    /// Returns the total amount of elements of the table.
    pub fn len(&self) -> usize {
        self.rows() * self.cols()
    }

    /// Returns whether the table holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A worker's place inside the group, assigned by the store on connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub worker_id: u32,
    pub server_id: u32,
    pub workers: u32,
    #[serde(default)]
    pub mode: SyncMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_is_a_single_column() {
        let shape = TableShape::Array(7);
        assert_eq!(shape.rows(), 7);
        assert_eq!(shape.cols(), 1);
        assert_eq!(shape.len(), 7);
    }

    #[test]
    fn matrix_len() {
        let shape = TableShape::Matrix { rows: 3, cols: 4 };
        assert_eq!(shape.len(), 12);
        assert!(!shape.is_empty());
        assert!(TableShape::Matrix { rows: 0, cols: 4 }.is_empty());
    }
}
