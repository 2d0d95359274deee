use std::{error::Error, fmt, io};

/// The worker module's result type.
pub type Result<T> = std::result::Result<T, WorkerErr>;

/// Client side failures.
///
/// Validation failures are detected locally, before anything is sent to the store.
#[derive(Debug)]
pub enum WorkerErr {
    Initialization(String),
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidRowId {
        row: Option<usize>,
        rows: usize,
    },
    InvalidShape {
        rows: usize,
        cols: usize,
    },
    UninitializedHandle,
    AlreadyInitialized,
    Conversion {
        index: usize,
    },
    Transport(io::Error),
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },
    Store(String),
}

impl WorkerErr {
    /// Returns `true` if the connection to the store can't be used anymore after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WorkerErr::Transport(_) | WorkerErr::UnexpectedMessage { .. }
        )
    }
}

impl fmt::Display for WorkerErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerErr::Initialization(reason) => write!(f, "initialization failed: {reason}"),
            WorkerErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(f, "{what} size mismatch: got {got}, expected {expected}"),
            WorkerErr::InvalidRowId {
                row: Some(row),
                rows,
            } => write!(f, "row id {row} is out of range for {rows} rows"),
            WorkerErr::InvalidRowId { row: None, rows } => {
                write!(f, "malformed row id list for {rows} rows")
            }
            WorkerErr::InvalidShape { rows, cols } => {
                write!(f, "invalid table shape {rows}x{cols}")
            }
            WorkerErr::UninitializedHandle => f.write_str("handle used before initialization"),
            WorkerErr::AlreadyInitialized => f.write_str("handle was already initialized"),
            WorkerErr::Conversion { index } => {
                write!(f, "parameter {index} doesn't fit in a 32 bit float")
            }
            WorkerErr::Transport(e) => write!(f, "transport error: {e}"),
            WorkerErr::UnexpectedMessage { expected, got } => {
                write!(f, "unexpected message: got {got}, expected {expected}")
            }
            WorkerErr::Store(reason) => write!(f, "store rejected the request: {reason}"),
        }
    }
}

impl Error for WorkerErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorkerErr::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for WorkerErr {
    fn from(value: io::Error) -> Self {
        Self::Transport(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<WorkerErr> for io::Error {
    fn from(value: WorkerErr) -> Self {
        match value {
            WorkerErr::Transport(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
