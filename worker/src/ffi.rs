//! The C ABI, backed by one process-wide session.
//!
//! Every function returns `MV_OK` or one of the `MV_ERR_*` statuses, except the group
//! queries, which return `-1` before `MV_Init`. Calls are serialized on the session.

#![allow(non_snake_case)]

use std::{
    ffi::{CStr, c_char, c_int, c_void},
    process, ptr, slice,
};

use log::{error, warn};
use parking_lot::Mutex;

use crate::{
    error::WorkerErr,
    session::Session,
    table::{ArrayTable, MatrixTable},
};

/// An opaque reference to a table created through this ABI.
pub type TableHandler = *mut c_void;

pub const MV_OK: c_int = 0;
pub const MV_ERR_SIZE_MISMATCH: c_int = 1;
pub const MV_ERR_INVALID_ROW_ID: c_int = 2;
pub const MV_ERR_INVALID_SHAPE: c_int = 3;
pub const MV_ERR_UNINITIALIZED: c_int = 4;
pub const MV_ERR_INVALID_ARGUMENT: c_int = 5;
pub const MV_ERR_STORE: c_int = 6;
pub const MV_ERR_TRANSPORT: c_int = 7;

enum Table {
    Array(ArrayTable),
    Matrix(MatrixTable),
}

struct Global {
    session: Session,
    tables: Vec<Table>,
}

static GLOBAL: Mutex<Option<Global>> = parking_lot::const_mutex(None);

type Status = Result<(), c_int>;

fn status(err: WorkerErr) -> c_int {
    warn!("{err}");

    match err {
        WorkerErr::SizeMismatch { .. } | WorkerErr::Conversion { .. } => MV_ERR_SIZE_MISMATCH,
        WorkerErr::InvalidRowId { .. } => MV_ERR_INVALID_ROW_ID,
        WorkerErr::InvalidShape { .. } => MV_ERR_INVALID_SHAPE,
        WorkerErr::UninitializedHandle | WorkerErr::Initialization(_) => MV_ERR_UNINITIALIZED,
        WorkerErr::AlreadyInitialized => MV_ERR_INVALID_ARGUMENT,
        WorkerErr::Store(_) => MV_ERR_STORE,
        WorkerErr::Transport(_) | WorkerErr::UnexpectedMessage { .. } => MV_ERR_TRANSPORT,
    }
}

fn code(res: Status) -> c_int {
    match res {
        Ok(()) => MV_OK,
        Err(code) => code,
    }
}

/// Runs `f` over the global session, failing if `MV_Init` wasn't called.
fn with_global<T>(f: impl FnOnce(&mut Global) -> Result<T, c_int>) -> Result<T, c_int> {
    let mut guard = GLOBAL.lock();
    let global = guard.as_mut().ok_or(MV_ERR_UNINITIALIZED)?;
    f(global)
}

fn table(global: &Global, handler: TableHandler) -> Result<&Table, c_int> {
    handler
        .addr()
        .checked_sub(1)
        .and_then(|idx| global.tables.get(idx))
        .ok_or(MV_ERR_INVALID_ARGUMENT)
}

fn register(global: &mut Global, table: Table, out: *mut TableHandler) -> Status {
    if out.is_null() {
        return Err(MV_ERR_INVALID_ARGUMENT);
    }

    global.tables.push(table);
    let handler = ptr::without_provenance_mut(global.tables.len());
    // SAFETY: `out` is non null and the caller guarantees it's valid for writes.
    unsafe { out.write(handler) };
    Ok(())
}

fn dim(value: c_int) -> Result<usize, c_int> {
    usize::try_from(value).map_err(|_| MV_ERR_INVALID_SHAPE)
}

/// # Safety
/// `data` must be valid for `size` reads, or `size` must be zero.
unsafe fn input<'a>(data: *const f32, size: c_int) -> Result<&'a [f32], c_int> {
    let len = usize::try_from(size).map_err(|_| MV_ERR_SIZE_MISMATCH)?;
    if len == 0 {
        return Ok(&[]);
    }

    if data.is_null() {
        return Err(MV_ERR_INVALID_ARGUMENT);
    }

    // SAFETY: upheld by the caller.
    Ok(unsafe { slice::from_raw_parts(data, len) })
}

/// # Safety
/// `data` must be valid for `size` writes, or `size` must be zero.
unsafe fn output<'a>(data: *mut f32, size: c_int) -> Result<&'a mut [f32], c_int> {
    let len = usize::try_from(size).map_err(|_| MV_ERR_SIZE_MISMATCH)?;
    if len == 0 {
        return Ok(&mut []);
    }

    if data.is_null() {
        return Err(MV_ERR_INVALID_ARGUMENT);
    }

    // SAFETY: upheld by the caller.
    Ok(unsafe { slice::from_raw_parts_mut(data, len) })
}

/// # Safety
/// `row_ids` must be valid for `row_ids_n` reads, or `row_ids_n` must be zero.
unsafe fn row_ids(row_ids: *const c_int, row_ids_n: c_int) -> Result<Vec<usize>, c_int> {
    let malformed = || status(WorkerErr::InvalidRowId { row: None, rows: 0 });

    let len = usize::try_from(row_ids_n).map_err(|_| malformed())?;
    if len == 0 || row_ids.is_null() {
        return Err(malformed());
    }

    // SAFETY: upheld by the caller.
    let ids = unsafe { slice::from_raw_parts(row_ids, len) };
    ids.iter()
        .map(|&id| usize::try_from(id).map_err(|_| malformed()))
        .collect()
}

/// Joins the worker group named by the process arguments.
///
/// The process exits if the store can't be reached.
///
/// # Safety
/// `argc` and `argv` must be null or describe a valid argument vector of C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_Init(argc: *mut c_int, argv: *mut *mut c_char) {
    let _ = env_logger::try_init();

    let mut guard = GLOBAL.lock();
    if guard.is_some() {
        warn!("MV_Init called twice, ignoring");
        return;
    }

    let mut args = Vec::new();
    if !argc.is_null() && !argv.is_null() {
        // SAFETY: both pointers are non null and valid per the caller.
        let argc = usize::try_from(unsafe { *argc }).unwrap_or(0);
        // SAFETY: `argv` holds `argc` entries per the caller.
        let argv = unsafe { slice::from_raw_parts(argv, argc) };

        args.extend(argv.iter().filter(|arg| !arg.is_null()).map(|&arg| {
            // SAFETY: every non null entry is a valid C string per the caller.
            unsafe { CStr::from_ptr(arg) }.to_string_lossy().into_owned()
        }));
    }

    match Session::init(args) {
        Ok(session) => {
            *guard = Some(Global {
                session,
                tables: Vec::new(),
            })
        }
        Err(e) => {
            error!("{e}");
            process::exit(1);
        }
    }
}

/// Leaves the worker group, every later call fails until the next `MV_Init`.
#[unsafe(no_mangle)]
pub extern "C" fn MV_ShutDown() -> c_int {
    let Some(global) = GLOBAL.lock().take() else {
        return MV_ERR_UNINITIALIZED;
    };

    code(global.session.shutdown().map_err(status))
}

#[unsafe(no_mangle)]
pub extern "C" fn MV_Barrier() -> c_int {
    code(with_global(|global| global.session.barrier().map_err(status)))
}

#[unsafe(no_mangle)]
pub extern "C" fn MV_NumWorkers() -> c_int {
    with_global(|global| Ok(global.session.workers() as c_int)).unwrap_or(-1)
}

#[unsafe(no_mangle)]
pub extern "C" fn MV_WorkerId() -> c_int {
    with_global(|global| Ok(global.session.worker_id() as c_int)).unwrap_or(-1)
}

#[unsafe(no_mangle)]
pub extern "C" fn MV_ServerId() -> c_int {
    with_global(|global| Ok(global.session.server_id() as c_int)).unwrap_or(-1)
}

/// # Safety
/// `out` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_NewArrayTable(size: c_int, out: *mut TableHandler) -> c_int {
    code(with_global(|global| {
        let table = global.session.new_array_table(dim(size)?).map_err(status)?;
        register(global, Table::Array(table), out)
    }))
}

/// # Safety
/// `data` must be valid for `size` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_GetArrayTable(handler: TableHandler, data: *mut f32, size: c_int) -> c_int {
    code(with_global(|global| {
        let Table::Array(table) = table(global, handler)? else {
            return Err(MV_ERR_INVALID_ARGUMENT);
        };

        // SAFETY: upheld by the caller.
        let out = unsafe { output(data, size)? };
        table.get_into(out).map_err(status)
    }))
}

/// # Safety
/// `data` must be valid for `size` reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_AddArrayTable(handler: TableHandler, data: *const f32, size: c_int) -> c_int {
    code(with_global(|global| {
        let Table::Array(table) = table(global, handler)? else {
            return Err(MV_ERR_INVALID_ARGUMENT);
        };

        // SAFETY: upheld by the caller.
        let delta = unsafe { input(data, size)? };
        table.add(delta).map_err(status)
    }))
}

/// # Safety
/// `out` must be valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_NewMatrixTable(num_row: c_int, num_col: c_int, out: *mut TableHandler) -> c_int {
    code(with_global(|global| {
        let table = global
            .session
            .new_matrix_table(dim(num_row)?, dim(num_col)?)
            .map_err(status)?;

        register(global, Table::Matrix(table), out)
    }))
}

fn matrix(global: &Global, handler: TableHandler) -> Result<&MatrixTable, c_int> {
    match table(global, handler)? {
        Table::Matrix(table) => Ok(table),
        Table::Array(_) => Err(MV_ERR_INVALID_ARGUMENT),
    }
}

/// # Safety
/// `data` must be valid for `size` writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_GetMatrixTableAll(handler: TableHandler, data: *mut f32, size: c_int) -> c_int {
    code(with_global(|global| {
        let table = matrix(global, handler)?;
        // SAFETY: upheld by the caller.
        let out = unsafe { output(data, size)? };
        table.get_into(out).map_err(status)
    }))
}

/// # Safety
/// `data` must be valid for `size` reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_AddMatrixTableAll(handler: TableHandler, data: *const f32, size: c_int) -> c_int {
    code(with_global(|global| {
        let table = matrix(global, handler)?;
        // SAFETY: upheld by the caller.
        let delta = unsafe { input(data, size)? };
        table.add(delta).map_err(status)
    }))
}

/// Reads the rows named in `row_ids` into `data`, in that order.
///
/// # Safety
/// `data` must be valid for `size` writes and `row_ids` for `row_ids_n` reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_GetMatrixTableByRows(
    handler: TableHandler,
    data: *mut f32,
    size: c_int,
    row_ids: *const c_int,
    row_ids_n: c_int,
) -> c_int {
    code(with_global(|global| {
        let table = matrix(global, handler)?;
        // SAFETY: upheld by the caller.
        let rows = unsafe { self::row_ids(row_ids, row_ids_n)? };
        // SAFETY: upheld by the caller.
        let out = unsafe { output(data, size)? };
        table.get_rows_into(&rows, out).map_err(status)
    }))
}

/// Adds one row of `data` into each row named in `row_ids`.
///
/// # Safety
/// `data` must be valid for `size` reads and `row_ids` for `row_ids_n` reads.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn MV_AddMatrixTableByRows(
    handler: TableHandler,
    data: *const f32,
    size: c_int,
    row_ids: *const c_int,
    row_ids_n: c_int,
) -> c_int {
    code(with_global(|global| {
        let table = matrix(global, handler)?;
        // SAFETY: upheld by the caller.
        let rows = unsafe { self::row_ids(row_ids, row_ids_n)? };
        // SAFETY: upheld by the caller.
        let delta = unsafe { input(data, size)? };
        table.add_rows(&rows, delta).map_err(status)
    }))
}
