pub mod config;
pub mod context;
pub mod error;
pub mod ffi;
pub mod session;
pub mod store;
pub mod sync;
pub mod table;

pub use context::WorkerContext;
pub use error::{Result, WorkerErr};
pub use session::Session;
