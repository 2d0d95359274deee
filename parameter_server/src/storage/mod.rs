mod error;
mod handle;
mod shard;
mod store;
mod table;

pub use error::{Result, StorageErr};
pub use handle::StoreHandle;
pub use shard::TableShard;
pub use store::TableStore;
pub use table::Table;
