mod session;

pub use dbscope_core::{
    BackendKind, ColumnInfo, ConnectionManager, ConnectionProfile, DataPage, DbDriver, DbError,
    Pagination, StorageOp, TableInfo, Value,
};
pub use dbscope_storage::ProfileStore;
pub use session::{Session, default_drivers};
