//! CornCob Cache - local remote bookkeeping
//!
//! SQLite-based store for:
//! - configured remotes and their CornCob URLs
//! - adapter-private side-state (e.g. Google Drive's path→file_id cache)
//! - the last-observed latest-pointer etag per remote

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteChainRepository;
