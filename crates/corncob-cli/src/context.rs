//! Shared plumbing every subcommand needs: the local cache database, the
//! current commit-graph directory, and a scratch directory for bundle
//! staging.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use corncob_cache::{DatabasePool, SqliteChainRepository};
use corncob_core::domain::ids::RemoteNickname;
use corncob_core::domain::remote::RemoteRecord;
use corncob_core::ports::chain_repository::ChainRepository;

/// Resolves the default path for the local bookkeeping database, honoring
/// `CORNCOB_DATA_DIR` for tests and non-default installs.
pub fn default_cache_db_path() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("CORNCOB_DATA_DIR") {
        return Ok(PathBuf::from(dir).join("corncob.db"));
    }
    let data_dir = dirs::data_dir().context("could not determine platform data directory")?;
    Ok(data_dir.join("corncob").join("corncob.db"))
}

pub async fn open_cache(db_path: &Path) -> Result<SqliteChainRepository> {
    let pool = DatabasePool::new(db_path).await?;
    Ok(SqliteChainRepository::new(pool.pool().clone()))
}

pub fn scratch_dir_for(repo_dir: &Path, nickname: &RemoteNickname) -> PathBuf {
    repo_dir.join(".corncob").join("scratch").join(nickname.as_str())
}

/// Looks up a configured remote by nickname, failing with a clear message if
/// it isn't known.
pub async fn require_remote(
    cache: &SqliteChainRepository,
    nickname: &RemoteNickname,
) -> Result<RemoteRecord> {
    cache
        .get_remote(nickname)
        .await?
        .with_context(|| format!("no remote named '{}' is configured (run `corncob add`)", nickname.as_str()))
}
