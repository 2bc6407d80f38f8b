//! Chain repository port (driven/secondary port)
//!
//! This module defines the interface for persisting the local bookkeeping a
//! CornCob client needs between runs: configured remotes and their CornCob
//! URLs, adapter-private side-state, and the last-observed latest-pointer
//! etag per remote (`SPEC_FULL.md` §3 "Remote record", §4.1 persisted
//! side-state).
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite here) and don't need protocol-level classification.
//! - This is local, single-participant bookkeeping; it has nothing to do
//!   with the remote latest pointer's own conditional-write semantics.

use crate::domain::ids::RemoteNickname;
use crate::domain::remote::RemoteRecord;

/// Port trait for persistent local remote configuration.
#[async_trait::async_trait]
pub trait ChainRepository: Send + Sync {
    /// Saves a remote record (insert or update by nickname).
    async fn save_remote(&self, remote: &RemoteRecord) -> anyhow::Result<()>;

    /// Retrieves a remote record by its nickname.
    async fn get_remote(&self, nickname: &RemoteNickname) -> anyhow::Result<Option<RemoteRecord>>;

    /// Lists all configured remotes.
    async fn list_remotes(&self) -> anyhow::Result<Vec<RemoteRecord>>;

    /// Removes a configured remote by nickname.
    async fn remove_remote(&self, nickname: &RemoteNickname) -> anyhow::Result<()>;

    /// Updates only the last-observed latest-pointer etag for a remote,
    /// leaving its URL and adapter state untouched.
    async fn update_observed_etag(
        &self,
        nickname: &RemoteNickname,
        etag: Option<&str>,
    ) -> anyhow::Result<()>;
}
