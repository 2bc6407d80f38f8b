//! `corncob merge <nickname> [branches...]` - merge a remote's fetched
//! remote-tracking refs into the caller's local branches.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use corncob_core::domain::ids::{BranchName, RemoteNickname};
use corncob_core::ports::vcs_engine::VcsEngine;
use corncob_engine::{LinkChainEngine, ProcessVcsEngine};

use crate::context;
use crate::output::{get_formatter, OutputFormat};
use crate::remotes::build_storage_adapter;

#[derive(Debug, Args)]
pub struct MergeCommand {
    /// Configured remote whose fetched refs should be merged in
    nickname: String,
    /// Branches to merge (defaults to every local branch)
    branches: Vec<String>,
}

impl MergeCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let nickname = RemoteNickname::new(self.nickname.as_str())?;
        let repo_dir = std::env::current_dir()?;
        let vcs = Arc::new(ProcessVcsEngine::default());

        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        let remote = context::require_remote(&cache, &nickname).await?;

        let branches = if self.branches.is_empty() {
            vcs.list_branches(&repo_dir).await?
        } else {
            self.branches
                .iter()
                .map(|b| BranchName::new(b))
                .collect::<Result<Vec<_>, _>>()?
        };

        let storage = build_storage_adapter(&remote.url, remote.adapter_state.as_deref())?;
        let engine = LinkChainEngine::new(storage, vcs);
        let ref_namespace = format!("corncob/{}", nickname.as_str());
        engine.merge(&repo_dir, &ref_namespace, &branches).await?;

        formatter.success(&format!("merged {}/* into local branches", ref_namespace));
        Ok(())
    }
}
