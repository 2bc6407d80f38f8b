//! `corncob push <nickname> [branches...]` - publish the current heads of
//! `branches` (default: every local branch) as a new link.

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
pub struct PushCommand {
    /// Configured remote to push to
    nickname: String,
    /// Branches to publish (defaults to every local branch)
    branches: Vec<String>,
}

impl PushCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let nickname = RemoteNickname::new(self.nickname.as_str())?;
        let repo_dir = std::env::current_dir()?;
        let vcs = Arc::new(ProcessVcsEngine::default());

        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        let remote = context::require_remote(&cache, &nickname).await?;

        let branches = resolve_branches(&vcs, &repo_dir, &self.branches).await?;
        let storage = build_storage_adapter(&remote.url, remote.adapter_state.as_deref())?;
        let engine = LinkChainEngine::new(storage, vcs);

        let scratch_dir = context::scratch_dir_for(&repo_dir, &nickname);
        let outcome = engine.push(&repo_dir, &scratch_dir, &branches).await?;

        formatter.success(&format!(
            "pushed link {} (bundle {}) to '{}'",
            outcome.link_id,
            outcome.bundle_id,
            nickname.as_str()
        ));
        Ok(())
    }
}

async fn resolve_branches(
    vcs: &Arc<ProcessVcsEngine>,
    repo_dir: &std::path::Path,
    requested: &[String],
) -> Result<Vec<BranchName>> {
    if requested.is_empty() {
        Ok(vcs.list_branches(repo_dir).await?)
    } else {
        requested.iter().map(|b| Ok(BranchName::new(b)?)).collect()
    }
}
