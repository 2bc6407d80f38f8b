//! `corncob fetch <nickname> [branches...]` - walk the remote's link chain
//! and integrate missing bundles into private remote-tracking refs.
//!
//! `branches` is accepted for CLI-surface symmetry with `push`/`merge` but is
//! presently unused: a fetch always walks the full chain and brings every
//! branch's remote-tracking ref up to date, since a partial chain walk would
//! leave prerequisites for other branches unresolved.

use std::sync::Arc;

use anyhow::Result;

use clap::Args;

use corncob_core::domain::ids::RemoteNickname;
use corncob_engine::{LinkChainEngine, ProcessVcsEngine};

use crate::context;
use crate::output::{get_formatter, OutputFormat};
use crate::remotes::build_storage_adapter;

#[derive(Debug, Args)]
pub struct FetchCommand {
    /// Configured remote to fetch from
    nickname: String,
    /// Accepted for CLI-surface symmetry with push/merge; currently unused
    #[arg(hide = true)]
    branches: Vec<String>,
}

impl FetchCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let nickname = RemoteNickname::new(self.nickname.as_str())?;
        let repo_dir = std::env::current_dir()?;

        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        let remote = context::require_remote(&cache, &nickname).await?;

        let storage = build_storage_adapter(&remote.url, remote.adapter_state.as_deref())?;
        let vcs = Arc::new(ProcessVcsEngine::default());
        let engine = LinkChainEngine::new(storage, vcs);

        let scratch_dir = context::scratch_dir_for(&repo_dir, &nickname);
        let outcome = engine.fetch(&repo_dir, &scratch_dir, &nickname).await?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "applied_links": outcome.applied_links.len(),
                "ref_namespace": outcome.ref_namespace,
            }));
        } else {
            formatter.success(&format!(
                "fetched {} new link(s) from '{}' into {}/*",
                outcome.applied_links.len(),
                nickname.as_str(),
                outcome.ref_namespace
            ));
        }
        Ok(())
    }
}
