//! `corncob clone <remote-url> [nickname]` - bootstrap a fresh local graph
//! from a remote's initial link, then register the remote under `nickname`
//! (defaulting to the remote's own natural name) for future `push`/`fetch`.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use corncob_core::domain::ids::{BranchName, RemoteNickname};
use corncob_core::domain::remote::{RemoteRecord, RemoteUrl};
use corncob_core::ports::chain_repository::ChainRepository;
use corncob_engine::{LinkChainEngine, ProcessVcsEngine};

use crate::context;
use crate::output::{get_formatter, OutputFormat};
use crate::remotes::build_storage_adapter;

#[derive(Debug, Args)]
pub struct CloneCommand {
    /// CornCob remote URL to clone from
    remote_url: String,
    /// Local nickname to register the remote under (defaults to "origin")
    nickname: Option<String>,
}

impl CloneCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let url: RemoteUrl = self.remote_url.parse()?;
        let nickname = RemoteNickname::new(self.nickname.as_deref().unwrap_or("origin"))?;

        let storage = build_storage_adapter(&url, None)?;
        let vcs = Arc::new(ProcessVcsEngine::default());
        let engine = LinkChainEngine::new(storage, vcs);

        let dest_dir = std::env::current_dir()?.join(nickname.as_str());
        engine.clone(&dest_dir, &BranchName::main()).await?;

        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        cache.save_remote(&RemoteRecord::new(nickname.clone(), url)).await?;

        formatter.success(&format!(
            "cloned into {} (remote '{}')",
            dest_dir.display(),
            nickname.as_str()
        ));
        Ok(())
    }
}
