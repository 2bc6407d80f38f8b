//! `corncob add <nickname> <remote-url>` - register a remote without touching
//! the local commit graph.

use anyhow::Result;
use clap::Args;

use corncob_core::domain::ids::RemoteNickname;
use corncob_core::domain::remote::{RemoteRecord, RemoteUrl};
use corncob_core::ports::chain_repository::ChainRepository;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct AddCommand {
    /// Local name this remote will be referred to by
    nickname: String,
    /// CornCob remote URL, e.g. `corncob:file:///srv/team-graph`
    remote_url: String,
}

impl AddCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let nickname = RemoteNickname::new(self.nickname.as_str())?;
        let url: RemoteUrl = self.remote_url.parse()?;

        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        cache.save_remote(&RemoteRecord::new(nickname.clone(), url)).await?;

        formatter.success(&format!("added remote '{}'", nickname.as_str()));
        Ok(())
    }
}
