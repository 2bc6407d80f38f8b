//! `corncob remove <nickname>` - forget a configured remote.

use anyhow::Result;
use clap::Args;

use corncob_core::domain::ids::RemoteNickname;
use corncob_core::ports::chain_repository::ChainRepository;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Args)]
pub struct RemoveCommand {
    nickname: String,
}

impl RemoveCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let nickname = RemoteNickname::new(self.nickname.as_str())?;
        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        context::require_remote(&cache, &nickname).await?;
        cache.remove_remote(&nickname).await?;

        formatter.success(&format!("removed remote '{}'", nickname.as_str()));
        Ok(())
    }
}
