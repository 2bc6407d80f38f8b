//! `corncob config` - inspect configured remotes.

use anyhow::Result;
use clap::Subcommand;

use corncob_core::domain::ids::RemoteNickname;
use corncob_core::ports::chain_repository::ChainRepository;

use crate::context;
use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// List every configured remote
    List,
    /// Show one remote's recorded URL and side-state
    Show {
        nickname: String,
    },
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::List => self.execute_list(format).await,
            ConfigCommand::Show { nickname } => self.execute_show(nickname, format).await,
        }
    }

    async fn execute_list(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        let remotes = cache.list_remotes().await?;

        if matches!(format, OutputFormat::Json) {
            let json = serde_json::json!(remotes
                .iter()
                .map(|r| serde_json::json!({
                    "nickname": r.nickname.as_str(),
                    "url": r.url.to_string(),
                    "last_observed_etag": r.last_observed_etag,
                }))
                .collect::<Vec<_>>());
            formatter.print_json(&json);
        } else if remotes.is_empty() {
            formatter.info("no remotes configured");
        } else {
            for remote in &remotes {
                formatter.info(&format!("{}\t{}", remote.nickname.as_str(), remote.url));
            }
        }
        Ok(())
    }

    async fn execute_show(&self, nickname: &str, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let nickname = RemoteNickname::new(nickname)?;
        let db_path = context::default_cache_db_path()?;
        let cache = context::open_cache(&db_path).await?;
        let remote = context::require_remote(&cache, &nickname).await?;

        if matches!(format, OutputFormat::Json) {
            formatter.print_json(&serde_json::json!({
                "nickname": remote.nickname.as_str(),
                "url": remote.url.to_string(),
                "adapter_state": remote.adapter_state,
                "last_observed_etag": remote.last_observed_etag,
            }));
        } else {
            formatter.info(&format!("nickname: {}", remote.nickname.as_str()));
            formatter.info(&format!("url: {}", remote.url));
            formatter.info(&format!(
                "last observed etag: {}",
                remote.last_observed_etag.as_deref().unwrap_or("<none>")
            ));
        }
        Ok(())
    }
}
