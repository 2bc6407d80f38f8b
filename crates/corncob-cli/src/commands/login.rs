//! `corncob login <gdrive|dropbox> <account-ref>` - interactive OAuth login,
//! storing the resulting tokens in the system keyring under `account-ref` so
//! a later `corncob add`/`push`/`fetch` against a Drive or Dropbox remote can
//! find them.
//!
//! Not named in the upstream CLI surface (it has no OAuth-backed adapters to
//! authenticate), but necessary plumbing for the two adapters that are
//! OAuth-backed here - grounded on the teacher's own `lnxdrive auth login`
//! command.

use anyhow::{Context, Result};
use clap::Args;

use corncob_adapters::oauth::KeyringTokenStorage;

use crate::output::{get_formatter, OutputFormat};
use crate::remotes::oauth_config_for;

#[derive(Debug, Args)]
pub struct LoginCommand {
    /// Provider to authenticate against: "gdrive" or "dropbox"
    provider: String,
    /// Short name this account will be referred to by in remote URLs
    account_ref: String,
    /// OAuth client id (defaults to CORNCOB_GDRIVE_CLIENT_ID / CORNCOB_DROPBOX_CLIENT_ID)
    #[arg(long)]
    client_id: Option<String>,
}

impl LoginCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));

        let client_id = self
            .client_id
            .clone()
            .or_else(|| std::env::var(env_var_for(&self.provider)).ok())
            .with_context(|| format!("no OAuth client id given for '{}'", self.provider))?;

        let (config, port) = oauth_config_for(&self.provider, client_id)?;
        let flow = corncob_adapters::oauth::OAuthLoginFlow::new(config, port);

        formatter.info("opening browser for authentication...");
        let tokens = flow.login().await?;
        KeyringTokenStorage::store(&self.account_ref, &tokens)?;

        formatter.success(&format!(
            "stored {} credentials for '{}'",
            self.provider, self.account_ref
        ));
        Ok(())
    }
}

fn env_var_for(provider: &str) -> &'static str {
    match provider {
        "gdrive" => "CORNCOB_GDRIVE_CLIENT_ID",
        _ => "CORNCOB_DROPBOX_CLIENT_ID",
    }
}
