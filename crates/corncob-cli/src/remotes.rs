//! Maps a configured remote's `RemoteUrl` and persisted adapter side-state to
//! a concrete `Arc<dyn StorageAdapter>`.
//!
//! Credentials for provider-backed adapters come from the environment
//! (S3, grounded on `sorng-aws`'s `AWS_ACCESS_KEY_ID`/`AWS_SECRET_ACCESS_KEY`
//! pattern) or the system keyring (Drive/Dropbox OAuth tokens, populated by
//! `corncob login`).

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use corncob_adapters::dropbox::DropboxAdapter;
use corncob_adapters::gdrive::GDriveAdapter;
use corncob_adapters::local::LocalFolderAdapter;
use corncob_adapters::oauth::{KeyringTokenStorage, OAuth2Config, OAuthLoginFlow};
use corncob_adapters::s3::S3Adapter;
use corncob_adapters::smallsea::SmallSeaAdapter;
use corncob_core::domain::remote::RemoteUrl;
use corncob_core::ports::storage_adapter::StorageAdapter;

/// Builds the storage adapter for a configured remote, wiring in whatever
/// credentials that backend needs.
pub fn build_storage_adapter(
    url: &RemoteUrl,
    adapter_state: Option<&str>,
) -> Result<Arc<dyn StorageAdapter>> {
    match url {
        RemoteUrl::File { path } => {
            let adapter = LocalFolderAdapter::new(path.clone())
                .with_context(|| format!("failed to open local remote at {}", path.display()))?;
            Ok(Arc::new(adapter))
        }
        RemoteUrl::SmallSea { session_token } => {
            let hub_base_url = env::var("CORNCOB_SMALLSEA_HUB_URL")
                .unwrap_or_else(|_| "https://hub.smallsea.example".to_string());
            Ok(Arc::new(SmallSeaAdapter::new(hub_base_url, session_token.clone())))
        }
        RemoteUrl::S3 { bucket } => {
            let region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
            let access_key_id = env::var("AWS_ACCESS_KEY_ID")
                .context("AWS_ACCESS_KEY_ID must be set to use an S3 remote")?;
            let secret_access_key = env::var("AWS_SECRET_ACCESS_KEY")
                .context("AWS_SECRET_ACCESS_KEY must be set to use an S3 remote")?;
            let mut adapter = S3Adapter::new(bucket.clone(), region, access_key_id, secret_access_key);
            if let Ok(endpoint) = env::var("CORNCOB_S3_ENDPOINT") {
                adapter = adapter.with_endpoint_override(endpoint);
            }
            Ok(Arc::new(adapter))
        }
        RemoteUrl::GDrive { account_ref } => {
            let tokens = KeyringTokenStorage::load(account_ref)?.with_context(|| {
                format!("no stored credentials for '{account_ref}' - run `corncob login gdrive {account_ref}` first")
            })?;
            let client_id = env::var("CORNCOB_GDRIVE_CLIENT_ID")
                .context("CORNCOB_GDRIVE_CLIENT_ID must be set to use a Google Drive remote")?;
            let oauth = OAuthLoginFlow::new(OAuth2Config::google_drive(client_id), 8401);
            let path_ids = parse_path_ids(adapter_state)?;
            Ok(Arc::new(GDriveAdapter::new(tokens, oauth, path_ids)))
        }
        RemoteUrl::Dropbox { account_ref } => {
            let tokens = KeyringTokenStorage::load(account_ref)?.with_context(|| {
                format!("no stored credentials for '{account_ref}' - run `corncob login dropbox {account_ref}` first")
            })?;
            let client_id = env::var("CORNCOB_DROPBOX_CLIENT_ID")
                .context("CORNCOB_DROPBOX_CLIENT_ID must be set to use a Dropbox remote")?;
            let oauth = OAuthLoginFlow::new(OAuth2Config::dropbox(client_id), 8402);
            Ok(Arc::new(DropboxAdapter::new(tokens, oauth)))
        }
    }
}

fn parse_path_ids(adapter_state: Option<&str>) -> Result<HashMap<String, String>> {
    match adapter_state {
        None => Ok(HashMap::new()),
        Some(raw) => serde_json::from_str(raw).context("failed to parse stored Drive path-id cache"),
    }
}

/// Resolves a login target name (`"gdrive"` / `"dropbox"`) to its OAuth2
/// endpoint config and default callback port.
pub fn oauth_config_for(provider: &str, client_id: String) -> Result<(OAuth2Config, u16)> {
    match provider {
        "gdrive" => Ok((OAuth2Config::google_drive(client_id), 8401)),
        "dropbox" => Ok((OAuth2Config::dropbox(client_id), 8402)),
        other => bail!("unknown login provider '{other}' (expected 'gdrive' or 'dropbox')"),
    }
}
