//! The CornCob remote URL scheme and the locally-configured remote record.
//!
//! See `SPEC_FULL.md` §6 and §3 ("Remote record").

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;
use crate::domain::ids::RemoteNickname;

/// A parsed `corncob:<inner>` URL naming one remote zone and which adapter
/// kind serves it. Credentials never live in the URL (`SPEC_FULL.md` §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteUrl {
    /// `corncob:file://<absolute_path>` — local folder adapter, for tests and
    /// single-machine use.
    File { path: PathBuf },
    /// `corncob:smallsea://<session_token>` — routed through the local hub.
    SmallSea { session_token: String },
    /// `corncob:s3://<bucket>` — S3-style object store.
    S3 { bucket: String },
    /// `corncob:gdrive://<account_ref>` — Google Drive app-folder.
    GDrive { account_ref: String },
    /// `corncob:dropbox://<account_ref>` — Dropbox app-folder.
    Dropbox { account_ref: String },
}

impl fmt::Display for RemoteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteUrl::File { path } => write!(f, "corncob:file://{}", path.display()),
            RemoteUrl::SmallSea { session_token } => write!(f, "corncob:smallsea://{session_token}"),
            RemoteUrl::S3 { bucket } => write!(f, "corncob:s3://{bucket}"),
            RemoteUrl::GDrive { account_ref } => write!(f, "corncob:gdrive://{account_ref}"),
            RemoteUrl::Dropbox { account_ref } => write!(f, "corncob:dropbox://{account_ref}"),
        }
    }
}

impl FromStr for RemoteUrl {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.strip_prefix("corncob:").ok_or_else(|| {
            DomainError::ValidationFailed(format!("not a corncob: url: {s:?}"))
        })?;

        if let Some(path) = inner.strip_prefix("file://") {
            return Ok(RemoteUrl::File {
                path: PathBuf::from(path),
            });
        }
        if let Some(token) = inner.strip_prefix("smallsea://") {
            return Ok(RemoteUrl::SmallSea {
                session_token: token.to_string(),
            });
        }
        if let Some(bucket) = inner.strip_prefix("s3://") {
            return Ok(RemoteUrl::S3 {
                bucket: bucket.to_string(),
            });
        }
        if let Some(account_ref) = inner.strip_prefix("gdrive://") {
            return Ok(RemoteUrl::GDrive {
                account_ref: account_ref.to_string(),
            });
        }
        if let Some(account_ref) = inner.strip_prefix("dropbox://") {
            return Ok(RemoteUrl::Dropbox {
                account_ref: account_ref.to_string(),
            });
        }

        Err(DomainError::ValidationFailed(format!(
            "unrecognized corncob url scheme: {s:?}"
        )))
    }
}

/// A configured remote: its local nickname, its URL, and any adapter-private
/// side-state that needs to persist between runs (e.g. Google Drive's
/// path→file_id cache, serialized per `SPEC_FULL.md` §4.1's persistence hook).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    pub nickname: RemoteNickname,
    pub url: RemoteUrl,
    pub adapter_state: Option<String>,
    /// Etag of the latest pointer as of the last successful observe, used to
    /// short-circuit re-reads; always re-verified before a conditional write.
    pub last_observed_etag: Option<String>,
}

impl RemoteRecord {
    pub fn new(nickname: RemoteNickname, url: RemoteUrl) -> Self {
        Self {
            nickname,
            url,
            adapter_state: None,
            last_observed_etag: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_file_url() {
        let url: RemoteUrl = "corncob:file:///tmp/remote".parse().unwrap();
        assert_eq!(
            url,
            RemoteUrl::File {
                path: PathBuf::from("/tmp/remote")
            }
        );
    }

    #[test]
    fn parses_smallsea_url() {
        let url: RemoteUrl = "corncob:smallsea://sess-123".parse().unwrap();
        assert_eq!(
            url,
            RemoteUrl::SmallSea {
                session_token: "sess-123".to_string()
            }
        );
    }

    #[test]
    fn round_trips_display_and_parse() {
        let url = RemoteUrl::S3 {
            bucket: "my-bucket".to_string(),
        };
        let text = url.to_string();
        let parsed: RemoteUrl = text.parse().unwrap();
        assert_eq!(url, parsed);
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!("corncob:ftp://nope".parse::<RemoteUrl>().is_err());
        assert!("not-a-corncob-url".parse::<RemoteUrl>().is_err());
    }
}
