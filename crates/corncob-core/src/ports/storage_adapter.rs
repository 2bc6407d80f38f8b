//! Storage adapter port (driven/secondary port)
//!
//! This module defines the uniform conditional-write interface every
//! backend-specific storage adapter implements: S3-style object stores,
//! Google Drive app-folder, Dropbox app-folder, and a local folder used for
//! tests. See `SPEC_FULL.md` §4.1.
//!
//! ## Design Notes
//!
//! - Returns `Result<_, CorncobError>` directly (not `anyhow::Result`)
//!   because callers in the link-chain engine match on the error kind to
//!   decide how to proceed (§4.4's state machine, §7's recovery table).
//! - Uses `#[async_trait]` for async trait methods.
//! - `Tokens` mirrors the OAuth adapters' refresh bookkeeping; non-OAuth
//!   adapters (local folder, S3 with static credentials) simply never call
//!   into it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::errors::CorncobError;

/// OAuth tokens held by an adapter that authenticates against a provider
/// token endpoint (Google Drive, Dropbox).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// True if the token expires within `duration` from now. CornCob adapters
    /// use a five-minute skew window before every request (`SPEC_FULL.md` §4.1).
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// The skew window storage adapters consult before issuing a request.
pub const TOKEN_REFRESH_SKEW: chrono::Duration = chrono::Duration::minutes(5);

/// An object's current bytes and opaque conditional-write handle.
#[derive(Debug, Clone)]
pub struct ObjectContent {
    pub bytes: Vec<u8>,
    pub etag: String,
}

/// Port trait for one remote object-store zone (a bucket, an app-folder, a
/// local directory). Every concrete adapter normalizes its backend's quirks
/// to exactly these four operations and the uniform `CorncobError` taxonomy.
#[async_trait::async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Fetches the current bytes and etag at `path`.
    ///
    /// # Errors
    /// `CorncobError::NotFound` if absent, `CorncobError::Transport` on
    /// network failure, `CorncobError::AuthExpired` if token refresh failed.
    async fn download(&self, path: &str) -> Result<ObjectContent, CorncobError>;

    /// Unconditionally writes `bytes` at `path`, returning the new etag.
    async fn upload_overwrite(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError>;

    /// Writes `bytes` at `path` only if no object exists there yet.
    ///
    /// # Errors
    /// `CorncobError::AlreadyExists` if the object already exists.
    async fn upload_fresh(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, CorncobError>;

    /// Writes `bytes` at `path` only if the object's current etag equals `etag`.
    ///
    /// # Errors
    /// `CorncobError::ETagMismatch` if the object's etag has since changed.
    async fn upload_if_match(
        &self,
        path: &str,
        bytes: &[u8],
        etag: &str,
        content_type: &str,
    ) -> Result<String, CorncobError>;

    /// Serializes any adapter-private side-state (e.g. Drive's path→file_id
    /// cache) so the caller can persist it between runs (`SPEC_FULL.md` §4.1).
    /// Adapters with no side-state return `None`.
    async fn serialize_state(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_expiring_in(minutes: i64) -> Tokens {
        Tokens {
            access_token: "at".to_string(),
            refresh_token: Some("rt".to_string()),
            expires_at: Utc::now() + chrono::Duration::minutes(minutes),
        }
    }

    #[test]
    fn token_within_skew_window_counts_as_expired() {
        let tokens = tokens_expiring_in(3);
        assert!(tokens.expires_within(TOKEN_REFRESH_SKEW));
        assert!(!tokens.is_expired());
    }

    #[test]
    fn token_well_outside_skew_window_is_fresh() {
        let tokens = tokens_expiring_in(60);
        assert!(!tokens.expires_within(TOKEN_REFRESH_SKEW));
    }
}
