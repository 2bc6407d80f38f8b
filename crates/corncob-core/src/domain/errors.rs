//! Domain and protocol error types.
//!
//! `DomainError` covers validation failures in the newtypes under
//! [`crate::domain::ids`] and [`crate::domain::link`]. `CorncobError` is the
//! uniform error taxonomy the storage adapters and the link-chain engine
//! classify failures into (`SPEC_FULL.md` §7).

use thiserror::Error;

/// Errors from validating or constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("invalid link: {0}")]
    InvalidLink(String),
}

/// The uniform error taxonomy a storage adapter and the link-chain engine
/// report into. One variant per row of `SPEC_FULL.md` §7's table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorncobError {
    /// The requested object does not exist on the remote.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create-only write target already had content.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A conditional write's expected etag did not match the remote's current one.
    #[error("etag mismatch on {path}: expected {expected}")]
    ETagMismatch { path: String, expected: String },

    /// Network/transport failure; safe to retry without local mutation.
    #[error("transport error: {0}")]
    Transport(String),

    /// The access token had expired and could not be refreshed.
    #[error("authentication expired: {0}")]
    AuthExpired(String),

    /// A fetched bundle failed internal verification.
    #[error("invalid bundle: {0}")]
    BundleInvalid(String),

    /// `clone` was attempted against a remote whose latest link is not the
    /// chain's first link (has a non-sentinel `prev_id`, or more than one bundle).
    #[error("remote history is not a single initial link; fetch into an existing clone instead")]
    NonInitialClone,

    /// `clone` was attempted against a remote with no latest pointer published yet.
    #[error("remote has no published history")]
    EmptyRemote,

    /// The external VCS-engine subprocess exited non-zero.
    #[error("vcs engine failed (exit {exit_code}): {stderr}")]
    VcsEngineFailed { exit_code: i32, stderr: String },

    /// Anything else, carrying a short diagnostic message.
    #[error("{0}")]
    Other(String),
}

impl CorncobError {
    /// Whether the engine's retry policy (`SPEC_FULL.md` §4.4) should retry
    /// this failure transparently before surfacing it to the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, CorncobError::Transport(_))
    }
}
