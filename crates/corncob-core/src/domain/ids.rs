//! Validated identifier newtypes for the CornCob protocol.
//!
//! Links and bundles carry short opaque hex tokens; the literal string
//! `"initial-snapshot"` is the sentinel marking the start of a chain (see
//! `SPEC_FULL.md` §3). Commit ids are opaque handles owned by the external
//! VCS engine and are not validated beyond non-emptiness.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Sentinel marking the start of a chain, or an unset prerequisite commit.
pub const INITIAL_SNAPSHOT: &str = "initial-snapshot";

/// Minimum hex length for a link/bundle id: 64 bits = 16 hex digits.
const MIN_TOKEN_HEX_LEN: usize = 16;

fn is_lowercase_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

fn generate_hex_token() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Identifier of a published link, or the `initial-snapshot` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LinkId(String);

impl LinkId {
    /// Generates a fresh random link id (never the sentinel).
    pub fn generate() -> Self {
        Self(generate_hex_token())
    }

    /// The sentinel identifying the chain's beginning.
    pub fn initial_snapshot() -> Self {
        Self(INITIAL_SNAPSHOT.to_string())
    }

    pub fn is_initial_snapshot(&self) -> bool {
        self.0 == INITIAL_SNAPSHOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value == INITIAL_SNAPSHOT || (is_lowercase_hex(&value) && value.len() >= MIN_TOKEN_HEX_LEN) {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidId(value))
        }
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for LinkId {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for LinkId {
    type Error = DomainError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LinkId> for String {
    fn from(value: LinkId) -> Self {
        value.0
    }
}

/// Identifier of a content-named bundle object. Never the sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BundleId(String);

impl BundleId {
    pub fn generate() -> Self {
        Self(generate_hex_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if is_lowercase_hex(&value) && value.len() >= MIN_TOKEN_HEX_LEN {
            Ok(Self(value))
        } else {
            Err(DomainError::InvalidId(value))
        }
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BundleId {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BundleId {
    type Error = DomainError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BundleId> for String {
    fn from(value: BundleId) -> Self {
        value.0
    }
}

/// An opaque commit handle from the external VCS engine, or the
/// `initial-snapshot` sentinel used when a branch/prereq has no commit yet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() {
            return Err(DomainError::ValidationFailed(
                "commit id must not be empty".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn initial_snapshot() -> Self {
        Self(INITIAL_SNAPSHOT.to_string())
    }

    pub fn is_initial_snapshot(&self) -> bool {
        self.0 == INITIAL_SNAPSHOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A branch name. The protocol currently publishes exactly one, conventionally
/// `main`, but the wire format preserves a list (`SPEC_FULL.md` §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.is_empty() || value.contains(char::is_whitespace) {
            return Err(DomainError::ValidationFailed(format!(
                "invalid branch name: {value:?}"
            )));
        }
        Ok(Self(value))
    }

    pub fn main() -> Self {
        Self("main".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The local nickname a participant gives one configured remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteNickname(String);

impl RemoteNickname {
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(value))
        } else {
            Err(DomainError::ValidationFailed(format!(
                "invalid remote nickname: {value:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteNickname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteNickname {
    type Err = DomainError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_id_accepts_sentinel_and_hex() {
        assert!(LinkId::new(INITIAL_SNAPSHOT).is_ok());
        assert!(LinkId::new("a1b2c3d4e5f60718").is_ok());
        assert!(LinkId::new("not-hex").is_err());
        assert!(LinkId::new("ab").is_err());
    }

    #[test]
    fn link_id_generate_is_not_sentinel() {
        let id = LinkId::generate();
        assert!(!id.is_initial_snapshot());
    }

    #[test]
    fn bundle_id_rejects_sentinel() {
        assert!(BundleId::new(INITIAL_SNAPSHOT).is_err());
    }

    #[test]
    fn commit_id_sentinel_round_trips() {
        let c = CommitId::initial_snapshot();
        assert!(c.is_initial_snapshot());
        assert_eq!(c.as_str(), INITIAL_SNAPSHOT);
    }

    #[test]
    fn branch_name_rejects_whitespace() {
        assert!(BranchName::new("main").is_ok());
        assert!(BranchName::new("has space").is_err());
        assert!(BranchName::new("").is_err());
    }

    #[test]
    fn remote_nickname_validation() {
        assert!(RemoteNickname::new("bob-drive").is_ok());
        assert!(RemoteNickname::new("bad/slash").is_err());
    }
}
