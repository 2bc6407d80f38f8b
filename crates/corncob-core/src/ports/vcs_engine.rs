//! VCS-engine capability port (driven/secondary port)
//!
//! CornCob drives an external version-control engine as a subprocess tool for
//! delta computation, graph integration, and merge (`SPEC_FULL.md` §6). This
//! module describes only the contract; `corncob-engine` supplies the concrete
//! implementation that shells out, and tests supply an in-memory fake.
//!
//! ## Design Notes
//!
//! - Injectable as a capability object (`Arc<dyn VcsEngine + Send + Sync>`)
//!   so the link-chain engine's state machine can be exercised without a
//!   real subprocess.
//! - Returns `anyhow::Result` for all but the exit-code failure, which is
//!   reported as `CorncobError::VcsEngineFailed` so CLI dispatch can select
//!   the right exit code (`SPEC_FULL.md` §6/§7).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::errors::CorncobError;
use crate::domain::ids::{BranchName, CommitId};

/// What kind of object an id names in the local commit graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Commit,
    Tree,
    Blob,
    Absent,
}

/// Port trait for the external VCS engine, invoked as a subprocess.
///
/// Every method that can fail due to the subprocess exiting non-zero returns
/// `CorncobError::VcsEngineFailed { exit_code, stderr }`.
#[async_trait::async_trait]
pub trait VcsEngine: Send + Sync {
    /// Creates an empty commit graph at `repo_dir` with `initial_branch` checked out.
    async fn init(&self, repo_dir: &Path, initial_branch: &BranchName) -> Result<(), CorncobError>;

    /// Lists the branches present in the local commit graph.
    async fn list_branches(&self, repo_dir: &Path) -> Result<Vec<BranchName>, CorncobError>;

    /// Returns the current head commit of `branch`.
    async fn head_of(&self, repo_dir: &Path, branch: &BranchName) -> Result<CommitId, CorncobError>;

    /// Classifies what kind of object, if any, `object_id` names locally.
    async fn object_kind(&self, repo_dir: &Path, object_id: &CommitId) -> Result<ObjectKind, CorncobError>;

    /// Creates a lightweight tag `name` pointing at `commit_id`. Used as the
    /// anchor naming a bundle's `from` revision (`SPEC_FULL.md` §4.3).
    async fn create_tag(&self, repo_dir: &Path, name: &str, commit_id: &CommitId) -> Result<(), CorncobError>;

    /// Removes a tag created by `create_tag`. Must be called on every exit
    /// path of the build operation that created it.
    async fn delete_tag(&self, repo_dir: &Path, name: &str) -> Result<(), CorncobError>;

    /// Builds a bundle at `output_path` for the given rev-range or ref spec
    /// (e.g. `"<tag>..<branch>"` or a bare ref for full history).
    async fn build_bundle(
        &self,
        repo_dir: &Path,
        output_path: &Path,
        rev_range_or_ref: &str,
    ) -> Result<(), CorncobError>;

    /// Verifies a bundle's internal consistency without integrating it.
    ///
    /// # Errors
    /// `CorncobError::BundleInvalid` if verification fails.
    async fn verify_bundle(&self, path: &Path) -> Result<(), CorncobError>;

    /// Fetches all refs from the bundle at `bundle_path` into `repo_dir`'s
    /// private remote-tracking ref namespace. Never touches user branches.
    async fn fetch_from(&self, repo_dir: &Path, bundle_path: &Path, ref_namespace: &str) -> Result<(), CorncobError>;

    /// Initializes a fresh local commit graph at `dest_dir` from a bundle
    /// that carries full reachable history (used by `clone`).
    async fn clone_from(&self, bundle_path: &Path, dest_dir: &Path) -> Result<(), CorncobError>;

    /// Checks out `branch` in the working tree at `repo_dir`.
    async fn checkout(&self, repo_dir: &Path, branch: &BranchName) -> Result<(), CorncobError>;

    /// Merges `reference` (typically a fetched remote-tracking ref) into the
    /// currently checked-out branch at `repo_dir`. Conflict resolution is the
    /// engine's responsibility; CornCob reports the result unchanged.
    async fn merge(&self, repo_dir: &Path, reference: &str) -> Result<(), CorncobError>;
}
