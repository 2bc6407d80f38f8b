//! Merge use case: integrate fetched remote-tracking refs into the caller's
//! branches.
//!
//! Implements the Merge operation from `SPEC_FULL.md` §4.4. Conflict
//! resolution beyond fast-forward is entirely the external VCS engine's
//! responsibility; this use case reports whatever it returns, unchanged.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::CorncobError;
use crate::domain::ids::BranchName;
use crate::ports::vcs_engine::VcsEngine;

pub struct MergeUseCase {
    vcs: Arc<dyn VcsEngine>,
}

impl MergeUseCase {
    pub fn new(vcs: Arc<dyn VcsEngine>) -> Self {
        Self { vcs }
    }

    /// Merges `corncob/<nickname>/<branch>` into the checked-out `branch`,
    /// for each of `branches`.
    pub async fn merge(
        &self,
        repo_dir: &Path,
        ref_namespace: &str,
        branches: &[BranchName],
    ) -> Result<(), CorncobError> {
        for branch in branches {
            self.vcs.checkout(repo_dir, branch).await?;
            let reference = format!("{ref_namespace}/{branch}");
            self.vcs.merge(repo_dir, &reference).await?;
            info!(%branch, reference, "merge: complete");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Arc;

    use crate::test_support::FakeVcsEngine;

    use super::*;

    #[tokio::test]
    async fn merge_fast_forwards_the_checked_out_branch() {
        let vcs = Arc::new(FakeVcsEngine::new());
        let repo = Path::new("/alice/repo");
        vcs.commit(
            repo,
            "main",
            HashMap::from([("a.txt".to_string(), b"base".to_vec())]),
        );
        // Stands in for a fetch having already populated the remote-tracking
        // ref; merge itself only cares that the reference resolves.
        vcs.commit(
            repo,
            "corncob/bob/main",
            HashMap::from([("a.txt".to_string(), b"bob-update".to_vec())]),
        );

        let merge = MergeUseCase::new(vcs.clone());
        merge
            .merge(repo, "corncob/bob", &[BranchName::main()])
            .await
            .unwrap();

        let files = vcs.checked_out_files(repo, "main");
        assert_eq!(files.get("a.txt").unwrap(), b"bob-update");
    }
}
