//! Fetch use case: walk the remote's link chain and integrate missing bundles
//! into private remote-tracking refs.
//!
//! Implements the Fetch operation from `SPEC_FULL.md` §4.4, including the
//! chain-walk-stops-at-known-prereq behavior exercised by scenario S6.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::errors::CorncobError;
use crate::domain::ids::RemoteNickname;
use crate::domain::link::Link;
use crate::layout;
use crate::ports::storage_adapter::StorageAdapter;
use crate::ports::vcs_engine::{ObjectKind, VcsEngine};

pub struct FetchUseCase {
    storage: Arc<dyn StorageAdapter>,
    vcs: Arc<dyn VcsEngine>,
}

/// Outcome of a fetch: the links applied, oldest first, and the ref
/// namespace their remote-tracking refs were fetched into.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub applied_links: Vec<Link>,
    pub ref_namespace: String,
}

impl FetchUseCase {
    pub fn new(storage: Arc<dyn StorageAdapter>, vcs: Arc<dyn VcsEngine>) -> Self {
        Self { storage, vcs }
    }

    pub async fn fetch(
        &self,
        repo_dir: &Path,
        scratch_dir: &Path,
        nickname: &RemoteNickname,
    ) -> Result<FetchOutcome, CorncobError> {
        let latest = self.download_latest_link().await?;

        // Walk backward via prev_id until a link's prereqs are already
        // present locally, or we reach the chain's first link.
        let mut chain = vec![latest];
        loop {
            let current = chain.last().expect("chain always has at least one link");
            if current.is_chain_start() || self.prereqs_present_locally(repo_dir, current).await? {
                break;
            }
            let prev = self.download_link(current.prev_id()).await?;
            chain.push(prev);
        }
        // Collected newest-first; apply oldest-missing-first (SPEC_FULL.md §4.4 step 3).
        chain.reverse();

        let ref_namespace = format!("corncob/{nickname}");
        std::fs::create_dir_all(scratch_dir)
            .map_err(|e| CorncobError::Other(format!("create scratch dir: {e}")))?;

        for link in &chain {
            for bundle_entry in link.bundles() {
                let bundle_path = layout::bundle_path(&bundle_entry.bundle_id);
                let content = self.storage.download(&bundle_path).await?;
                let tmp_path = scratch_dir.join(format!("{}.bundle", bundle_entry.bundle_id));
                std::fs::write(&tmp_path, &content.bytes)
                    .map_err(|e| CorncobError::Other(format!("write bundle: {e}")))?;

                self.vcs.verify_bundle(&tmp_path).await?;
                self.vcs
                    .fetch_from(repo_dir, &tmp_path, &ref_namespace)
                    .await?;
                let _ = std::fs::remove_file(&tmp_path);
                debug!(bundle_id = %bundle_entry.bundle_id, link_id = %link.id(), "fetch: applied bundle");
            }
        }

        info!(applied = chain.len(), ref_namespace, "fetch: complete");
        Ok(FetchOutcome {
            applied_links: chain,
            ref_namespace,
        })
    }

    async fn download_latest_link(&self) -> Result<Link, CorncobError> {
        match self.storage.download(layout::LATEST_POINTER_PATH).await {
            Ok(content) => {
                let text = String::from_utf8(content.bytes)
                    .map_err(|e| CorncobError::Other(format!("latest pointer not utf8: {e}")))?;
                Link::from_wire_yaml(&text)
                    .map_err(|e| CorncobError::Other(format!("parse latest link: {e}")))
            }
            Err(CorncobError::NotFound(_)) => Err(CorncobError::EmptyRemote),
            Err(other) => Err(other),
        }
    }

    async fn download_link(&self, id: &crate::domain::ids::LinkId) -> Result<Link, CorncobError> {
        let path = layout::link_path(id);
        let content = self.storage.download(&path).await?;
        let text = String::from_utf8(content.bytes)
            .map_err(|e| CorncobError::Other(format!("link not utf8: {e}")))?;
        Link::from_wire_yaml(&text).map_err(|e| CorncobError::Other(format!("parse link: {e}")))
    }

    /// Probes the local commit graph for every prereq commit this link's
    /// bundles need (`SPEC_FULL.md` §4.3 "Prerequisite discovery").
    async fn prereqs_present_locally(
        &self,
        repo_dir: &Path,
        link: &Link,
    ) -> Result<bool, CorncobError> {
        for bundle_entry in link.bundles() {
            for (_, prereq) in &bundle_entry.prereqs {
                if prereq.is_initial_snapshot() {
                    continue;
                }
                let kind = self.vcs.object_kind(repo_dir, prereq).await?;
                if kind == ObjectKind::Absent {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::domain::ids::BranchName;
    use crate::test_support::{FakeVcsEngine, InMemoryStorageAdapter};
    use crate::usecases::clone::CloneUseCase;
    use crate::usecases::push::PushUseCase;

    use super::*;

    #[tokio::test]
    async fn fetch_stops_the_chain_walk_at_a_known_prereq() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        vcs.commit(
            Path::new("/alice"),
            "main",
            HashMap::from([("a.txt".to_string(), b"v1".to_vec())]),
        );
        let push = PushUseCase::new(storage.clone(), vcs.clone());
        let scratch = tempfile::tempdir().unwrap();
        push.push(Path::new("/alice"), scratch.path(), &[BranchName::main()])
            .await
            .unwrap();

        let clone = CloneUseCase::new(storage.clone(), vcs.clone());
        let dest = tempfile::tempdir().unwrap();
        let dest_repo = dest.path().join("repo");
        clone.clone(&dest_repo, &BranchName::main()).await.unwrap();

        // A second push builds a link whose prereq is the commit the clone
        // already materialized locally; fetch should stop after one link.
        vcs.commit(
            Path::new("/alice"),
            "main",
            HashMap::from([("a.txt".to_string(), b"v2".to_vec())]),
        );
        push.push(Path::new("/alice"), scratch.path(), &[BranchName::main()])
            .await
            .unwrap();

        let fetch = FetchUseCase::new(storage.clone(), vcs.clone());
        let nickname = RemoteNickname::new("alice-remote").unwrap();
        let outcome = fetch
            .fetch(&dest_repo, dest.path().join("scratch").as_path(), &nickname)
            .await
            .unwrap();

        assert_eq!(outcome.applied_links.len(), 1, "walk stops at the known prereq");
        assert_eq!(outcome.ref_namespace, "corncob/alice-remote");
        let tracked = vcs.checked_out_files(&dest_repo, "corncob/alice-remote/main");
        assert_eq!(tracked.get("a.txt").unwrap(), b"v2");
    }

    #[tokio::test]
    async fn fetch_reports_empty_remote() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        let fetch = FetchUseCase::new(storage, vcs);
        let nickname = RemoteNickname::new("nobody").unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let err = fetch
            .fetch(Path::new("/wherever"), scratch.path(), &nickname)
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::EmptyRemote));
    }
}
