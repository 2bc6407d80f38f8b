//! `LinkChainEngine`: wires the storage adapter and VCS engine into the
//! push/clone/fetch/merge use cases, wrapping the remote-facing ones in the
//! retry policy from [`crate::retry`].
//!
//! Mirrors the shape of `lnxdrive-sync/src/engine.rs`'s `SyncEngine`, which
//! is the teacher's single entry point gluing its cloud client to its
//! local cache and retry wrapper.

use std::path::Path;
use std::sync::Arc;

use corncob_core::domain::errors::CorncobError;
use corncob_core::domain::ids::{BranchName, RemoteNickname};
use corncob_core::ports::storage_adapter::StorageAdapter;
use corncob_core::ports::vcs_engine::VcsEngine;
use corncob_core::usecases::clone::CloneUseCase;
use corncob_core::usecases::fetch::{FetchOutcome, FetchUseCase};
use corncob_core::usecases::merge::MergeUseCase;
use corncob_core::usecases::push::{PushOutcome, PushUseCase};

use crate::retry::with_retry;

pub struct LinkChainEngine {
    push: PushUseCase,
    clone: CloneUseCase,
    fetch: FetchUseCase,
    merge: MergeUseCase,
}

impl LinkChainEngine {
    pub fn new(storage: Arc<dyn StorageAdapter>, vcs: Arc<dyn VcsEngine>) -> Self {
        Self {
            push: PushUseCase::new(storage.clone(), vcs.clone()),
            clone: CloneUseCase::new(storage.clone(), vcs.clone()),
            fetch: FetchUseCase::new(storage, vcs.clone()),
            merge: MergeUseCase::new(vcs),
        }
    }

    /// Publishes the current heads of `branches` as a new link, retrying
    /// transient transport failures around the whole restart-on-contention
    /// loop.
    pub async fn push(
        &self,
        repo_dir: &Path,
        scratch_dir: &Path,
        branches: &[BranchName],
    ) -> Result<PushOutcome, CorncobError> {
        with_retry("push", || self.push.push(repo_dir, scratch_dir, branches)).await
    }

    /// Bootstraps a fresh local graph from the remote's initial link.
    pub async fn clone(&self, dest_dir: &Path, branch: &BranchName) -> Result<(), CorncobError> {
        with_retry("clone", || self.clone.clone(dest_dir, branch)).await
    }

    /// Walks the remote's link chain and integrates missing bundles into
    /// private remote-tracking refs.
    pub async fn fetch(
        &self,
        repo_dir: &Path,
        scratch_dir: &Path,
        nickname: &RemoteNickname,
    ) -> Result<FetchOutcome, CorncobError> {
        with_retry("fetch", || self.fetch.fetch(repo_dir, scratch_dir, nickname)).await
    }

    /// Merges fetched remote-tracking refs into the caller's branches.
    /// Purely local VCS-engine work; not retried, since a merge conflict or
    /// engine failure is never transient.
    pub async fn merge(
        &self,
        repo_dir: &Path,
        ref_namespace: &str,
        branches: &[BranchName],
    ) -> Result<(), CorncobError> {
        self.merge.merge(repo_dir, ref_namespace, branches).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use corncob_core::test_support::{FakeVcsEngine, InMemoryStorageAdapter};
    use corncob_core::domain::ids::CommitId;

    use super::*;

    fn files(pairs: &[(&str, &str)]) -> HashMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn push_then_clone_round_trips_through_the_facade() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        vcs.commit(Path::new("/alice"), "main", files(&[("a.txt", "v1")]));

        let engine = LinkChainEngine::new(storage.clone(), vcs.clone());
        let scratch = tempfile::tempdir().unwrap();
        engine
            .push(Path::new("/alice"), scratch.path(), &[BranchName::main()])
            .await
            .unwrap();

        let dest = tempfile::tempdir().unwrap();
        let dest_repo = dest.path().join("clone");
        engine.clone(&dest_repo, &BranchName::main()).await.unwrap();
        assert_eq!(
            vcs.head_of(&dest_repo, &BranchName::main()).await.unwrap(),
            vcs.head_of(Path::new("/alice"), &BranchName::main()).await.unwrap()
        );
    }

    #[tokio::test]
    async fn fetch_then_merge_round_trips_through_the_facade() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        vcs.commit(Path::new("/alice"), "main", files(&[("a.txt", "v1")]));

        let engine = LinkChainEngine::new(storage.clone(), vcs.clone());
        let scratch = tempfile::tempdir().unwrap();
        engine
            .push(Path::new("/alice"), scratch.path(), &[BranchName::main()])
            .await
            .unwrap();

        let bob_scratch = tempfile::tempdir().unwrap();
        let dest_repo = bob_scratch.path().join("bob-repo");
        engine.clone(&dest_repo, &BranchName::main()).await.unwrap();

        vcs.commit(Path::new("/alice"), "main", files(&[("a.txt", "v2")]));
        engine
            .push(Path::new("/alice"), scratch.path(), &[BranchName::main()])
            .await
            .unwrap();

        let nickname = RemoteNickname::new("alice-remote").unwrap();
        let fetch_scratch = tempfile::tempdir().unwrap();
        let outcome = engine
            .fetch(&dest_repo, fetch_scratch.path(), &nickname)
            .await
            .unwrap();
        assert_eq!(outcome.applied_links.len(), 1);

        engine
            .merge(&dest_repo, &outcome.ref_namespace, &[BranchName::main()])
            .await
            .unwrap();
        let merged_head = vcs.head_of(&dest_repo, &BranchName::main()).await.unwrap();
        assert_ne!(merged_head, CommitId::new("v1").unwrap());
    }
}
