//! Push use case: publish a new link onto a remote's chain.
//!
//! Implements the Push operation and its state machine from
//! `SPEC_FULL.md` §4.4. Retry/backoff around transient `Transport` failures
//! is layered on top by `corncob-engine`; this use case implements only the
//! protocol-level restart-on-contention loop (an `ETagMismatch`/`AlreadyExists`
//! on the pointer write restarts from `observe`).

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::errors::CorncobError;
use crate::domain::ids::{BranchName, BundleId, CommitId, LinkId};
use crate::domain::link::{BundleEntry, Link};
use crate::layout::{self, BUNDLE_CONTENT_TYPE, YAML_CONTENT_TYPE};
use crate::ports::storage_adapter::StorageAdapter;
use crate::ports::vcs_engine::VcsEngine;

/// Upper bound on restart attempts before giving up with a `Transport` error.
/// A racing pusher losing the CAS every single time for this many rounds is
/// not expected outside of adversarial tests.
const MAX_PUSH_ATTEMPTS: u32 = 50;

/// Upper bound on id-collision retries within a single attempt (astronomically
/// unlikely per `SPEC_FULL.md` §4.4's "upload-bundle"/"upload-link" states).
const MAX_ID_COLLISION_RETRIES: u32 = 5;

pub struct PushUseCase {
    storage: Arc<dyn StorageAdapter>,
    vcs: Arc<dyn VcsEngine>,
}

/// Outcome of a successful push.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub link_id: LinkId,
    pub bundle_id: BundleId,
    pub new_latest_etag: String,
}

impl PushUseCase {
    pub fn new(storage: Arc<dyn StorageAdapter>, vcs: Arc<dyn VcsEngine>) -> Self {
        Self { storage, vcs }
    }

    /// Publishes the current heads of `branches` as a new link.
    ///
    /// `repo_dir` is the local commit graph; `scratch_dir` is the per-remote
    /// `.corncob-bundle-tmp/<nickname>/` directory used for the in-flight
    /// bundle payload (`SPEC_FULL.md` §6).
    pub async fn push(
        &self,
        repo_dir: &Path,
        scratch_dir: &Path,
        branches: &[BranchName],
    ) -> Result<PushOutcome, CorncobError> {
        for attempt in 1..=MAX_PUSH_ATTEMPTS {
            debug!(attempt, "push: observe");
            match self.try_once(repo_dir, scratch_dir, branches).await {
                Ok(outcome) => return Ok(outcome),
                // Bundle/link id collisions are absorbed inside `try_once`
                // itself; an ETagMismatch/AlreadyExists surfacing here can
                // only be the latest-pointer write losing a race.
                Err(CorncobError::ETagMismatch { .. }) | Err(CorncobError::AlreadyExists(_)) => {
                    warn!(attempt, "push: latest pointer moved under us, restarting");
                    continue;
                }
                Err(other) => return Err(other),
            }
        }
        Err(CorncobError::Other(format!(
            "push: gave up after {MAX_PUSH_ATTEMPTS} contention restarts"
        )))
    }

    async fn try_once(
        &self,
        repo_dir: &Path,
        scratch_dir: &Path,
        branches: &[BranchName],
    ) -> Result<PushOutcome, CorncobError> {
        // Step 1: observe.
        let observed = self.observe_latest().await?;

        // Step 2: prereq per branch.
        let mut prereqs = Vec::with_capacity(branches.len());
        let mut heads = Vec::with_capacity(branches.len());
        for branch in branches {
            let prereq = match &observed {
                Some((link, _)) => link
                    .head_of(branch)
                    .cloned()
                    .unwrap_or_else(CommitId::initial_snapshot),
                None => CommitId::initial_snapshot(),
            };
            let head = self.vcs.head_of(repo_dir, branch).await?;
            prereqs.push((branch.clone(), prereq));
            heads.push((branch.clone(), head));
        }

        // Step 3: build one bundle covering all pushed branches' prereq..head ranges.
        std::fs::create_dir_all(scratch_dir)
            .map_err(|e| CorncobError::Other(format!("create scratch dir: {e}")))?;
        let bundle_bytes = self
            .build_bundle_for_branches(repo_dir, scratch_dir, &prereqs, &heads)
            .await?;

        // Steps 4-6: fresh bundle_id, upload_fresh.
        let (bundle_id, bundle_etag) = self
            .upload_with_fresh_id(
                |id| layout::bundle_path(id),
                BundleId::generate,
                &bundle_bytes,
                BUNDLE_CONTENT_TYPE,
            )
            .await?;
        let _ = bundle_etag;

        // Step 4-6 continued: build and upload the link.
        let bundle_entry = BundleEntry::new(bundle_id.clone(), prereqs);
        let link_id_candidate = LinkId::generate;
        let prev_id = observed
            .as_ref()
            .map(|(link, _)| link.id().clone())
            .unwrap_or_else(LinkId::initial_snapshot);
        let is_initial = observed.is_none();

        let mut last_link_id = None;
        let mut last_link_bytes = Vec::new();
        for _ in 0..MAX_ID_COLLISION_RETRIES {
            let candidate_id = link_id_candidate();
            let link = if is_initial {
                Link::initial(candidate_id.clone(), heads.clone(), vec![bundle_entry.clone()])
            } else {
                Link::chained(
                    candidate_id.clone(),
                    prev_id.clone(),
                    heads.clone(),
                    vec![bundle_entry.clone()],
                )
            };
            let yaml = link
                .to_wire_yaml()
                .map_err(|e| CorncobError::Other(format!("serialize link: {e}")))?;
            let path = layout::link_path(&candidate_id);
            match self
                .storage
                .upload_fresh(&path, yaml.as_bytes(), YAML_CONTENT_TYPE)
                .await
            {
                Ok(_) => {
                    last_link_id = Some(candidate_id);
                    last_link_bytes = yaml.into_bytes();
                    break;
                }
                Err(CorncobError::AlreadyExists(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        let link_id = last_link_id.ok_or_else(|| {
            CorncobError::Other("exhausted link id collision retries".to_string())
        })?;

        // Step 7: commit the latest pointer.
        let new_etag = match &observed {
            Some((_, etag)) => {
                self.storage
                    .upload_if_match(
                        layout::LATEST_POINTER_PATH,
                        &last_link_bytes,
                        etag,
                        YAML_CONTENT_TYPE,
                    )
                    .await?
            }
            None => {
                self.storage
                    .upload_fresh(layout::LATEST_POINTER_PATH, &last_link_bytes, YAML_CONTENT_TYPE)
                    .await?
            }
        };

        info!(link_id = %link_id, bundle_id = %bundle_id, "push: committed");
        Ok(PushOutcome {
            link_id,
            bundle_id,
            new_latest_etag: new_etag,
        })
    }

    async fn observe_latest(&self) -> Result<Option<(Link, String)>, CorncobError> {
        match self.storage.download(layout::LATEST_POINTER_PATH).await {
            Ok(content) => {
                let text = String::from_utf8(content.bytes)
                    .map_err(|e| CorncobError::Other(format!("latest pointer not utf8: {e}")))?;
                let link = Link::from_wire_yaml(&text)
                    .map_err(|e| CorncobError::Other(format!("parse latest link: {e}")))?;
                Ok(Some((link, content.etag)))
            }
            Err(CorncobError::NotFound(_)) => Ok(None),
            Err(other) => Err(other),
        }
    }

    async fn build_bundle_for_branches(
        &self,
        repo_dir: &Path,
        scratch_dir: &Path,
        prereqs: &[(BranchName, CommitId)],
        heads: &[(BranchName, CommitId)],
    ) -> Result<Vec<u8>, CorncobError> {
        let output_path = scratch_dir.join(format!("push-{}.bundle", uuid_like_suffix()));
        let all_initial = prereqs.iter().all(|(_, c)| c.is_initial_snapshot());

        if all_initial {
            let rev_spec = heads
                .iter()
                .map(|(b, _)| b.as_str().to_string())
                .collect::<Vec<_>>()
                .join(" ");
            self.vcs
                .build_bundle(repo_dir, &output_path, &rev_spec)
                .await?;
        } else {
            let mut anchors = Vec::new();
            let result = async {
                let mut range_parts = Vec::new();
                for (branch, prereq) in prereqs {
                    if prereq.is_initial_snapshot() {
                        range_parts.push(branch.as_str().to_string());
                        continue;
                    }
                    let anchor = format!("corncob-anchor-{}-{}", branch.as_str(), prereq.as_str());
                    self.vcs.create_tag(repo_dir, &anchor, prereq).await?;
                    anchors.push(anchor.clone());
                    range_parts.push(format!("{anchor}..{}", branch.as_str()));
                }
                let rev_spec = range_parts.join(" ");
                self.vcs.build_bundle(repo_dir, &output_path, &rev_spec).await
            }
            .await;

            // The anchor is private to this operation and must be removed on
            // every exit path, success or failure.
            for anchor in &anchors {
                if let Err(e) = self.vcs.delete_tag(repo_dir, anchor).await {
                    warn!(anchor, error = %e, "push: failed to clean up anchor tag");
                }
            }
            result?;
        }

        std::fs::read(&output_path).map_err(|e| CorncobError::Other(format!("read bundle: {e}")))
    }

    /// Uploads `bytes` under a path derived from a fresh id, retrying with a
    /// new id on `AlreadyExists` (id-collision retry from §4.4's state machine).
    async fn upload_with_fresh_id<Id, PathFn, GenFn>(
        &self,
        path_fn: PathFn,
        gen_fn: GenFn,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(Id, String), CorncobError>
    where
        PathFn: Fn(&Id) -> String,
        GenFn: Fn() -> Id,
    {
        for _ in 0..MAX_ID_COLLISION_RETRIES {
            let id = gen_fn();
            let path = path_fn(&id);
            match self.storage.upload_fresh(&path, bytes, content_type).await {
                Ok(etag) => return Ok((id, etag)),
                Err(CorncobError::AlreadyExists(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(CorncobError::Other(
            "exhausted id collision retries".to_string(),
        ))
    }
}

fn uuid_like_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::test_support::{FakeVcsEngine, InMemoryStorageAdapter};

    use super::*;

    fn files(pairs: &[(&str, &str)]) -> HashMap<String, Vec<u8>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn initial_push_publishes_exactly_one_bundle_link_and_pointer() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        vcs.commit(
            Path::new("/alice"),
            "main",
            files(&[
                ("README.md", "# My Project\n"),
                ("notes.txt", "remember to buy milk\n"),
                ("plan.txt", "step 1: profit\n"),
            ]),
        );

        let push = PushUseCase::new(storage.clone(), vcs.clone());
        let scratch = tempfile::tempdir().unwrap();
        let outcome = push
            .push(
                Path::new("/alice"),
                scratch.path(),
                &[BranchName::main()],
            )
            .await
            .unwrap();

        let paths = storage.paths();
        assert_eq!(storage.object_count(), 3, "bundle + link + latest pointer: {paths:?}");
        assert!(paths.iter().any(|p| p == &format!("B-{}.bundle", outcome.bundle_id)));
        assert!(paths.iter().any(|p| p == &format!("L-{}.yaml", outcome.link_id)));
        assert!(paths.contains(&"latest-link.yaml".to_string()));

        let latest = storage.download(layout::LATEST_POINTER_PATH).await.unwrap();
        let link = Link::from_wire_yaml(&String::from_utf8(latest.bytes).unwrap()).unwrap();
        assert!(link.is_chain_start());
        assert_eq!(link.branches().len(), 1);
        assert_eq!(link.bundles().len(), 1);
        let prereq = &link.bundles()[0].prereqs[0].1;
        assert!(prereq.is_initial_snapshot());
    }

    #[tokio::test]
    async fn push_restarts_when_latest_pointer_moves_under_it() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        vcs.commit(Path::new("/alice"), "main", files(&[("a.txt", "v1")]));

        let push = PushUseCase::new(storage.clone(), vcs.clone());
        let scratch = tempfile::tempdir().unwrap();
        let first = push
            .push(Path::new("/alice"), scratch.path(), &[BranchName::main()])
            .await
            .unwrap();

        // Simulate a second publisher's push landing between this push's
        // observe and its pointer commit by overwriting the pointer with a
        // hand-built rival link under a stale etag.
        let rival = Link::chained(
            LinkId::generate(),
            first.link_id.clone(),
            vec![(BranchName::main(), CommitId::new("rival-head-000001").unwrap())],
            vec![BundleEntry::new(
                BundleId::generate(),
                vec![(BranchName::main(), CommitId::new("v1").unwrap())],
            )],
        );
        storage
            .upload_overwrite(
                layout::LATEST_POINTER_PATH,
                rival.to_wire_yaml().unwrap().as_bytes(),
                YAML_CONTENT_TYPE,
            )
            .await
            .unwrap();

        vcs.commit(Path::new("/alice"), "main", files(&[("a.txt", "v2")]));
        let second = push
            .push(Path::new("/alice"), scratch.path(), &[BranchName::main()])
            .await
            .unwrap();

        assert_ne!(second.link_id, first.link_id);
        let latest = storage.download(layout::LATEST_POINTER_PATH).await.unwrap();
        let link = Link::from_wire_yaml(&String::from_utf8(latest.bytes).unwrap()).unwrap();
        assert_eq!(link.id(), &second.link_id);
        assert_eq!(link.prev_id(), rival.id());
    }
}
