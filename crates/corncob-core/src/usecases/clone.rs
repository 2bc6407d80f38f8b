//! Clone use case: bootstrap a fresh local graph from a remote's initial link.
//!
//! Implements the Clone operation from `SPEC_FULL.md` §4.4.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::domain::errors::CorncobError;
use crate::domain::ids::BranchName;
use crate::domain::link::Link;
use crate::layout;
use crate::ports::storage_adapter::StorageAdapter;
use crate::ports::vcs_engine::VcsEngine;

pub struct CloneUseCase {
    storage: Arc<dyn StorageAdapter>,
    vcs: Arc<dyn VcsEngine>,
}

impl CloneUseCase {
    pub fn new(storage: Arc<dyn StorageAdapter>, vcs: Arc<dyn VcsEngine>) -> Self {
        Self { storage, vcs }
    }

    /// Clones the remote's initial state into `dest_dir`, checking out `branch`.
    ///
    /// # Errors
    /// `CorncobError::Other` if `dest_dir` already holds a local graph (step 1),
    /// `CorncobError::EmptyRemote` if the remote has no latest pointer yet,
    /// `CorncobError::NonInitialClone` if the remote's history is past its
    /// first link (the caller must `fetch` against an existing clone instead).
    pub async fn clone(&self, dest_dir: &Path, branch: &BranchName) -> Result<(), CorncobError> {
        if dest_dir.exists() && dest_dir.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
            return Err(CorncobError::Other(format!(
                "{} already holds a local graph",
                dest_dir.display()
            )));
        }

        let content = match self.storage.download(layout::LATEST_POINTER_PATH).await {
            Ok(content) => content,
            Err(CorncobError::NotFound(_)) => return Err(CorncobError::EmptyRemote),
            Err(other) => return Err(other),
        };
        let text = String::from_utf8(content.bytes)
            .map_err(|e| CorncobError::Other(format!("latest pointer not utf8: {e}")))?;
        let link = Link::from_wire_yaml(&text)
            .map_err(|e| CorncobError::Other(format!("parse latest link: {e}")))?;

        if !link.is_chain_start() || link.bundles().len() != 1 {
            return Err(CorncobError::NonInitialClone);
        }

        let bundle_entry = &link.bundles()[0];
        let bundle_path = layout::bundle_path(&bundle_entry.bundle_id);
        let bundle = self.storage.download(&bundle_path).await?;

        std::fs::create_dir_all(dest_dir)
            .map_err(|e| CorncobError::Other(format!("create dest dir: {e}")))?;
        let tmp_bundle_path = dest_dir.join(".corncob-clone.bundle");
        std::fs::write(&tmp_bundle_path, &bundle.bytes)
            .map_err(|e| CorncobError::Other(format!("write bundle: {e}")))?;

        self.vcs.clone_from(&tmp_bundle_path, dest_dir).await?;
        self.vcs.checkout(dest_dir, branch).await?;
        let _ = std::fs::remove_file(&tmp_bundle_path);

        info!(link_id = %link.id(), "clone: initialized local graph");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::test_support::{FakeVcsEngine, InMemoryStorageAdapter};
    use crate::usecases::push::PushUseCase;

    use super::*;

    #[tokio::test]
    async fn clone_materializes_the_remote_initial_snapshot() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        vcs.commit(
            Path::new("/alice"),
            "main",
            HashMap::from([("README.md".to_string(), b"hello\n".to_vec())]),
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

        let files = vcs.checked_out_files(&dest_repo, "main");
        assert_eq!(files.get("README.md").unwrap(), b"hello\n");
    }

    #[tokio::test]
    async fn clone_refuses_a_non_empty_destination() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        let clone = CloneUseCase::new(storage, vcs);
        let dest = tempfile::tempdir().unwrap();
        std::fs::write(dest.path().join("existing.txt"), b"already here").unwrap();

        let err = clone.clone(dest.path(), &BranchName::main()).await.unwrap_err();
        assert!(matches!(err, CorncobError::Other(_)));
    }

    #[tokio::test]
    async fn clone_reports_empty_remote() {
        let storage = Arc::new(InMemoryStorageAdapter::new());
        let vcs = Arc::new(FakeVcsEngine::new());
        let clone = CloneUseCase::new(storage, vcs);
        let dest = tempfile::tempdir().unwrap();
        let dest_repo = dest.path().join("repo");

        let err = clone.clone(&dest_repo, &BranchName::main()).await.unwrap_err();
        assert!(matches!(err, CorncobError::EmptyRemote));
    }
}
