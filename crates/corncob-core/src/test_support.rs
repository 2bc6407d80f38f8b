//! In-memory fakes for the storage adapter and VCS-engine ports, used by this
//! crate's own use-case tests and shared (via `pub` visibility, `cfg(test)`
//! only) with `corncob-engine`'s integration tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use crate::domain::errors::CorncobError;
use crate::domain::ids::{BranchName, CommitId};
use crate::ports::storage_adapter::{ObjectContent, StorageAdapter};
use crate::ports::vcs_engine::{ObjectKind, VcsEngine};

/// A single zone's worth of (path -> (bytes, etag)) state, guarded the way a
/// real adapter would guard an in-process cache (`SPEC_FULL.md` §9).
#[derive(Default)]
pub struct InMemoryStorageAdapter {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
}

fn content_etag(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

impl InMemoryStorageAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl StorageAdapter for InMemoryStorageAdapter {
    async fn download(&self, path: &str) -> Result<ObjectContent, CorncobError> {
        let objects = self.objects.lock().unwrap();
        objects
            .get(path)
            .map(|(bytes, etag)| ObjectContent {
                bytes: bytes.clone(),
                etag: etag.clone(),
            })
            .ok_or_else(|| CorncobError::NotFound(path.to_string()))
    }

    async fn upload_overwrite(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        let etag = content_etag(bytes);
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), (bytes.to_vec(), etag.clone()));
        Ok(etag)
    }

    async fn upload_fresh(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(CorncobError::AlreadyExists(path.to_string()));
        }
        let etag = content_etag(bytes);
        objects.insert(path.to_string(), (bytes.to_vec(), etag.clone()));
        Ok(etag)
    }

    async fn upload_if_match(
        &self,
        path: &str,
        bytes: &[u8],
        etag: &str,
        _content_type: &str,
    ) -> Result<String, CorncobError> {
        let mut objects = self.objects.lock().unwrap();
        match objects.get(path) {
            Some((_, current_etag)) if current_etag == etag => {
                let new_etag = content_etag(bytes);
                objects.insert(path.to_string(), (bytes.to_vec(), new_etag.clone()));
                Ok(new_etag)
            }
            Some(_) => Err(CorncobError::ETagMismatch {
                path: path.to_string(),
                expected: etag.to_string(),
            }),
            None => Err(CorncobError::NotFound(path.to_string())),
        }
    }
}

/// A fake VCS engine backed by an in-memory DAG of commits keyed by id, with
/// linear history per branch. Good enough to exercise the chain-walk and
/// bundle build/apply contract without shelling out to a real tool.
pub struct FakeVcsEngine {
    repos: Mutex<HashMap<PathBuf, FakeRepo>>,
}

#[derive(Default, Clone)]
struct FakeRepo {
    /// commit id -> (parent id or None, files snapshot)
    commits: HashMap<String, (Option<String>, HashMap<String, Vec<u8>>)>,
    branches: HashMap<String, String>,
    tags: HashMap<String, String>,
}

#[derive(Clone)]
struct FakeBundle {
    /// commits carried by this bundle, in dependency order
    commits: Vec<(String, Option<String>, HashMap<String, Vec<u8>>)>,
    branch_heads: Vec<(String, String)>,
}

impl FakeVcsEngine {
    pub fn new() -> Self {
        Self {
            repos: Mutex::new(HashMap::new()),
        }
    }

    /// Test helper: commit a full file snapshot on `branch`, returning the new commit id.
    pub fn commit(&self, repo_dir: &Path, branch: &str, files: HashMap<String, Vec<u8>>) -> String {
        let mut repos = self.repos.lock().unwrap();
        let repo = repos.entry(repo_dir.to_path_buf()).or_default();
        let parent = repo.branches.get(branch).cloned();
        let id = content_etag(format!("{:?}{:?}", parent, files).as_bytes())[..16].to_string();
        repo.commits.insert(id.clone(), (parent, files));
        repo.branches.insert(branch.to_string(), id.clone());
        id
    }

    /// Test helper: read the materialized file snapshot at a branch's head.
    pub fn checked_out_files(&self, repo_dir: &Path, branch: &str) -> HashMap<String, Vec<u8>> {
        let repos = self.repos.lock().unwrap();
        let repo = repos.get(repo_dir).expect("repo exists");
        let head = repo.branches.get(branch).expect("branch exists");
        repo.commits.get(head).unwrap().1.clone()
    }

    fn write_bundle(&self, output_path: &Path, bundle: &FakeBundle) -> Result<(), CorncobError> {
        let encoded = serde_json::to_vec(&(
            bundle
                .commits
                .iter()
                .map(|(id, parent, files)| {
                    (
                        id.clone(),
                        parent.clone(),
                        files
                            .iter()
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect::<Vec<_>>(),
                    )
                })
                .collect::<Vec<_>>(),
            bundle.branch_heads.clone(),
        ))
        .map_err(|e| CorncobError::Other(format!("encode fake bundle: {e}")))?;
        std::fs::write(output_path, encoded)
            .map_err(|e| CorncobError::Other(format!("write fake bundle: {e}")))
    }

    fn read_bundle(path: &Path) -> Result<FakeBundle, CorncobError> {
        let bytes = std::fs::read(path)
            .map_err(|e| CorncobError::BundleInvalid(format!("unreadable: {e}")))?;
        let (commits, branch_heads): (
            Vec<(String, Option<String>, Vec<(String, Vec<u8>)>)>,
            Vec<(String, String)>,
        ) = serde_json::from_slice(&bytes)
            .map_err(|e| CorncobError::BundleInvalid(format!("corrupt: {e}")))?;
        Ok(FakeBundle {
            commits: commits
                .into_iter()
                .map(|(id, parent, files)| (id, parent, files.into_iter().collect()))
                .collect(),
            branch_heads,
        })
    }
}

#[async_trait::async_trait]
impl VcsEngine for FakeVcsEngine {
    async fn init(&self, repo_dir: &Path, initial_branch: &BranchName) -> Result<(), CorncobError> {
        let mut repos = self.repos.lock().unwrap();
        repos.entry(repo_dir.to_path_buf()).or_insert_with(|| {
            let mut repo = FakeRepo::default();
            repo.branches.insert(initial_branch.as_str().to_string(), String::new());
            repo
        });
        Ok(())
    }

    async fn list_branches(&self, repo_dir: &Path) -> Result<Vec<BranchName>, CorncobError> {
        let repos = self.repos.lock().unwrap();
        let repo = repos.get(repo_dir).cloned().unwrap_or_default();
        Ok(repo
            .branches
            .keys()
            .map(|b| BranchName::new(b.clone()).unwrap())
            .collect())
    }

    async fn head_of(&self, repo_dir: &Path, branch: &BranchName) -> Result<CommitId, CorncobError> {
        let repos = self.repos.lock().unwrap();
        let repo = repos
            .get(repo_dir)
            .ok_or_else(|| CorncobError::Other("no such repo".to_string()))?;
        let head = repo.branches.get(branch.as_str()).cloned().unwrap_or_default();
        if head.is_empty() {
            Ok(CommitId::initial_snapshot())
        } else {
            CommitId::new(head).map_err(|e| CorncobError::Other(e.to_string()))
        }
    }

    async fn object_kind(&self, repo_dir: &Path, object_id: &CommitId) -> Result<ObjectKind, CorncobError> {
        if object_id.is_initial_snapshot() {
            return Ok(ObjectKind::Absent);
        }
        let repos = self.repos.lock().unwrap();
        let repo = repos.get(repo_dir).cloned().unwrap_or_default();
        if repo.commits.contains_key(object_id.as_str()) {
            Ok(ObjectKind::Commit)
        } else {
            Ok(ObjectKind::Absent)
        }
    }

    async fn create_tag(&self, repo_dir: &Path, name: &str, commit_id: &CommitId) -> Result<(), CorncobError> {
        let mut repos = self.repos.lock().unwrap();
        let repo = repos.entry(repo_dir.to_path_buf()).or_default();
        repo.tags.insert(name.to_string(), commit_id.as_str().to_string());
        Ok(())
    }

    async fn delete_tag(&self, repo_dir: &Path, name: &str) -> Result<(), CorncobError> {
        let mut repos = self.repos.lock().unwrap();
        if let Some(repo) = repos.get_mut(repo_dir) {
            repo.tags.remove(name);
        }
        Ok(())
    }

    async fn build_bundle(
        &self,
        repo_dir: &Path,
        output_path: &Path,
        rev_range_or_ref: &str,
    ) -> Result<(), CorncobError> {
        let repos = self.repos.lock().unwrap();
        let repo = repos
            .get(repo_dir)
            .ok_or_else(|| CorncobError::Other("no such repo".to_string()))?
            .clone();
        drop(repos);

        let mut commits = Vec::new();
        let mut seen = std::collections::HashSet::new();
        let mut branch_heads = Vec::new();

        for part in rev_range_or_ref.split_whitespace() {
            let (from_tag, branch) = match part.split_once("..") {
                Some((tag, branch)) => (Some(tag.to_string()), branch.to_string()),
                None => (None, part.to_string()),
            };
            let stop_at = from_tag.and_then(|t| repo.tags.get(&t).cloned());
            let head = repo
                .branches
                .get(&branch)
                .cloned()
                .filter(|h| !h.is_empty())
                .ok_or_else(|| CorncobError::Other(format!("unknown branch {branch}")))?;
            branch_heads.push((branch, head.clone()));

            let mut cursor = Some(head);
            let mut chain = Vec::new();
            while let Some(id) = cursor {
                if Some(&id) == stop_at.as_ref() {
                    break;
                }
                let (parent, files) = repo
                    .commits
                    .get(&id)
                    .ok_or_else(|| CorncobError::Other(format!("missing commit {id}")))?
                    .clone();
                chain.push((id.clone(), parent.clone(), files));
                cursor = parent;
            }
            chain.reverse();
            for entry in chain {
                if seen.insert(entry.0.clone()) {
                    commits.push(entry);
                }
            }
        }

        self.write_bundle(output_path, &FakeBundle { commits, branch_heads })
    }

    async fn verify_bundle(&self, path: &Path) -> Result<(), CorncobError> {
        Self::read_bundle(path).map(|_| ())
    }

    async fn fetch_from(&self, repo_dir: &Path, bundle_path: &Path, ref_namespace: &str) -> Result<(), CorncobError> {
        let bundle = Self::read_bundle(bundle_path)?;
        let mut repos = self.repos.lock().unwrap();
        let repo = repos.entry(repo_dir.to_path_buf()).or_default();
        for (id, parent, files) in bundle.commits {
            repo.commits.insert(id, (parent, files));
        }
        for (branch, head) in bundle.branch_heads {
            repo.branches.insert(format!("{ref_namespace}/{branch}"), head);
        }
        Ok(())
    }

    async fn clone_from(&self, bundle_path: &Path, dest_dir: &Path) -> Result<(), CorncobError> {
        let bundle = Self::read_bundle(bundle_path)?;
        let mut repos = self.repos.lock().unwrap();
        let repo = repos.entry(dest_dir.to_path_buf()).or_default();
        for (id, parent, files) in bundle.commits {
            repo.commits.insert(id, (parent, files));
        }
        for (branch, head) in bundle.branch_heads {
            repo.branches.insert(branch, head);
        }
        Ok(())
    }

    async fn checkout(&self, _repo_dir: &Path, _branch: &BranchName) -> Result<(), CorncobError> {
        Ok(())
    }

    async fn merge(&self, repo_dir: &Path, reference: &str) -> Result<(), CorncobError> {
        let mut repos = self.repos.lock().unwrap();
        let repo = repos
            .get_mut(repo_dir)
            .ok_or_else(|| CorncobError::Other("no such repo".to_string()))?;
        let source_head = repo
            .branches
            .get(reference)
            .cloned()
            .ok_or_else(|| CorncobError::Other(format!("unknown ref {reference}")))?;
        // Fast-forward: the merged-into branch is whatever checkout last set;
        // tests call merge per-branch so we fast-forward `main` here.
        repo.branches.insert("main".to_string(), source_head);
        Ok(())
    }
}
