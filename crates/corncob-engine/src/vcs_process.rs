//! Concrete `VcsEngine` that shells out to the `git` binary.
//!
//! Grounded on `original_source/src/Common/git_remote_workalike_corncob.py`'s
//! `gitCmd` helper: every operation is a `git` subcommand invoked as a child
//! process, a non-zero exit becomes `CorncobError::VcsEngineFailed`. Uses
//! `tokio::process::Command` per `SPEC_FULL.md` §5's "suspension points"
//! requirement that subprocess calls not block the executor.

use std::path::Path;
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use corncob_core::domain::errors::CorncobError;
use corncob_core::domain::ids::{BranchName, CommitId};
use corncob_core::ports::vcs_engine::{ObjectKind, VcsEngine};

pub struct ProcessVcsEngine {
    git_binary: String,
}

impl Default for ProcessVcsEngine {
    fn default() -> Self {
        Self::new("git")
    }
}

impl ProcessVcsEngine {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    async fn run(&self, cwd: Option<&Path>, args: &[&str]) -> Result<Output, CorncobError> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        debug!(git_binary = %self.git_binary, ?args, "vcs-engine: invoking git");
        cmd.output()
            .await
            .map_err(|e| CorncobError::Other(format!("failed to spawn git: {e}")))
    }

    async fn run_ok(&self, cwd: Option<&Path>, args: &[&str]) -> Result<Output, CorncobError> {
        let output = self.run(cwd, args).await?;
        if !output.status.success() {
            return Err(CorncobError::VcsEngineFailed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

fn stdout_trimmed(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

#[async_trait]
impl VcsEngine for ProcessVcsEngine {
    async fn init(&self, repo_dir: &Path, initial_branch: &BranchName) -> Result<(), CorncobError> {
        let repo_dir_str = repo_dir.to_string_lossy();
        self.run_ok(
            None,
            &["init", "-q", "-b", initial_branch.as_str(), &repo_dir_str],
        )
        .await?;
        Ok(())
    }

    async fn list_branches(&self, repo_dir: &Path) -> Result<Vec<BranchName>, CorncobError> {
        let output = self
            .run_ok(Some(repo_dir), &["branch", "--format=%(refname:short)"])
            .await?;
        stdout_trimmed(&output)
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| BranchName::new(l).map_err(|e| CorncobError::Other(e.to_string())))
            .collect()
    }

    async fn head_of(&self, repo_dir: &Path, branch: &BranchName) -> Result<CommitId, CorncobError> {
        let output = self
            .run_ok(Some(repo_dir), &["rev-parse", branch.as_str()])
            .await?;
        CommitId::new(stdout_trimmed(&output)).map_err(|e| CorncobError::Other(e.to_string()))
    }

    async fn object_kind(&self, repo_dir: &Path, object_id: &CommitId) -> Result<ObjectKind, CorncobError> {
        let output = self
            .run(Some(repo_dir), &["cat-file", "-t", object_id.as_str()])
            .await?;
        if !output.status.success() {
            return Ok(ObjectKind::Absent);
        }
        Ok(match stdout_trimmed(&output).as_str() {
            "commit" => ObjectKind::Commit,
            "tree" => ObjectKind::Tree,
            "blob" => ObjectKind::Blob,
            _ => ObjectKind::Absent,
        })
    }

    async fn create_tag(&self, repo_dir: &Path, name: &str, commit_id: &CommitId) -> Result<(), CorncobError> {
        self.run_ok(Some(repo_dir), &["tag", name, commit_id.as_str()])
            .await?;
        Ok(())
    }

    async fn delete_tag(&self, repo_dir: &Path, name: &str) -> Result<(), CorncobError> {
        self.run_ok(Some(repo_dir), &["tag", "-d", name]).await?;
        Ok(())
    }

    async fn build_bundle(
        &self,
        repo_dir: &Path,
        output_path: &Path,
        rev_range_or_ref: &str,
    ) -> Result<(), CorncobError> {
        let output_path_str = output_path.to_string_lossy();
        self.run_ok(
            Some(repo_dir),
            &["bundle", "create", &output_path_str, rev_range_or_ref],
        )
        .await?;
        Ok(())
    }

    async fn verify_bundle(&self, path: &Path) -> Result<(), CorncobError> {
        let path_str = path.to_string_lossy();
        let output = self.run(None, &["bundle", "verify", &path_str]).await?;
        if !output.status.success() {
            return Err(CorncobError::BundleInvalid(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch_from(&self, repo_dir: &Path, bundle_path: &Path, ref_namespace: &str) -> Result<(), CorncobError> {
        let bundle_path_str = bundle_path.to_string_lossy();
        let refspec = format!("+refs/heads/*:refs/{ref_namespace}/*");
        self.run_ok(Some(repo_dir), &["fetch", &bundle_path_str, &refspec])
            .await?;
        Ok(())
    }

    async fn clone_from(&self, bundle_path: &Path, dest_dir: &Path) -> Result<(), CorncobError> {
        let bundle_path_str = bundle_path.to_string_lossy();
        let dest_dir_str = dest_dir.to_string_lossy();
        self.run_ok(None, &["clone", &bundle_path_str, &dest_dir_str])
            .await?;
        Ok(())
    }

    async fn checkout(&self, repo_dir: &Path, branch: &BranchName) -> Result<(), CorncobError> {
        self.run_ok(Some(repo_dir), &["checkout", branch.as_str()])
            .await?;
        Ok(())
    }

    async fn merge(&self, repo_dir: &Path, reference: &str) -> Result<(), CorncobError> {
        self.run_ok(Some(repo_dir), &["merge", "--no-edit", reference])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[tokio::test]
    async fn init_and_head_of_round_trip_on_a_real_git_binary() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        let engine = ProcessVcsEngine::default();
        let main = BranchName::main();
        engine.init(&repo, &main).await.unwrap();

        std::fs::write(repo.join("a.txt"), b"hello").unwrap();
        let status = std::process::Command::new("git")
            .current_dir(&repo)
            .args(["add", "a.txt"])
            .status()
            .unwrap();
        assert!(status.success());
        let status = std::process::Command::new("git")
            .current_dir(&repo)
            .args([
                "-c",
                "user.email=test@example.com",
                "-c",
                "user.name=test",
                "commit",
                "-q",
                "-m",
                "initial",
            ])
            .status()
            .unwrap();
        assert!(status.success());

        let head = engine.head_of(&repo, &main).await.unwrap();
        assert!(!head.as_str().is_empty());

        let kind = engine.object_kind(&repo, &head).await.unwrap();
        assert_eq!(kind, ObjectKind::Commit);

        let missing = CommitId::new("0".repeat(40)).unwrap();
        let missing_kind = engine.object_kind(&repo, &missing).await.unwrap();
        assert_eq!(missing_kind, ObjectKind::Absent);
    }

    #[tokio::test]
    async fn failing_git_command_reports_vcs_engine_failed() {
        if !git_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("not-a-repo");
        std::fs::create_dir_all(&repo).unwrap();
        let engine = ProcessVcsEngine::default();
        let err = engine
            .head_of(&repo, &BranchName::main())
            .await
            .unwrap_err();
        assert!(matches!(err, CorncobError::VcsEngineFailed { .. }));
    }
}
