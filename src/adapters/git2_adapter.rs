//! Git2 implementation of the GitRepo port.

use crate::ports::GitRepo;
use anyhow::{anyhow, Context, Result};
use git2::{DiffFormat, DiffOptions, Repository};
use std::path::{Path, PathBuf};

pub struct Git2Repo {
    repo: Repository,
}

impl Git2Repo {
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path).context("Failed to open git repository")?;
        Ok(Self { repo })
    }

    pub fn open_current_dir() -> Result<Self> {
        Self::open(Path::new("."))
    }

    fn branch_exists(&self, name: &str) -> bool {
        // Check local branch
        if self.repo.find_branch(name, git2::BranchType::Local).is_ok() {
            return true;
        }
        // Check remote tracking branch
        self.repo
            .find_reference(&format!("refs/remotes/origin/{}", name))
            .is_ok()
    }

    fn resolve_to_commit(&self, refspec: &str) -> Result<git2::Oid> {
        // Try as branch first
        if let Ok(branch) = self.repo.find_branch(refspec, git2::BranchType::Local) {
            if let Some(target) = branch.get().target() {
                return Ok(target);
            }
        }

        // Try as remote branch
        let remote_ref = format!("refs/remotes/origin/{}", refspec);
        if let Ok(reference) = self.repo.find_reference(&remote_ref) {
            if let Some(target) = reference.target() {
                return Ok(target);
            }
        }

        // Try as commit hash or other refspec
        let obj = self
            .repo
            .revparse_single(refspec)
            .with_context(|| format!("Failed to resolve '{}'", refspec))?;
        Ok(obj.peel_to_commit()?.id())
    }
}

impl GitRepo for Git2Repo {
    fn workdir(&self) -> Result<PathBuf> {
        self.repo
            .workdir()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("Repository has no working directory (bare repo?)"))
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repo.head().context("Failed to get HEAD")?;
        if head.is_branch() {
            head.shorthand()
                .map(String::from)
                .ok_or_else(|| anyhow!("Branch name is not valid UTF-8"))
        } else {
            // Detached HEAD - return short hash
            let oid = head.target().ok_or_else(|| anyhow!("HEAD has no target"))?;
            Ok(format!("{:.7}", oid))
        }
    }

    fn detect_base_branch(&self) -> Result<String> {
        // Common base branch names in order of preference
        let candidates = ["main", "master", "develop", "dev"];

        for candidate in candidates {
            if self.branch_exists(candidate) {
                return Ok(candidate.to_string());
            }
        }

        Err(anyhow!(
            "Could not detect base branch. Tried: {}",
            candidates.join(", ")
        ))
    }

    fn merge_base(&self, base: &str) -> Result<String> {
        let head = self.repo.head()?.target().ok_or_else(|| anyhow!("No HEAD"))?;
        let base_oid = self.resolve_to_commit(base)?;

        let merge_base = self
            .repo
            .merge_base(head, base_oid)
            .with_context(|| format!("Failed to find merge-base between HEAD and {}", base))?;

        Ok(merge_base.to_string())
    }

    fn diff_since(&self, merge_base_hash: &str, paths: &[String]) -> Result<String> {
        let merge_base_oid = git2::Oid::from_str(merge_base_hash)?;
        let merge_base_tree = self.repo.find_commit(merge_base_oid)?.tree()?;

        let mut opts = DiffOptions::new();
        opts.context_lines(0);
        for path in paths {
            opts.pathspec(path);
        }

        // Same as `git diff <merge-base>`: committed, staged and unstaged changes.
        let diff = self
            .repo
            .diff_tree_to_workdir_with_index(Some(&merge_base_tree), Some(&mut opts))
            .context("Failed to diff against merge-base")?;

        render_patch(&diff)
    }
}

/// Render a git2 diff as unified patch text, as `git diff` prints it.
fn render_patch(diff: &git2::Diff) -> Result<String> {
    let mut out = Vec::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if let origin @ ('+' | '-' | ' ') = line.origin() {
            out.push(origin as u8);
        }
        out.extend_from_slice(line.content());
        true
    })?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}
