//! Git repository port (trait).
//! Defines the interface for git operations without coupling to any implementation.

use anyhow::Result;
use std::path::PathBuf;

/// Port for git repository operations.
/// Implementations may use git2, shell commands, or test fakes.
pub trait GitRepo {
    /// Working directory of the repository. Relative paths resolve against it.
    fn workdir(&self) -> Result<PathBuf>;

    /// Get the current branch name (short hash when detached).
    fn current_branch(&self) -> Result<String>;

    /// Detect the most likely base branch (main, master, develop).
    fn detect_base_branch(&self) -> Result<String>;

    /// Find the merge-base commit between HEAD and the given base branch.
    fn merge_base(&self, base: &str) -> Result<String>;

    /// Unified diff from the merge-base to the working tree, zero context
    /// lines, limited to `paths`. Empty `paths` means the whole tree.
    fn diff_since(&self, merge_base_hash: &str, paths: &[String]) -> Result<String>;
}
