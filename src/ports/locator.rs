//! Script locator port (trait).
//! Filesystem and `$PATH` questions the resolver asks about script files.

use std::path::{Path, PathBuf};

pub trait ScriptLocator {
    /// Whether `path` names an existing regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// System-wide lookup of an executable by name.
    fn lookup(&self, name: &str) -> Option<PathBuf>;

    /// Script contents, lossily decoded. `None` if unreadable.
    fn read_script(&self, path: &Path) -> Option<String>;
}
