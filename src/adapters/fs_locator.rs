//! Filesystem + `which` implementation of the ScriptLocator port.

use crate::ports::ScriptLocator;
use std::fs;
use std::path::{Path, PathBuf};

pub struct FsScriptLocator;

impl ScriptLocator for FsScriptLocator {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn lookup(&self, name: &str) -> Option<PathBuf> {
        which::which(name).ok()
    }

    fn read_script(&self, path: &Path) -> Option<String> {
        fs::read(path)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }
}
