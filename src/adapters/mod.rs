pub mod fs_locator;
pub mod git2_adapter;
pub mod system_process;

pub use fs_locator::FsScriptLocator;
pub use git2_adapter::Git2Repo;
pub use system_process::SystemProcessRunner;
