pub mod git;
pub mod locator;
pub mod process;

#[cfg(test)]
pub mod fakes;

pub use git::GitRepo;
pub use locator::ScriptLocator;
pub use process::{CapturedOutput, ProbeError, ProbeStatus, ProcessRunner};
