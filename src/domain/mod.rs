//! Tool resolution domain: pure data plus the resolver, which reaches the
//! outside world only through ports.

pub mod remediation;
pub mod resolver;
pub mod types;

pub use remediation::RemediationCatalog;
pub use resolver::{python_script_preconditions, ResolveContext, Resolver};
pub use types::{FailureKind, ResolvedCommand, Strategy, ToolSpec};
