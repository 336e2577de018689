//! Infrastructure layer modules
//!
//! This layer provides concrete implementations for external system interactions:
//! - Process execution (tool invocations, output capture)
//! - Output consumers (parsing tool output into canonical results)
//! - SCM providers (git, svn)
//! - File system access (settings files)

pub mod consumers;
pub mod filesystem;
pub mod process;
pub mod scm;

// Re-export commonly used types
pub use consumers::OutputConsumer;
pub use filesystem::{Settings, SettingsStore};
pub use process::{CommandExecutor, Invocation, ProcessExecutor, ProcessOutput};
pub use scm::{
    CommandRequest, ExitCodePolicy, GitScm, ScmCommand, ScmFactory, ScmProvider, SvnScm,
};
