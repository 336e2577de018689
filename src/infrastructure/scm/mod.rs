//! Provider trait and the built-in git and svn providers

/// Version-control providers
///
/// Each provider turns the abstract operations into invocations of one
/// command-line tool and picks the output consumer that reads it back.
pub mod git_scm;
pub mod scm_factory;
pub mod scm_interface;
pub mod svn_scm;

pub use git_scm::GitScm;
pub use scm_factory::ScmFactory;
pub use scm_interface::{CommandRequest, ExitCodePolicy, ScmCommand, ScmProvider};
pub use svn_scm::SvnScm;
