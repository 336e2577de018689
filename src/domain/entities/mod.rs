//! Domain entities

pub mod change_log;
pub mod scm_file;
pub mod scm_repository;
pub mod scm_result;

pub use change_log::{ChangeFile, ChangeLogSet, ChangeSet};
pub use scm_file::{ScmFile, ScmFileSet};
pub use scm_repository::{ProviderRepository, ScmRepository};
pub use scm_result::*;
