//! Immutable values

pub mod command_kind;
pub mod command_parameters;
pub mod scm_file_status;
pub mod scm_url;
pub mod scm_version;

pub use command_kind::CommandKind;
pub use command_parameters::{BranchParameters, CommandParameter, CommandParameters, ParameterValue, TagParameters};
pub use scm_file_status::ScmFileStatus;
pub use scm_url::{ScmUrl, ScmUrlError};
pub use scm_version::ScmVersion;
