//! The provider contract and the command requests providers build

use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::ScmFileSet;
use crate::domain::entities::scm_repository::{ProviderRepository, ScmRepository};
use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::CommandParameters;
use crate::infrastructure::consumers::OutputConsumer;
use crate::infrastructure::process::command_executor::Invocation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which process exit codes count as success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCodePolicy {
    /// Only `0`
    ZeroOnly,
    /// Any of the listed codes
    Accept(Vec<i32>),
    /// Every exit code; the output alone decides
    Always,
}

impl ExitCodePolicy {
    /// Whether `exit_code` is a success under this policy
    pub fn is_success(&self, exit_code: i32) -> bool {
        match self {
            ExitCodePolicy::ZeroOnly => exit_code == 0,
            ExitCodePolicy::Accept(codes) => codes.contains(&exit_code),
            ExitCodePolicy::Always => true,
        }
    }
}

impl Default for ExitCodePolicy {
    fn default() -> Self {
        ExitCodePolicy::ZeroOnly
    }
}

/// Everything a command needs to build its invocation
#[derive(Debug, Clone, Copy)]
pub struct CommandRequest<'a> {
    /// Target repository
    pub repository: &'a ScmRepository,
    /// Working copy and files
    pub file_set: &'a ScmFileSet,
    /// Named inputs
    pub parameters: &'a CommandParameters,
}

impl<'a> CommandRequest<'a> {
    /// Bundle the three inputs
    pub fn new(
        repository: &'a ScmRepository,
        file_set: &'a ScmFileSet,
        parameters: &'a CommandParameters,
    ) -> Self {
        Self {
            repository,
            file_set,
            parameters,
        }
    }

    /// Provider-specific descriptor of the repository
    pub fn provider_repository(&self) -> &'a ProviderRepository {
        self.repository.provider_repository()
    }
}

/// One operation as implemented by one provider
pub trait ScmCommand: Send + Sync {
    /// Operation implemented
    fn kind(&self) -> CommandKind;

    /// Provider-specific checks run after the shared parameter validation
    fn validate(&self, _request: &CommandRequest<'_>) -> UniscmResult<()> {
        Ok(())
    }

    /// Program, arguments, working directory and environment
    fn invocation(&self, request: &CommandRequest<'_>) -> UniscmResult<Invocation>;

    /// Exit codes that count as success
    fn exit_code_policy(&self) -> ExitCodePolicy {
        ExitCodePolicy::ZeroOnly
    }

    /// A fresh consumer for one invocation
    fn consumer(&self, request: &CommandRequest<'_>) -> UniscmResult<Box<dyn OutputConsumer>>;
}

/// Driver for one version-control backend
#[async_trait]
pub trait ScmProvider: Send + Sync {
    /// Id used in `scm:<id>:...` URLs
    fn id(&self) -> &str;

    /// Metadata directory marking a working copy, if the backend has one
    fn metadata_dir(&self) -> Option<&str> {
        None
    }

    /// Parse the provider-specific part of a repository URL
    fn make_provider_repository(
        &self,
        specific_part: &str,
        delimiter: char,
    ) -> UniscmResult<ProviderRepository>;

    /// Problems with the provider-specific part; empty when it is valid
    fn validate_specific_part(&self, specific_part: &str, delimiter: char) -> Vec<String> {
        match self.make_provider_repository(specific_part, delimiter) {
            Ok(_) => Vec::new(),
            Err(e) => vec![e.to_string()],
        }
    }

    /// Implementation of `kind`, if the backend supports it
    fn command(&self, kind: CommandKind) -> Option<Box<dyn ScmCommand>>;

    /// Every operation with an implementation
    fn supported_commands(&self) -> Vec<CommandKind> {
        CommandKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.command(*kind).is_some())
            .collect()
    }

    /// Whether the backend tool can be run on this machine
    async fn is_available(&self) -> bool {
        true
    }
}
