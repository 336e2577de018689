//! Routing of a command to its provider and output consumer

use super::parameter_validation::validate_request;
use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::ScmFileSet;
use crate::domain::entities::scm_repository::ScmRepository;
use crate::domain::entities::scm_result::{CommandPayload, CommandResult, ScmResult};
use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::CommandParameters;
use crate::infrastructure::consumers::consume_all;
use crate::infrastructure::process::command_executor::{CommandExecutor, ProcessExecutor};
use crate::infrastructure::scm::scm_interface::{CommandRequest, ScmProvider};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs one command of one provider
///
/// Holds no per-call state: every dispatch builds its own invocation and its
/// own consumer, so one dispatcher serves concurrent calls.
#[derive(Clone)]
pub struct CommandDispatcher {
    executor: Arc<dyn ProcessExecutor>,
    environment: BTreeMap<String, String>,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new(Arc::new(CommandExecutor::new()))
    }
}

impl fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

impl CommandDispatcher {
    /// Dispatcher running tools through `executor`
    pub fn new(executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            executor,
            environment: BTreeMap::new(),
        }
    }

    /// Variables added to every invocation that does not set them itself
    pub fn with_environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment = environment;
        self
    }

    /// Validate, invoke, parse
    pub async fn dispatch(
        &self,
        provider: &dyn ScmProvider,
        kind: CommandKind,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<CommandResult> {
        let command = provider
            .command(kind)
            .ok_or_else(|| ScmError::unsupported_command(provider.id(), kind))?;

        let parameters = validate_request(kind, file_set, parameters)?;
        let request = CommandRequest::new(repository, file_set, &parameters);
        command.validate(&request)?;

        let invocation = command
            .invocation(&request)?
            .env_defaults(&self.environment);
        let consumer = command.consumer(&request)?;
        let command_line = invocation.command_line();

        info!("Running {} on {}", kind, repository);
        debug!("Executing: {}", command_line);

        let output = self.executor.execute(&invocation).await?;
        debug!(
            "'{}' exited with {} ({} lines of output)",
            command_line,
            output.exit_code,
            output.stdout.len()
        );

        if !command.exit_code_policy().is_success(output.exit_code) {
            warn!(
                "{} failed with exit code {}: {}",
                command_line,
                output.exit_code,
                output.stderr.trim()
            );
            return Ok(CommandResult {
                kind,
                result: ScmResult::failure(
                    command_line,
                    format!("The {} command failed.", kind),
                    output.stderr,
                ),
                payload: CommandPayload::Empty,
            });
        }

        let payload = consume_all(consumer, &output.stdout)?;
        Ok(CommandResult {
            kind,
            result: ScmResult::success(command_line),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::command_parameters::CommandParameter;
    use crate::domain::value_objects::scm_file_status::ScmFileStatus;
    use crate::domain::value_objects::scm_url::ScmUrl;
    use crate::infrastructure::process::command_executor::{MockProcessExecutor, ProcessOutput};
    use crate::infrastructure::scm::git_scm::GitScm;
    use crate::infrastructure::scm::svn_scm::SvnScm;
    use std::fs;
    use tempfile::TempDir;

    fn repository(provider: &dyn ScmProvider, url: &str) -> ScmRepository {
        let url = ScmUrl::parse(url).unwrap();
        let provider_repository = provider
            .make_provider_repository(url.specific_part(), url.delimiter())
            .unwrap();
        ScmRepository::new(&url, provider_repository)
    }

    #[tokio::test]
    async fn test_successful_status() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.txt"), "changed").unwrap();

        let mut executor = MockProcessExecutor::new();
        executor
            .expect_execute()
            .withf(|invocation| {
                invocation.program() == "git"
                    && invocation.arg_values().first() == Some(&"status")
                    && invocation.environment().get("LC_ALL").map(String::as_str) == Some("C")
            })
            .times(1)
            .returning(|_| Ok(ProcessOutput::from_text(0, " M a.txt\n?? gone.txt\n", "")));

        let dispatcher = CommandDispatcher::new(Arc::new(executor))
            .with_environment(BTreeMap::from([("LC_ALL".to_string(), "C".to_string())]));
        let git = GitScm::new();
        let repository = repository(&git, "scm:git:https://example.com/r.git");
        let file_set = ScmFileSet::whole(temp_dir.path());

        let result = dispatcher
            .dispatch(&git, CommandKind::Status, &repository, &file_set, &CommandParameters::new())
            .await
            .unwrap();

        assert!(result.is_success());
        let files = result.payload.into_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.txt");
        assert_eq!(files[0].status, ScmFileStatus::Modified);
    }

    #[tokio::test]
    async fn test_tool_failure_is_a_result() {
        let mut executor = MockProcessExecutor::new();
        executor
            .expect_execute()
            .returning(|_| Ok(ProcessOutput::from_text(1, "", "fatal: not a git repository\n")));

        let dispatcher = CommandDispatcher::new(Arc::new(executor));
        let git = GitScm::new();
        let repository = repository(&git, "scm:git:https://example.com/r.git");
        let file_set = ScmFileSet::whole("/work");

        let result = dispatcher
            .dispatch(&git, CommandKind::Status, &repository, &file_set, &CommandParameters::new())
            .await
            .unwrap();

        assert!(!result.is_success());
        assert_eq!(result.result.provider_message.as_deref(), Some("The status command failed."));
        assert_eq!(
            result.result.command_output.as_deref(),
            Some("fatal: not a git repository\n")
        );
        assert_eq!(result.payload, CommandPayload::Empty);
    }

    #[tokio::test]
    async fn test_validation_happens_before_spawn() {
        let mut executor = MockProcessExecutor::new();
        executor.expect_execute().never();

        let dispatcher = CommandDispatcher::new(Arc::new(executor));
        let git = GitScm::new();
        let repository = repository(&git, "scm:git:https://example.com/r.git");
        let file_set = ScmFileSet::whole("/work");

        let error = dispatcher
            .dispatch(&git, CommandKind::Tag, &repository, &file_set, &CommandParameters::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ScmError::MissingParameter { .. }));

        let error = dispatcher
            .dispatch(&git, CommandKind::Lock, &repository, &file_set, &CommandParameters::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ScmError::UnsupportedCommand { .. }));
    }

    #[tokio::test]
    async fn test_secrets_are_masked_in_results() {
        let mut executor = MockProcessExecutor::new();
        executor
            .expect_execute()
            .withf(|invocation| invocation.arg_values().contains(&"hunter2"))
            .returning(|_| Ok(ProcessOutput::from_text(0, "", "")));

        let dispatcher = CommandDispatcher::new(Arc::new(executor));
        let svn = SvnScm::new();
        let repository = repository(&svn, "scm:svn:https://svn.example.com/repo/trunk");
        let file_set = ScmFileSet::whole("/work");
        let parameters = CommandParameters::new()
            .with(CommandParameter::Username, "bob")
            .with(CommandParameter::Password, "hunter2");

        let result = dispatcher
            .dispatch(&svn, CommandKind::Login, &repository, &file_set, &parameters)
            .await
            .unwrap();
        assert!(result.is_success());
        assert!(!result.result.command_line.contains("hunter2"));
        assert!(result.result.command_line.contains("*****"));
    }

    #[tokio::test]
    async fn test_executor_errors_propagate() {
        let mut executor = MockProcessExecutor::new();
        executor
            .expect_execute()
            .returning(|invocation| Err(ScmError::tool_invocation(invocation.command_line(), "not found")));

        let dispatcher = CommandDispatcher::new(Arc::new(executor));
        let git = GitScm::new();
        let repository = repository(&git, "scm:git:https://example.com/r.git");
        let file_set = ScmFileSet::new("/work", ["a.txt"]).unwrap();

        let error = dispatcher
            .dispatch(&git, CommandKind::Add, &repository, &file_set, &CommandParameters::new())
            .await
            .unwrap_err();
        assert!(matches!(error, ScmError::ToolInvocation { .. }));
        assert!(!error.is_configuration_error());
    }
}
