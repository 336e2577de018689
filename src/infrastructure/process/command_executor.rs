//! Running external tools and capturing their output

use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

/// Placeholder rendered in place of secret arguments
pub const MASK: &str = "*****";

/// A single command line argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    value: String,
    secret: bool,
}

impl Argument {
    /// Raw value passed to the process
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the value is hidden in rendered command lines
    pub fn is_secret(&self) -> bool {
        self.secret
    }
}

/// Program, arguments, working directory and environment for one tool run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: String,
    args: Vec<Argument>,
    working_directory: Option<PathBuf>,
    environment: BTreeMap<String, String>,
}

impl Invocation {
    /// Create an invocation of `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_directory: None,
            environment: BTreeMap::new(),
        }
    }

    /// Append an argument
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Argument {
            value: value.into(),
            secret: false,
        });
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self = self.arg(value);
        }
        self
    }

    /// Append an argument that is masked in rendered command lines
    pub fn secret_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Argument {
            value: value.into(),
            secret: true,
        });
        self
    }

    /// Set the working directory
    pub fn working_directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.working_directory = Some(directory.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Set environment variables that are not already set on this invocation
    pub fn env_defaults(mut self, environment: &BTreeMap<String, String>) -> Self {
        for (key, value) in environment {
            self.environment
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Program to run
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments in order
    pub fn arguments(&self) -> &[Argument] {
        &self.args
    }

    /// Raw argument values
    pub fn arg_values(&self) -> Vec<&str> {
        self.args.iter().map(Argument::value).collect()
    }

    /// Working directory, if set
    pub fn get_working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    /// Extra environment
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Command line for logs and results, secrets masked
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(
                self.args
                    .iter()
                    .map(|arg| if arg.secret { MASK } else { arg.value.as_str() }),
            )
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Everything a finished process produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code; `-1` when the process was terminated by a signal
    pub exit_code: i32,
    /// Standard output split into lines
    pub stdout: Vec<String>,
    /// Standard error as one text
    pub stderr: String,
}

impl ProcessOutput {
    /// Build an output from raw text
    pub fn from_text(exit_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            exit_code,
            stdout: stdout.lines().map(str::to_string).collect(),
            stderr: stderr.to_string(),
        }
    }
}

/// Runs an external process to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessExecutor: Send + Sync {
    /// Run the invocation and collect its output
    ///
    /// A non-zero exit code is not an error; failing to start the process or to
    /// read its output is.
    async fn execute(&self, invocation: &Invocation) -> UniscmResult<ProcessOutput>;
}

/// Default executor backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    /// Create an executor
    pub fn new() -> Self {
        Self
    }

    /// Whether `program` can be started (`<program> --version` exits successfully)
    pub async fn command_exists(program: &str) -> bool {
        Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ProcessExecutor for CommandExecutor {
    async fn execute(&self, invocation: &Invocation) -> UniscmResult<ProcessOutput> {
        let command_line = invocation.command_line();
        debug!("Executing: {}", command_line);

        let mut cmd = Command::new(invocation.program());
        cmd.args(invocation.arg_values());

        if let Some(directory) = invocation.get_working_directory() {
            cmd.current_dir(directory);
        }
        for (key, value) in invocation.environment() {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            ScmError::tool_invocation_with_source(&command_line, "failed to start process", e)
        })?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| ScmError::tool_invocation(&command_line, "stdout was not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ScmError::tool_invocation(&command_line, "stderr was not captured"))?;

        // Drain both pipes concurrently
        let mut stdout_data = Vec::new();
        let mut stderr_data = Vec::new();
        tokio::try_join!(
            stdout.read_to_end(&mut stdout_data),
            stderr.read_to_end(&mut stderr_data)
        )
        .map_err(|e| {
            ScmError::tool_invocation_with_source(&command_line, "failed to read process output", e)
        })?;

        let status = child.wait().await.map_err(|e| {
            ScmError::tool_invocation_with_source(&command_line, "failed to wait for process", e)
        })?;

        let output = ProcessOutput::from_text(
            status.code().unwrap_or(-1),
            &String::from_utf8_lossy(&stdout_data),
            &String::from_utf8_lossy(&stderr_data),
        );
        debug!(
            "'{}' exited with {} ({} stdout lines)",
            command_line,
            output.exit_code,
            output.stdout.len()
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_masks_secrets() {
        let invocation = Invocation::new("svn")
            .arg("status")
            .arg("--username")
            .arg("alice")
            .arg("--password")
            .secret_arg("hunter2");
        assert_eq!(
            invocation.command_line(),
            "svn status --username alice --password *****"
        );
        assert_eq!(
            invocation.arg_values(),
            vec!["status", "--username", "alice", "--password", "hunter2"]
        );
    }

    #[test]
    fn test_env_defaults_do_not_override() {
        let mut defaults = BTreeMap::new();
        defaults.insert("LANG".to_string(), "C".to_string());
        defaults.insert("HOME".to_string(), "/tmp".to_string());

        let invocation = Invocation::new("git")
            .env("LANG", "en_US.UTF-8")
            .env_defaults(&defaults);
        assert_eq!(invocation.environment()["LANG"], "en_US.UTF-8");
        assert_eq!(invocation.environment()["HOME"], "/tmp");
    }

    #[test]
    fn test_process_output_from_text() {
        let output = ProcessOutput::from_text(0, "a\nb\n", "");
        assert_eq!(output.stdout, vec!["a", "b"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_both_streams() {
        let invocation = Invocation::new("sh")
            .arg("-c")
            .arg("echo out1; echo err1 >&2; echo out2; exit 3");
        let output = CommandExecutor::new().execute(&invocation).await.unwrap();
        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout, vec!["out1", "out2"]);
        assert_eq!(output.stderr.trim(), "err1");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_large_stderr_does_not_block() {
        let invocation = Invocation::new("sh")
            .arg("-c")
            .arg("i=0; while [ $i -lt 20000 ]; do echo line$i >&2; i=$((i+1)); done; echo done");
        let output = CommandExecutor::new().execute(&invocation).await.unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, vec!["done"]);
        assert!(output.stderr.lines().count() == 20000);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_uses_working_directory_and_env() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let invocation = Invocation::new("sh")
            .arg("-c")
            .arg("pwd; echo $UNISCM_TEST_VALUE")
            .working_directory(temp_dir.path())
            .env("UNISCM_TEST_VALUE", "42");
        let output = CommandExecutor::new().execute(&invocation).await.unwrap();
        assert_eq!(output.stdout.len(), 2);
        assert!(output.stdout[0].ends_with(
            temp_dir.path().file_name().unwrap().to_str().unwrap()
        ));
        assert_eq!(output.stdout[1], "42");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_tool_invocation_error() {
        let invocation = Invocation::new("uniscm-definitely-missing-tool").arg("status");
        let result = CommandExecutor::new().execute(&invocation).await;
        assert!(matches!(result, Err(ScmError::ToolInvocation { .. })));
    }

    #[tokio::test]
    async fn test_command_exists() {
        assert!(!CommandExecutor::command_exists("uniscm-definitely-missing-tool").await);
    }
}
