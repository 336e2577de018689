//! Git provider

use super::scm_interface::{CommandRequest, ExitCodePolicy, ScmCommand, ScmProvider};
use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_repository::ProviderRepository;
use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::CommandParameter;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use crate::domain::value_objects::scm_version::ScmVersion;
use crate::infrastructure::consumers::blame::{BlameConsumer, BlameFormat, GIT_BLAME_DATE_FORMAT};
use crate::infrastructure::consumers::change_log::{GitLogConsumer, DEFAULT_LOG_DATE_FORMAT};
use crate::infrastructure::consumers::line_patterns::{
    FileSetEchoConsumer, NullConsumer, PathListConsumer, RegexLineConsumer,
};
use crate::infrastructure::consumers::status_line::{StatusLineConsumer, StatusLineFormat};
use crate::infrastructure::consumers::unified_diff::{DiffFormat, UnifiedDiffConsumer};
use crate::infrastructure::consumers::OutputConsumer;
use crate::infrastructure::process::command_executor::{CommandExecutor, Invocation};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Provider id of the git driver
pub const GIT_PROVIDER_ID: &str = "git";

fn scp_like() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<user>[^@/]+)@(?P<host>[^:/]+):(?P<path>.+)$")
            .unwrap_or_else(|e| panic!("invalid scp pattern: {}", e))
    })
}

/// Git driver, shelling out to the `git` executable
#[derive(Debug, Clone)]
pub struct GitScm {
    executable: String,
    log_date_format: String,
}

impl Default for GitScm {
    fn default() -> Self {
        Self {
            executable: "git".to_string(),
            log_date_format: DEFAULT_LOG_DATE_FORMAT.to_string(),
        }
    }
}

impl GitScm {
    /// Driver using `git` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver using a custom executable path
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Self::default()
        }
    }

    /// Date format requested from `git log` and used to read it back
    pub fn with_log_date_format(mut self, format: impl Into<String>) -> Self {
        self.log_date_format = format.into();
        self
    }

    /// Executable in use
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// Whether `url` uses a scheme git understands
    pub fn is_valid_url_scheme(url: &str) -> bool {
        url.starts_with("https://")
            || url.starts_with("http://")
            || url.starts_with("git://")
            || url.starts_with("ssh://")
            || url.starts_with("git@")
            || url.starts_with("file://")
    }
}

#[async_trait]
impl ScmProvider for GitScm {
    fn id(&self) -> &str {
        GIT_PROVIDER_ID
    }

    fn metadata_dir(&self) -> Option<&str> {
        Some(".git")
    }

    fn make_provider_repository(
        &self,
        specific_part: &str,
        _delimiter: char,
    ) -> UniscmResult<ProviderRepository> {
        let location = specific_part.trim();
        if location.is_empty() {
            return Err(ScmError::invalid_provider_repository(
                GIT_PROVIDER_ID,
                "the repository location is empty",
            ));
        }

        if let Some(captures) = scp_like().captures(location) {
            let mut repository = ProviderRepository::new(location).with_user(&captures["user"]);
            repository.protocol = Some("ssh".to_string());
            repository.host = Some(captures["host"].to_string());
            repository.path = Some(captures["path"].to_string());
            return Ok(repository);
        }

        if Self::is_valid_url_scheme(location) {
            return ProviderRepository::from_url(location).ok_or_else(|| {
                ScmError::invalid_provider_repository(
                    GIT_PROVIDER_ID,
                    format!("'{}' is not a valid URL", location),
                )
            });
        }

        if location.contains("://") {
            return Err(ScmError::invalid_provider_repository(
                GIT_PROVIDER_ID,
                format!("unsupported URL scheme in '{}'", location),
            ));
        }

        // Anything else is a path to a local repository
        let mut repository = ProviderRepository::new(location);
        repository.protocol = Some("file".to_string());
        repository.path = Some(location.to_string());
        Ok(repository)
    }

    fn command(&self, kind: CommandKind) -> Option<Box<dyn ScmCommand>> {
        match kind {
            CommandKind::Add
            | CommandKind::Remove
            | CommandKind::Status
            | CommandKind::Diff
            | CommandKind::Tag
            | CommandKind::Branch
            | CommandKind::CheckOut
            | CommandKind::CheckIn
            | CommandKind::Update
            | CommandKind::List
            | CommandKind::Blame
            | CommandKind::ChangeLog => Some(Box::new(GitCommand {
                kind,
                executable: self.executable.clone(),
                log_date_format: self.log_date_format.clone(),
            })),
            CommandKind::Export
            | CommandKind::Lock
            | CommandKind::Unlock
            | CommandKind::Edit
            | CommandKind::Unedit
            | CommandKind::Login
            | CommandKind::Mkdir => None,
        }
    }

    async fn is_available(&self) -> bool {
        CommandExecutor::command_exists(&self.executable).await
    }
}

/// One git operation
struct GitCommand {
    kind: CommandKind,
    executable: String,
    log_date_format: String,
}

impl GitCommand {
    fn base(&self, request: &CommandRequest<'_>) -> Invocation {
        Invocation::new(&self.executable)
            .working_directory(request.file_set.base_directory())
            .env("GIT_TERMINAL_PROMPT", "0")
    }

    fn with_files(invocation: Invocation, request: &CommandRequest<'_>) -> Invocation {
        invocation.arg("--").args(request.file_set.relative_paths())
    }

    fn revision(version: &ScmVersion) -> String {
        version.name().to_string()
    }
}

impl ScmCommand for GitCommand {
    fn kind(&self) -> CommandKind {
        self.kind
    }

    fn invocation(&self, request: &CommandRequest<'_>) -> UniscmResult<Invocation> {
        let parameters = request.parameters;
        let invocation = match self.kind {
            CommandKind::Add => Self::with_files(self.base(request).args(["add", "-v"]), request),
            CommandKind::Remove => {
                Self::with_files(self.base(request).args(["rm", "-r"]), request)
            }
            CommandKind::Status => Self::with_files(
                self.base(request)
                    .args(["status", "--porcelain", "--untracked-files=all"]),
                request,
            ),
            CommandKind::Diff => {
                let mut invocation = self.base(request).args(["diff", "--no-color"]);
                if parameters.boolean_or(CommandParameter::IgnoreWhitespace, false)? {
                    invocation = invocation.arg("-w");
                }
                if let Some(start) = parameters.optional_version(CommandParameter::StartScmVersion)? {
                    invocation = invocation.arg(Self::revision(start));
                }
                if let Some(end) = parameters.optional_version(CommandParameter::EndScmVersion)? {
                    invocation = invocation.arg(Self::revision(end));
                }
                Self::with_files(invocation, request)
            }
            CommandKind::Tag => {
                let name = parameters.string(CommandParameter::TagName)?;
                let tag_parameters = parameters.tag_parameters()?;
                let message = tag_parameters
                    .message
                    .as_deref()
                    .or(parameters.optional_string(CommandParameter::Message)?);
                let mut invocation = self.base(request).arg("tag");
                if let Some(sign) = parameters.optional_string(CommandParameter::SignOption)? {
                    invocation = invocation.arg(sign);
                }
                match message {
                    Some(message) => invocation.args(["-a", name, "-m", message]),
                    None => invocation.arg(name),
                }
            }
            CommandKind::Branch => {
                let name = parameters.string(CommandParameter::BranchName)?;
                let mut invocation = self.base(request).args(["branch", name]);
                if let Some(start) = parameters.optional_version(CommandParameter::ScmVersion)? {
                    invocation = invocation.arg(Self::revision(start));
                }
                invocation
            }
            CommandKind::CheckOut => {
                let target = parameters
                    .optional_path(CommandParameter::OutputDirectory)?
                    .unwrap_or(request.file_set.base_directory());
                let mut invocation = Invocation::new(&self.executable)
                    .env("GIT_TERMINAL_PROMPT", "0")
                    .arg("clone");
                match parameters.optional_version(CommandParameter::ScmVersion)? {
                    Some(ScmVersion::Branch(name)) | Some(ScmVersion::Tag(name)) => {
                        invocation = invocation.args(["--branch", name.as_str()]);
                    }
                    Some(ScmVersion::Revision(_)) | None => {}
                }
                invocation
                    .arg(&request.provider_repository().url)
                    .arg(target.to_string_lossy())
            }
            CommandKind::CheckIn => {
                let message = parameters.string(CommandParameter::Message)?;
                let invocation = self.base(request).args(["commit", "-m", message]);
                if request.file_set.is_empty() {
                    invocation.arg("-a")
                } else {
                    Self::with_files(invocation, request)
                }
            }
            CommandKind::Update => {
                let invocation = self.base(request).args(["pull", "--ff-only"]);
                match parameters.optional_version(CommandParameter::ScmVersion)? {
                    Some(ScmVersion::Branch(name)) => invocation.args(["origin", name.as_str()]),
                    _ => invocation,
                }
            }
            CommandKind::List => {
                let invocation = match parameters.optional_version(CommandParameter::ScmVersion)? {
                    Some(version) => self
                        .base(request)
                        .args(["ls-tree", "-r", "--name-only"])
                        .arg(Self::revision(version)),
                    None => self.base(request).arg("ls-files"),
                };
                Self::with_files(invocation, request)
            }
            CommandKind::Blame => {
                let file = parameters.string(CommandParameter::File)?;
                self.base(request)
                    .args(["blame", "-c"])
                    .arg(format!("--date=format:{}", GIT_BLAME_DATE_FORMAT))
                    .args(["--", file])
            }
            CommandKind::ChangeLog => {
                let (start, end) = parameters.date_range(Utc::now().fixed_offset())?;
                let mut invocation = self
                    .base(request)
                    .args(["log", "--name-status"])
                    .arg(format!("--date=format:{}", self.log_date_format));
                if let Some(start) = start {
                    invocation =
                        invocation.arg(format!("--since={}", start.to_rfc3339_opts(SecondsFormat::Secs, false)));
                }
                if let Some(end) = end {
                    invocation =
                        invocation.arg(format!("--until={}", end.to_rfc3339_opts(SecondsFormat::Secs, false)));
                }
                if let Some(limit) = parameters.optional_integer(CommandParameter::Limit)? {
                    invocation = invocation.arg(format!("--max-count={}", limit));
                }
                let start_version = parameters.optional_version(CommandParameter::StartScmVersion)?;
                let end_version = parameters.optional_version(CommandParameter::EndScmVersion)?;
                match (start_version, end_version) {
                    (Some(start), Some(end)) => {
                        invocation = invocation.arg(format!("{}..{}", start.name(), end.name()));
                    }
                    (Some(start), None) => {
                        invocation = invocation.arg(format!("{}..HEAD", start.name()));
                    }
                    (None, Some(end)) => invocation = invocation.arg(end.name()),
                    (None, None) => {}
                }
                Self::with_files(invocation, request)
            }
            other => {
                return Err(ScmError::unsupported_command(GIT_PROVIDER_ID, other));
            }
        };
        Ok(invocation)
    }

    fn exit_code_policy(&self) -> ExitCodePolicy {
        match self.kind {
            CommandKind::Diff => ExitCodePolicy::Accept(vec![0, 1]),
            _ => ExitCodePolicy::ZeroOnly,
        }
    }

    fn consumer(&self, request: &CommandRequest<'_>) -> UniscmResult<Box<dyn OutputConsumer>> {
        let base = request.file_set.base_directory();
        let consumer: Box<dyn OutputConsumer> = match self.kind {
            CommandKind::Add => Box::new(RegexLineConsumer::new(
                r"^add '(?P<path>.+)'$",
                ScmFileStatus::Added,
            )?),
            CommandKind::Remove => Box::new(RegexLineConsumer::new(
                r"^rm '(?P<path>.+)'$",
                ScmFileStatus::Deleted,
            )?),
            CommandKind::Status => Box::new(StatusLineConsumer::new(
                StatusLineFormat::git_porcelain(),
                base,
            )),
            CommandKind::Diff => Box::new(UnifiedDiffConsumer::new(DiffFormat::git())),
            CommandKind::Tag | CommandKind::Branch => Box::new(FileSetEchoConsumer::new(
                request.file_set,
                ScmFileStatus::Tagged,
            )),
            CommandKind::CheckIn => Box::new(FileSetEchoConsumer::new(
                request.file_set,
                ScmFileStatus::CheckedIn,
            )),
            CommandKind::List => Box::new(PathListConsumer::new(ScmFileStatus::CheckedIn)),
            CommandKind::Blame => Box::new(BlameConsumer::new(BlameFormat::git()?)),
            CommandKind::ChangeLog => {
                let (start, end) = request.parameters.date_range(Utc::now().fixed_offset())?;
                Box::new(GitLogConsumer::new(start, end, self.log_date_format.clone()))
            }
            _ => Box::new(NullConsumer),
        };
        Ok(consumer)
    }
}
