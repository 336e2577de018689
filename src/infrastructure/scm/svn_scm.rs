//! Subversion provider

use super::scm_interface::{CommandRequest, ScmCommand, ScmProvider};
use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_repository::ProviderRepository;
use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::CommandParameter;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use crate::domain::value_objects::scm_version::ScmVersion;
use crate::infrastructure::consumers::blame::{BlameConsumer, BlameFormat};
use crate::infrastructure::consumers::change_log::{SvnLogConsumer, DEFAULT_LOG_DATE_FORMAT};
use crate::infrastructure::consumers::line_patterns::{
    FileSetEchoConsumer, NullConsumer, PathListConsumer, RegexLineConsumer,
};
use crate::infrastructure::consumers::status_line::{StatusLineConsumer, StatusLineFormat};
use crate::infrastructure::consumers::unified_diff::{DiffFormat, UnifiedDiffConsumer};
use crate::infrastructure::consumers::OutputConsumer;
use crate::infrastructure::process::command_executor::{CommandExecutor, Invocation};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};

/// Provider id of the Subversion driver
pub const SVN_PROVIDER_ID: &str = "svn";

const VALID_SCHEMES: [&str; 5] = ["https://", "http://", "svn://", "svn+ssh://", "file://"];

/// Subversion driver, shelling out to the `svn` executable
#[derive(Debug, Clone)]
pub struct SvnScm {
    svn_executable: String,
}

impl Default for SvnScm {
    fn default() -> Self {
        Self {
            svn_executable: "svn".to_string(),
        }
    }
}

impl SvnScm {
    /// Driver using `svn` from `PATH`
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver using a custom executable path
    pub fn with_executable(executable: impl Into<String>) -> Self {
        Self {
            svn_executable: executable.into(),
        }
    }

    /// Executable in use
    pub fn executable(&self) -> &str {
        &self.svn_executable
    }
}

#[async_trait]
impl ScmProvider for SvnScm {
    fn id(&self) -> &str {
        SVN_PROVIDER_ID
    }

    fn metadata_dir(&self) -> Option<&str> {
        Some(".svn")
    }

    fn make_provider_repository(
        &self,
        specific_part: &str,
        _delimiter: char,
    ) -> UniscmResult<ProviderRepository> {
        let location = specific_part.trim();
        if location.is_empty() {
            return Err(ScmError::invalid_provider_repository(
                SVN_PROVIDER_ID,
                "the repository URL is empty",
            ));
        }
        if !VALID_SCHEMES.iter().any(|scheme| location.starts_with(scheme)) {
            return Err(ScmError::invalid_provider_repository(
                SVN_PROVIDER_ID,
                format!(
                    "'{}' must start with one of {}",
                    location,
                    VALID_SCHEMES.join(", ")
                ),
            ));
        }
        ProviderRepository::from_url(location).ok_or_else(|| {
            ScmError::invalid_provider_repository(
                SVN_PROVIDER_ID,
                format!("'{}' is not a valid URL", location),
            )
        })
    }

    fn command(&self, kind: CommandKind) -> Option<Box<dyn ScmCommand>> {
        match kind {
            CommandKind::Edit | CommandKind::Unedit => None,
            _ => Some(Box::new(SvnCommand {
                kind,
                executable: self.svn_executable.clone(),
            })),
        }
    }

    async fn is_available(&self) -> bool {
        CommandExecutor::command_exists(&self.svn_executable).await
    }
}

/// Repository root above `trunk`, `branches/<x>` or `tags/<x>`
fn repository_root(url: &str) -> &str {
    if let Some(index) = url.find("/branches/").or_else(|| url.find("/tags/")) {
        return &url[..index];
    }
    match url.find("/trunk") {
        Some(index) if matches!(url[index + "/trunk".len()..].chars().next(), None | Some('/')) => {
            &url[..index]
        }
        _ => url,
    }
}

/// URL of `name` under the `tags` or `branches` directory of the repository
fn sibling_url(repository_url: &str, directory: &str, name: &str) -> String {
    let root = repository_root(repository_url.trim_end_matches('/'));
    format!("{}/{}/{}", root, directory, name)
}

/// Date in svn's `{...}` revision syntax
fn revision_date(date: &DateTime<FixedOffset>) -> String {
    format!("{{{}}}", date.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%SZ"))
}

fn revision(version: &ScmVersion) -> &str {
    version.name()
}

/// One svn operation
struct SvnCommand {
    kind: CommandKind,
    executable: String,
}

impl SvnCommand {
    /// Executable plus credentials, without a working directory
    fn detached(&self, request: &CommandRequest<'_>) -> UniscmResult<Invocation> {
        let parameters = request.parameters;
        let repository = request.provider_repository();
        let username = parameters
            .optional_string(CommandParameter::Username)?
            .or(repository.user.as_deref());
        let password = parameters
            .optional_string(CommandParameter::Password)?
            .or(repository.password.as_deref());

        let mut invocation = Invocation::new(&self.executable);
        if let Some(user) = username {
            invocation = invocation.args(["--username", user]);
        }
        if let Some(password) = password {
            invocation = invocation.arg("--password").secret_arg(password);
        }
        Ok(invocation.arg("--non-interactive"))
    }

    fn base(&self, request: &CommandRequest<'_>) -> UniscmResult<Invocation> {
        Ok(self
            .detached(request)?
            .working_directory(request.file_set.base_directory()))
    }

    fn with_files(invocation: Invocation, request: &CommandRequest<'_>) -> Invocation {
        invocation.args(request.file_set.relative_paths())
    }

    fn copy_to(
        &self,
        request: &CommandRequest<'_>,
        directory: &str,
        name: &str,
        message: Option<&str>,
        pin_externals: bool,
    ) -> UniscmResult<Invocation> {
        let source = &request.provider_repository().url;
        let mut invocation = self
            .base(request)?
            .args(["copy", "--parents"])
            .arg(source)
            .arg(sibling_url(source, directory, name));
        if pin_externals {
            invocation = invocation.arg("--pin-externals");
        }
        let message = message
            .map(str::to_string)
            .unwrap_or_else(|| format!("[uniscm] {} {}", directory, name));
        Ok(invocation.args(["-m", message.as_str()]))
    }
}

impl ScmCommand for SvnCommand {
    fn kind(&self) -> CommandKind {
        self.kind
    }

    fn invocation(&self, request: &CommandRequest<'_>) -> UniscmResult<Invocation> {
        let parameters = request.parameters;
        let invocation = match self.kind {
            CommandKind::Add => {
                let mut invocation = self.base(request)?.arg("add");
                if !parameters.boolean_or(CommandParameter::Recursive, true)? {
                    invocation = invocation.arg("--depth=empty");
                }
                if parameters.boolean_or(CommandParameter::Force, false)? {
                    invocation = invocation.arg("--force");
                }
                Self::with_files(invocation, request)
            }
            CommandKind::Remove => {
                let invocation = self.base(request)?.arg("delete");
                let invocation = if parameters.boolean_or(CommandParameter::Force, false)? {
                    invocation.arg("--force")
                } else {
                    invocation
                };
                Self::with_files(invocation, request)
            }
            CommandKind::Status => Self::with_files(self.base(request)?.arg("status"), request),
            CommandKind::Diff => {
                let mut invocation = self.base(request)?.arg("diff");
                let start = parameters.optional_version(CommandParameter::StartScmVersion)?;
                let end = parameters.optional_version(CommandParameter::EndScmVersion)?;
                match (start, end) {
                    (Some(start), Some(end)) => {
                        invocation = invocation
                            .arg("-r")
                            .arg(format!("{}:{}", revision(start), revision(end)));
                    }
                    (Some(start), None) => invocation = invocation.args(["-r", revision(start)]),
                    (None, Some(end)) => {
                        invocation = invocation.arg("-r").arg(format!("BASE:{}", revision(end)));
                    }
                    (None, None) => {}
                }
                if parameters.boolean_or(CommandParameter::IgnoreWhitespace, false)? {
                    invocation = invocation.args(["-x", "-w"]);
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
                self.copy_to(request, "tags", name, message, tag_parameters.pin_externals)?
            }
            CommandKind::Branch => {
                let name = parameters.string(CommandParameter::BranchName)?;
                let branch_parameters = parameters.branch_parameters()?;
                let message = branch_parameters
                    .message
                    .as_deref()
                    .or(parameters.optional_string(CommandParameter::Message)?);
                self.copy_to(request, "branches", name, message, false)?
            }
            CommandKind::CheckOut | CommandKind::Export => {
                let target = parameters
                    .optional_path(CommandParameter::OutputDirectory)?
                    .unwrap_or(request.file_set.base_directory());
                let verb = if self.kind == CommandKind::CheckOut {
                    "checkout"
                } else {
                    "export"
                };
                let mut invocation = self.detached(request)?.arg(verb);
                if let Some(version) = parameters.optional_version(CommandParameter::ScmVersion)? {
                    invocation = invocation.args(["-r", revision(version)]);
                }
                if self.kind == CommandKind::Export
                    && parameters.boolean_or(CommandParameter::Force, false)?
                {
                    invocation = invocation.arg("--force");
                }
                invocation
                    .arg(&request.provider_repository().url)
                    .arg(target.to_string_lossy())
            }
            CommandKind::CheckIn => {
                let message = parameters.string(CommandParameter::Message)?;
                Self::with_files(self.base(request)?.args(["commit", "-m", message]), request)
            }
            CommandKind::Update => {
                let mut invocation = self.base(request)?.arg("update");
                if let Some(version) = parameters.optional_version(CommandParameter::ScmVersion)? {
                    invocation = invocation.args(["-r", revision(version)]);
                }
                Self::with_files(invocation, request)
            }
            CommandKind::List => {
                let mut invocation = self.base(request)?.arg("list");
                if parameters.boolean_or(CommandParameter::Recursive, true)? {
                    invocation = invocation.arg("-R");
                }
                if let Some(version) = parameters.optional_version(CommandParameter::ScmVersion)? {
                    invocation = invocation.args(["-r", revision(version)]);
                }
                let url = request.provider_repository().url.trim_end_matches('/');
                invocation.args(
                    request
                        .file_set
                        .relative_paths()
                        .into_iter()
                        .map(|path| format!("{}/{}", url, path)),
                )
            }
            CommandKind::Blame => {
                let file = parameters.string(CommandParameter::File)?;
                self.base(request)?.args(["blame", file])
            }
            CommandKind::ChangeLog => {
                let (start, end) = parameters.date_range(Utc::now().fixed_offset())?;
                let mut invocation = self.base(request)?.args(["log", "-v"]);
                let start_version = parameters.optional_version(CommandParameter::StartScmVersion)?;
                let end_version = parameters.optional_version(CommandParameter::EndScmVersion)?;
                let range = match (start_version, end_version, start, end) {
                    (Some(s), Some(e), _, _) => Some(format!("{}:{}", revision(s), revision(e))),
                    (Some(s), None, _, _) => Some(format!("{}:HEAD", revision(s))),
                    (None, Some(e), _, _) => Some(format!("1:{}", revision(e))),
                    (None, None, Some(s), Some(e)) => {
                        Some(format!("{}:{}", revision_date(&s), revision_date(&e)))
                    }
                    (None, None, Some(s), None) => Some(format!("{}:HEAD", revision_date(&s))),
                    (None, None, None, Some(e)) => Some(format!("1:{}", revision_date(&e))),
                    (None, None, None, None) => None,
                };
                if let Some(range) = range {
                    invocation = invocation.arg("-r").arg(range);
                }
                if let Some(limit) = parameters.optional_integer(CommandParameter::Limit)? {
                    invocation = invocation.arg("--limit").arg(limit.to_string());
                }
                Self::with_files(invocation, request)
            }
            CommandKind::Lock | CommandKind::Unlock => {
                let verb = if self.kind == CommandKind::Lock {
                    "lock"
                } else {
                    "unlock"
                };
                let mut invocation = self.base(request)?.arg(verb);
                if parameters.boolean_or(CommandParameter::Force, false)? {
                    invocation = invocation.arg("--force");
                }
                if self.kind == CommandKind::Lock {
                    if let Some(message) = parameters.optional_string(CommandParameter::Message)? {
                        invocation = invocation.args(["-m", message]);
                    }
                }
                Self::with_files(invocation, request)
            }
            CommandKind::Mkdir => {
                let mut invocation = self.base(request)?.args(["mkdir", "--parents"]);
                if let Some(message) = parameters.optional_string(CommandParameter::Message)? {
                    invocation = invocation.args(["-m", message]);
                }
                Self::with_files(invocation, request)
            }
            CommandKind::Login => self
                .detached(request)?
                .arg("info")
                .arg(&request.provider_repository().url),
            other => return Err(ScmError::unsupported_command(SVN_PROVIDER_ID, other)),
        };
        Ok(invocation)
    }

    fn consumer(&self, request: &CommandRequest<'_>) -> UniscmResult<Box<dyn OutputConsumer>> {
        let base = request.file_set.base_directory();
        let consumer: Box<dyn OutputConsumer> = match self.kind {
            CommandKind::Add | CommandKind::Remove => {
                Box::new(StatusLineConsumer::new(StatusLineFormat::svn_add(), base))
            }
            CommandKind::Status => {
                Box::new(StatusLineConsumer::new(StatusLineFormat::svn_status(), base))
            }
            CommandKind::Diff => Box::new(UnifiedDiffConsumer::new(DiffFormat::index())),
            CommandKind::Tag | CommandKind::Branch => Box::new(FileSetEchoConsumer::new(
                request.file_set,
                ScmFileStatus::Tagged,
            )),
            CommandKind::CheckOut | CommandKind::Export => {
                let status = if self.kind == CommandKind::CheckOut {
                    ScmFileStatus::CheckedOut
                } else {
                    ScmFileStatus::Updated
                };
                Box::new(StatusLineConsumer::without_existence_check(
                    StatusLineFormat::svn_update().code("A", status),
                ))
            }
            CommandKind::CheckIn => Box::new(RegexLineConsumer::new(
                r"^(?:Sending|Adding|Deleting|Replacing)(?: \(bin\))?\s+(?P<path>.+)$",
                ScmFileStatus::CheckedIn,
            )?),
            CommandKind::Update => {
                Box::new(StatusLineConsumer::new(StatusLineFormat::svn_update(), base))
            }
            CommandKind::List => Box::new(
                PathListConsumer::new(ScmFileStatus::CheckedIn).skip_directories(),
            ),
            CommandKind::Blame => Box::new(BlameConsumer::new(BlameFormat::svn()?)),
            CommandKind::ChangeLog => {
                let (start, end) = request.parameters.date_range(Utc::now().fixed_offset())?;
                Box::new(SvnLogConsumer::new(start, end, DEFAULT_LOG_DATE_FORMAT))
            }
            CommandKind::Lock => Box::new(RegexLineConsumer::new(
                r"^'(?P<path>.+)' locked by user",
                ScmFileStatus::CheckedOut,
            )?),
            CommandKind::Unlock => Box::new(RegexLineConsumer::new(
                r"^'(?P<path>.+)' unlocked",
                ScmFileStatus::CheckedIn,
            )?),
            CommandKind::Mkdir => Box::new(RegexLineConsumer::new(
                r"^A\s+(?P<path>.+)$",
                ScmFileStatus::Added,
            )?),
            _ => Box::new(NullConsumer),
        };
        Ok(consumer)
    }
}
