//! Command line arguments and their translation into facade calls

pub mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::exit;

use crate::application::services::scm_manager::ScmManager;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::ScmFileSet;
use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::{
    CommandParameter, CommandParameters, ParameterValue, TagParameters,
};
use crate::domain::value_objects::scm_version::ScmVersion;
use crate::infrastructure::filesystem::settings_store::SettingsStore;

pub use output::OutputFormat;

/// uniscm - one command line for many version-control tools
#[derive(Parser)]
#[command(name = "uniscm")]
#[command(about = "Run version-control operations against scm:<provider>:<location> URLs")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    " for ",
    env!("BUILD_TARGET"),
    ")"
))]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Settings file (YAML)
    #[arg(long, global = true, env = "UNISCM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format (text, json, yaml)
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Operation to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Repository URL, working copy and files
#[derive(Args, Debug, Clone)]
pub struct FileArgs {
    /// Repository URL, e.g. scm:git:https://example.com/project.git
    pub url: String,

    /// Working copy directory
    #[arg(short = 'd', long, default_value = ".")]
    pub directory: PathBuf,

    /// Files relative to the working copy (all files when omitted)
    pub files: Vec<PathBuf>,

    /// Select files under the working copy by glob (repeatable)
    #[arg(long = "include", value_name = "GLOB", conflicts_with = "files")]
    pub includes: Vec<String>,

    /// Leave out files matching this glob (repeatable)
    #[arg(long = "exclude", value_name = "GLOB", conflicts_with = "files")]
    pub excludes: Vec<String>,
}

impl FileArgs {
    /// File set named by explicit paths or, when globs are given, by a directory scan
    pub fn file_set(&self) -> UniscmResult<ScmFileSet> {
        if self.includes.is_empty() && self.excludes.is_empty() {
            return ScmFileSet::new(&self.directory, &self.files);
        }
        let includes: Vec<&str> = self.includes.iter().map(String::as_str).collect();
        let excludes: Vec<&str> = self.excludes.iter().map(String::as_str).collect();
        ScmFileSet::from_patterns(&self.directory, &includes, &excludes)
    }
}

/// Repository URL and working copy
#[derive(Args, Debug, Clone)]
pub struct WorkingCopyArgs {
    /// Repository URL
    pub url: String,

    /// Working copy directory
    #[arg(short = 'd', long, default_value = ".")]
    pub directory: PathBuf,
}

/// Subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Check a repository URL and print what is wrong with it
    Validate {
        /// Repository URL
        url: String,
    },

    /// List registered providers and whether their tools are installed
    Providers {
        /// Working copy to check for provider metadata
        #[arg(short = 'd', long, default_value = ".")]
        directory: PathBuf,
    },

    /// Show working copy changes
    Status(FileArgs),

    /// Schedule files for addition
    Add(FileArgs),

    /// Schedule files for removal
    Remove {
        /// Repository, working copy and files
        #[command(flatten)]
        target: FileArgs,

        /// Removal message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show differences
    Diff {
        /// Repository, working copy and files
        #[command(flatten)]
        target: FileArgs,

        /// Start revision
        #[arg(long)]
        start: Option<String>,

        /// End revision
        #[arg(long)]
        end: Option<String>,

        /// Ignore whitespace changes
        #[arg(short = 'w', long)]
        ignore_whitespace: bool,
    },

    /// List versioned files
    List(FileArgs),

    /// Lock files
    Lock {
        /// Repository, working copy and files
        #[command(flatten)]
        target: FileArgs,

        /// Lock comment
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Unlock files
    Unlock(FileArgs),

    /// Open files for editing
    Edit(FileArgs),

    /// Revert files opened for editing
    Unedit(FileArgs),

    /// Create directories in the repository
    Mkdir {
        /// Repository, working copy and files
        #[command(flatten)]
        target: FileArgs,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Commit changes
    Checkin {
        /// Repository, working copy and files
        #[command(flatten)]
        target: FileArgs,

        /// Commit message
        #[arg(short, long)]
        message: String,
    },

    /// Create a tag
    Tag {
        /// Repository and working copy
        #[command(flatten)]
        target: WorkingCopyArgs,

        /// Tag name
        name: String,

        /// Tag message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Create a branch
    Branch {
        /// Repository and working copy
        #[command(flatten)]
        target: WorkingCopyArgs,

        /// Branch name
        name: String,

        /// Branch message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Create a working copy
    Checkout {
        /// Repository and working copy
        #[command(flatten)]
        target: WorkingCopyArgs,

        /// Branch to check out
        #[arg(short, long, conflicts_with = "revision")]
        branch: Option<String>,

        /// Revision to check out
        #[arg(short, long)]
        revision: Option<String>,
    },

    /// Write an unversioned copy
    Export {
        /// Repository and working copy
        #[command(flatten)]
        target: WorkingCopyArgs,

        /// Revision to export
        #[arg(short, long)]
        revision: Option<String>,
    },

    /// Bring the working copy up to date
    Update(WorkingCopyArgs),

    /// Show per-line authorship of a file
    Blame {
        /// Repository and working copy
        #[command(flatten)]
        target: WorkingCopyArgs,

        /// File relative to the working copy
        file: PathBuf,
    },

    /// Show history grouped into change sets
    Changelog {
        /// Repository, working copy and files
        #[command(flatten)]
        target: FileArgs,

        /// Show changes since date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        since: Option<String>,

        /// Show changes until date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        until: Option<String>,

        /// Show changes of the last N days
        #[arg(long, conflicts_with = "since")]
        days: Option<i64>,

        /// Maximum number of change sets
        #[arg(short = 'n', long)]
        limit: Option<i64>,
    },

    /// Check credentials against the repository
    Login {
        /// Repository and working copy
        #[command(flatten)]
        target: WorkingCopyArgs,

        /// User name
        #[arg(short, long)]
        username: Option<String>,

        /// Password
        #[arg(short, long, env = "UNISCM_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

/// Parse `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp
pub fn parse_date(text: &str) -> Result<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date);
    }
    let day = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}': expected YYYY-MM-DD or RFC 3339", text))?;
    let midnight = day
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid date '{}'", text))?;
    Ok(midnight.and_utc().fixed_offset())
}

/// What one subcommand asks the manager to run
struct Request {
    kind: CommandKind,
    url: String,
    file_set: ScmFileSet,
    parameters: CommandParameters,
}

impl Request {
    fn files(kind: CommandKind, target: &FileArgs) -> Result<Self> {
        Ok(Self {
            kind,
            url: target.url.clone(),
            file_set: target.file_set()?,
            parameters: CommandParameters::new(),
        })
    }

    fn working_copy(kind: CommandKind, target: &WorkingCopyArgs) -> Self {
        Self {
            kind,
            url: target.url.clone(),
            file_set: ScmFileSet::whole(&target.directory),
            parameters: CommandParameters::new(),
        }
    }

    fn with(mut self, key: CommandParameter, value: impl Into<ParameterValue>) -> Self {
        self.parameters.set(key, value);
        self
    }

    fn with_optional<V>(mut self, key: CommandParameter, value: Option<V>) -> Self
    where
        V: Into<ParameterValue>,
    {
        if let Some(value) = value {
            self.parameters.set(key, value);
        }
        self
    }
}

/// CLI application runner
pub struct CliApp {
    cli: Cli,
}

impl Default for CliApp {
    fn default() -> Self {
        Self::new()
    }
}

impl CliApp {
    /// Parse the process arguments
    pub fn new() -> Self {
        Self { cli: Cli::parse() }
    }

    /// Application for already-parsed arguments
    pub fn from_cli(cli: Cli) -> Self {
        Self { cli }
    }

    /// Whether `--verbose` was given
    pub fn verbose(&self) -> bool {
        self.cli.verbose
    }

    /// Run the selected subcommand and exit with 1 on failure
    pub async fn run(self) -> Result<()> {
        if self.cli.no_color {
            colored::control::set_override(false);
        }

        match self.handle_command().await {
            Ok(true) => Ok(()),
            Ok(false) => exit(1),
            Err(e) => {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
                exit(1);
            }
        }
    }

    async fn manager(&self) -> Result<ScmManager> {
        let settings = SettingsStore::new()
            .load_or_default(self.cli.config.as_ref())
            .await?;
        Ok(ScmManager::from_settings(&settings))
    }

    /// Returns whether the operation succeeded
    async fn handle_command(&self) -> Result<bool> {
        let request = match &self.cli.command {
            Commands::Validate { url } => return self.handle_validate(url).await,
            Commands::Providers { directory } => return self.handle_providers(directory).await,
            Commands::Status(target) => Request::files(CommandKind::Status, target)?,
            Commands::Add(target) => Request::files(CommandKind::Add, target)?,
            Commands::Remove { target, message } => Request::files(CommandKind::Remove, target)?
                .with_optional(CommandParameter::Message, message.clone()),
            Commands::Diff {
                target,
                start,
                end,
                ignore_whitespace,
            } => Request::files(CommandKind::Diff, target)?
                .with_optional(
                    CommandParameter::StartScmVersion,
                    start.clone().map(ScmVersion::Revision),
                )
                .with_optional(
                    CommandParameter::EndScmVersion,
                    end.clone().map(ScmVersion::Revision),
                )
                .with(CommandParameter::IgnoreWhitespace, *ignore_whitespace),
            Commands::List(target) => Request::files(CommandKind::List, target)?,
            Commands::Lock { target, message } => Request::files(CommandKind::Lock, target)?
                .with_optional(CommandParameter::Message, message.clone()),
            Commands::Unlock(target) => Request::files(CommandKind::Unlock, target)?,
            Commands::Edit(target) => Request::files(CommandKind::Edit, target)?,
            Commands::Unedit(target) => Request::files(CommandKind::Unedit, target)?,
            Commands::Mkdir { target, message } => Request::files(CommandKind::Mkdir, target)?
                .with_optional(CommandParameter::Message, message.clone()),
            Commands::Checkin { target, message } => {
                Request::files(CommandKind::CheckIn, target)?
                    .with(CommandParameter::Message, message.as_str())
            }
            Commands::Tag {
                target,
                name,
                message,
            } => {
                let tag_parameters = TagParameters {
                    message: message.clone(),
                    ..TagParameters::default()
                };
                Request::working_copy(CommandKind::Tag, target)
                    .with(CommandParameter::TagName, name.as_str())
                    .with(CommandParameter::ScmTagParameters, tag_parameters)
            }
            Commands::Branch {
                target,
                name,
                message,
            } => Request::working_copy(CommandKind::Branch, target)
                .with(CommandParameter::BranchName, name.as_str())
                .with_optional(CommandParameter::Message, message.clone()),
            Commands::Checkout {
                target,
                branch,
                revision,
            } => {
                let version = branch
                    .clone()
                    .map(ScmVersion::Branch)
                    .or_else(|| revision.clone().map(ScmVersion::Revision));
                Request::working_copy(CommandKind::CheckOut, target)
                    .with_optional(CommandParameter::ScmVersion, version)
            }
            Commands::Export { target, revision } => {
                Request::working_copy(CommandKind::Export, target).with_optional(
                    CommandParameter::ScmVersion,
                    revision.clone().map(ScmVersion::Revision),
                )
            }
            Commands::Update(target) => Request::working_copy(CommandKind::Update, target),
            Commands::Blame { target, file } => {
                let mut request = Request::working_copy(CommandKind::Blame, target);
                request.file_set = ScmFileSet::new(&target.directory, [file])?;
                request
            }
            Commands::Changelog {
                target,
                since,
                until,
                days,
                limit,
            } => Request::files(CommandKind::ChangeLog, target)?
                .with_optional(
                    CommandParameter::StartDate,
                    since.as_deref().map(parse_date).transpose()?,
                )
                .with_optional(
                    CommandParameter::EndDate,
                    until.as_deref().map(parse_date).transpose()?,
                )
                .with_optional(CommandParameter::NumDays, *days)
                .with_optional(CommandParameter::Limit, *limit),
            Commands::Login {
                target,
                username,
                password,
            } => Request::working_copy(CommandKind::Login, target)
                .with_optional(CommandParameter::Username, username.clone())
                .with_optional(CommandParameter::Password, password.clone()),
        };

        self.execute(request).await
    }

    async fn execute(&self, request: Request) -> Result<bool> {
        let manager = self.manager().await?;
        let repository = manager.make_scm_repository(&request.url)?;
        let result = manager
            .execute(
                request.kind,
                &repository,
                &request.file_set,
                &request.parameters,
            )
            .await?;

        let rendered = output::render(&result, self.cli.output)?;
        if result.is_success() {
            print!("{}", rendered);
        } else if self.cli.output == OutputFormat::Text {
            eprint!("{}", rendered);
        } else {
            print!("{}", rendered);
        }
        Ok(result.is_success())
    }

    async fn handle_validate(&self, url: &str) -> Result<bool> {
        let manager = self.manager().await?;
        let problems = manager.validate_scm_repository(url);

        match self.cli.output {
            OutputFormat::Text => {
                if problems.is_empty() {
                    println!("{} {} is valid", "✓".green().bold(), url);
                } else {
                    println!("{} {} is invalid", "✗".red().bold(), url);
                    for problem in &problems {
                        println!("  {}", problem.red());
                    }
                }
            }
            format => {
                let report = serde_json::json!({
                    "url": url,
                    "valid": problems.is_empty(),
                    "problems": problems,
                });
                println!("{}", output::render_structured(&report, format)?);
            }
        }
        Ok(problems.is_empty())
    }

    async fn handle_providers(&self, directory: &Path) -> Result<bool> {
        let manager = self.manager().await?;
        let available = manager.available_providers().await;
        let managing = manager.detect_provider(directory);
        let providers: Vec<_> = manager
            .registry()
            .providers()
            .into_iter()
            .map(|provider| {
                let supported: Vec<String> = provider
                    .supported_commands()
                    .iter()
                    .map(|kind| kind.to_string())
                    .collect();
                (
                    provider.id().to_string(),
                    available.iter().any(|id| id == provider.id()),
                    managing.as_deref() == Some(provider.id()),
                    supported,
                )
            })
            .collect();

        match self.cli.output {
            OutputFormat::Text => {
                for (id, installed, manages, supported) in &providers {
                    let state = if *installed {
                        "installed".green()
                    } else {
                        "not installed".yellow()
                    };
                    if *manages {
                        println!("{} ({}, manages {})", id.bold(), state, directory.display());
                    } else {
                        println!("{} ({})", id.bold(), state);
                    }
                    println!("  {}", supported.join(", "));
                }
            }
            format => {
                let report: Vec<_> = providers
                    .iter()
                    .map(|(id, installed, manages, supported)| {
                        serde_json::json!({
                            "id": id,
                            "installed": installed,
                            "manages_working_copy": manages,
                            "commands": supported,
                        })
                    })
                    .collect();
                println!("{}", output::render_structured(&report, format)?);
            }
        }
        Ok(true)
    }
}
