//! Operations the facade knows about

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Abstract SCM operation a provider may implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Schedule files for addition
    Add,
    /// Schedule files for removal
    Remove,
    /// Report working copy changes
    Status,
    /// Produce unified differences
    Diff,
    /// Create a tag
    Tag,
    /// Create a branch
    Branch,
    /// Fetch a working copy
    CheckOut,
    /// Commit changes
    CheckIn,
    /// Bring a working copy up to date
    Update,
    /// Fetch an unversioned copy
    Export,
    /// List repository files
    List,
    /// Annotate lines with their last revision
    Blame,
    /// Report change sets over a range
    ChangeLog,
    /// Lock files
    Lock,
    /// Release file locks
    Unlock,
    /// Open files for editing
    Edit,
    /// Revert files opened for editing
    Unedit,
    /// Authenticate against the repository
    Login,
    /// Create directories
    Mkdir,
}

impl CommandKind {
    /// Every operation, in declaration order
    pub const ALL: [CommandKind; 19] = [
        CommandKind::Add,
        CommandKind::Remove,
        CommandKind::Status,
        CommandKind::Diff,
        CommandKind::Tag,
        CommandKind::Branch,
        CommandKind::CheckOut,
        CommandKind::CheckIn,
        CommandKind::Update,
        CommandKind::Export,
        CommandKind::List,
        CommandKind::Blame,
        CommandKind::ChangeLog,
        CommandKind::Lock,
        CommandKind::Unlock,
        CommandKind::Edit,
        CommandKind::Unedit,
        CommandKind::Login,
        CommandKind::Mkdir,
    ];

    /// Stable lowercase name of the operation
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Add => "add",
            CommandKind::Remove => "remove",
            CommandKind::Status => "status",
            CommandKind::Diff => "diff",
            CommandKind::Tag => "tag",
            CommandKind::Branch => "branch",
            CommandKind::CheckOut => "checkout",
            CommandKind::CheckIn => "checkin",
            CommandKind::Update => "update",
            CommandKind::Export => "export",
            CommandKind::List => "list",
            CommandKind::Blame => "blame",
            CommandKind::ChangeLog => "changelog",
            CommandKind::Lock => "lock",
            CommandKind::Unlock => "unlock",
            CommandKind::Edit => "edit",
            CommandKind::Unedit => "unedit",
            CommandKind::Login => "login",
            CommandKind::Mkdir => "mkdir",
        }
    }

    /// Whether the operation changes repository or working copy state
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            CommandKind::Status
                | CommandKind::Diff
                | CommandKind::List
                | CommandKind::Blame
                | CommandKind::ChangeLog
                | CommandKind::Login
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = CommandKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase();
        CommandKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| CommandKindError::UnknownCommand(s.to_string()))
    }
}

/// Errors that can occur when parsing a command name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKindError {
    /// The name matches no known operation
    UnknownCommand(String),
}

impl fmt::Display for CommandKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandKindError::UnknownCommand(name) => write!(f, "Unknown SCM command: '{}'", name),
        }
    }
}

impl std::error::Error for CommandKindError {}
