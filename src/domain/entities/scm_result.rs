//! Command outcomes and their typed payloads

use crate::domain::entities::change_log::ChangeLogSet;
use crate::domain::entities::scm_file::ScmFile;
use crate::domain::value_objects::command_kind::CommandKind;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome envelope shared by every operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmResult {
    /// Rendered command line, secrets masked
    pub command_line: String,
    /// Whether the tool reported success
    pub success: bool,
    /// Short failure description
    pub provider_message: Option<String>,
    /// Tool diagnostics (stderr) on failure
    pub command_output: Option<String>,
}

impl ScmResult {
    /// Successful outcome
    pub fn success(command_line: impl Into<String>) -> Self {
        Self {
            command_line: command_line.into(),
            success: true,
            provider_message: None,
            command_output: None,
        }
    }

    /// Failed outcome with the tool's message and output
    pub fn failure(
        command_line: impl Into<String>,
        provider_message: impl Into<String>,
        command_output: impl Into<String>,
    ) -> Self {
        Self {
            command_line: command_line.into(),
            success: false,
            provider_message: Some(provider_message.into()),
            command_output: Some(command_output.into()),
        }
    }
}

/// One annotated line of a blame report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameLine {
    /// Revision that last changed the line
    pub revision: String,
    /// Author of that revision
    pub author: String,
    /// When the revision was made, if the tool reports it
    pub date: Option<DateTime<FixedOffset>>,
}

/// Parsed output of a diff
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOutput {
    /// Files with differences, in tool order
    pub changed_files: Vec<ScmFile>,
    /// Path to its diff text
    pub differences: BTreeMap<String, String>,
    /// The complete raw output
    pub patch: String,
}

/// What a consumer produced from the tool output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CommandPayload {
    /// Nothing worth keeping
    #[default]
    Empty,
    /// Per-file records
    Files(Vec<ScmFile>),
    /// Diff files and texts
    Diff(DiffOutput),
    /// Blame annotations
    Blame(Vec<BlameLine>),
    /// Change sets
    ChangeLog(ChangeLogSet),
}

impl CommandPayload {
    /// Per-file records, if the payload carries any
    pub fn into_files(self) -> Vec<ScmFile> {
        match self {
            CommandPayload::Files(files) => files,
            CommandPayload::Diff(diff) => diff.changed_files,
            CommandPayload::ChangeLog(_) | CommandPayload::Blame(_) | CommandPayload::Empty => {
                Vec::new()
            }
        }
    }

    /// Diff output; other payloads yield an empty diff
    pub fn into_diff(self) -> DiffOutput {
        match self {
            CommandPayload::Diff(diff) => diff,
            CommandPayload::Files(files) => DiffOutput {
                changed_files: files,
                ..Default::default()
            },
            _ => DiffOutput::default(),
        }
    }

    /// Blame lines; other payloads yield none
    pub fn into_blame(self) -> Vec<BlameLine> {
        match self {
            CommandPayload::Blame(lines) => lines,
            _ => Vec::new(),
        }
    }

    /// Change log; other payloads yield an empty log
    pub fn into_change_log(self) -> ChangeLogSet {
        match self {
            CommandPayload::ChangeLog(change_log) => change_log,
            _ => ChangeLogSet::default(),
        }
    }
}

/// Untyped outcome of one dispatched command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Operation that ran
    pub kind: CommandKind,
    /// Envelope
    #[serde(flatten)]
    pub result: ScmResult,
    /// Parsed output; empty on failure
    pub payload: CommandPayload,
}

impl CommandResult {
    /// Whether the tool reported success
    pub fn is_success(&self) -> bool {
        self.result.success
    }
}

macro_rules! file_list_result {
    ($(#[$meta:meta])* $name:ident, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            /// Outcome envelope
            #[serde(flatten)]
            pub result: ScmResult,
            /// Files reported by the tool
            pub $field: Vec<ScmFile>,
        }

        impl $name {
            /// Whether the tool reported success
            pub fn is_success(&self) -> bool {
                self.result.success
            }
        }

        impl From<CommandResult> for $name {
            fn from(command_result: CommandResult) -> Self {
                Self {
                    $field: command_result.payload.into_files(),
                    result: command_result.result,
                }
            }
        }
    };
}

file_list_result!(
    /// Result of an add
    AddScmResult, added_files
);
file_list_result!(
    /// Result of a remove
    RemoveScmResult, removed_files
);
file_list_result!(
    /// Result of a status check
    StatusScmResult, changed_files
);
file_list_result!(
    /// Result of creating a tag
    TagScmResult, tagged_files
);
file_list_result!(
    /// Result of creating a branch
    BranchScmResult, branched_files
);
file_list_result!(
    /// Result of a checkout
    CheckOutScmResult, checked_out_files
);
file_list_result!(
    /// Result of a commit
    CheckInScmResult, checked_in_files
);
file_list_result!(
    /// Result of an update
    UpdateScmResult, updated_files
);
file_list_result!(
    /// Result of an export
    ExportScmResult, exported_files
);
file_list_result!(
    /// Result of a listing
    ListScmResult, files
);
file_list_result!(
    /// Result of locking files
    LockScmResult, locked_files
);
file_list_result!(
    /// Result of releasing locks
    UnlockScmResult, unlocked_files
);
file_list_result!(
    /// Result of opening files for edit
    EditScmResult, edited_files
);
file_list_result!(
    /// Result of reverting opened files
    UneditScmResult, unedited_files
);
file_list_result!(
    /// Result of creating directories
    MkdirScmResult, created_dirs
);

/// Result of a diff
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffScmResult {
    /// Outcome envelope
    #[serde(flatten)]
    pub result: ScmResult,
    /// Files with differences
    pub changed_files: Vec<ScmFile>,
    /// Path to its diff text
    pub differences: BTreeMap<String, String>,
    /// The complete raw output
    pub patch: String,
}

impl DiffScmResult {
    /// Whether the tool reported success
    pub fn is_success(&self) -> bool {
        self.result.success
    }
}

impl From<CommandResult> for DiffScmResult {
    fn from(command_result: CommandResult) -> Self {
        let diff = command_result.payload.into_diff();
        Self {
            result: command_result.result,
            changed_files: diff.changed_files,
            differences: diff.differences,
            patch: diff.patch,
        }
    }
}

/// Result of a blame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlameScmResult {
    /// Outcome envelope
    #[serde(flatten)]
    pub result: ScmResult,
    /// One entry per line of the file
    pub lines: Vec<BlameLine>,
}

impl BlameScmResult {
    /// Whether the tool reported success
    pub fn is_success(&self) -> bool {
        self.result.success
    }
}

impl From<CommandResult> for BlameScmResult {
    fn from(command_result: CommandResult) -> Self {
        Self {
            lines: command_result.payload.into_blame(),
            result: command_result.result,
        }
    }
}

/// Result of a change log query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogScmResult {
    /// Outcome envelope
    #[serde(flatten)]
    pub result: ScmResult,
    /// Change sets in range
    pub change_log: ChangeLogSet,
}

impl ChangeLogScmResult {
    /// Whether the tool reported success
    pub fn is_success(&self) -> bool {
        self.result.success
    }
}

impl From<CommandResult> for ChangeLogScmResult {
    fn from(command_result: CommandResult) -> Self {
        Self {
            change_log: command_result.payload.into_change_log(),
            result: command_result.result,
        }
    }
}

/// Result of a login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginScmResult {
    /// Outcome envelope
    #[serde(flatten)]
    pub result: ScmResult,
}

impl LoginScmResult {
    /// Whether the tool reported success
    pub fn is_success(&self) -> bool {
        self.result.success
    }
}

impl From<CommandResult> for LoginScmResult {
    fn from(command_result: CommandResult) -> Self {
        Self {
            result: command_result.result,
        }
    }
}
