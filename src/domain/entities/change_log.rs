//! Change sets and change logs

use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A file touched by a change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFile {
    /// Repository-relative path
    pub path: String,
    /// Revision of the file in this change, when the tool reports one
    pub revision: Option<String>,
    /// What happened to the file
    pub status: ScmFileStatus,
}

impl ChangeFile {
    /// Create a change file without a per-file revision
    pub fn new(path: impl Into<String>, status: ScmFileStatus) -> Self {
        Self {
            path: path.into(),
            revision: None,
            status,
        }
    }

    /// Set the per-file revision
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }
}

/// One group of changes (a revision, a commit, a task)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Revision, commit id or task id; absent for implicit groups
    pub key: Option<String>,
    /// Author of the change
    pub author: Option<String>,
    /// When the change was made
    pub date: Option<DateTime<FixedOffset>>,
    /// Commit message, lines joined with `\n`
    pub comment: String,
    /// Files touched
    pub files: Vec<ChangeFile>,
}

impl ChangeSet {
    /// Create a change set keyed by revision or commit id
    pub fn keyed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Append a comment line
    pub fn push_comment_line(&mut self, line: &str) {
        if !self.comment.is_empty() {
            self.comment.push('\n');
        }
        self.comment.push_str(line);
    }
}

/// Change sets over a requested range
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogSet {
    /// Lower bound of the requested range
    pub start_date: Option<DateTime<FixedOffset>>,
    /// Upper bound of the requested range
    pub end_date: Option<DateTime<FixedOffset>>,
    /// Change sets in tool order
    pub change_sets: Vec<ChangeSet>,
}

impl ChangeLogSet {
    /// Whether no change set was reported
    pub fn is_empty(&self) -> bool {
        self.change_sets.is_empty()
    }

    /// Number of change sets
    pub fn len(&self) -> usize {
        self.change_sets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_lines_are_joined() {
        let mut change_set = ChangeSet::keyed("r12");
        change_set.push_comment_line("Fix build");
        change_set.push_comment_line("");
        change_set.push_comment_line("Details");
        assert_eq!(change_set.comment, "Fix build\n\nDetails");
        assert_eq!(change_set.key.as_deref(), Some("r12"));
    }
}
