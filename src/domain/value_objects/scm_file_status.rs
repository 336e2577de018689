//! Canonical file statuses

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of an operation for a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScmFileStatus {
    /// Scheduled for addition or newly added
    Added,
    /// Locally or remotely modified
    Modified,
    /// Removed
    Deleted,
    /// Not under version control
    Unknown,
    /// Local and incoming changes collide
    Conflict,
    /// Committed to the repository
    CheckedIn,
    /// Fetched from or opened in the repository
    CheckedOut,
    /// Brought up to date from the repository
    Updated,
    /// Merged with incoming changes
    Patched,
    /// Included in a new tag or branch
    Tagged,
    /// Moved from another path
    Renamed,
    /// Copied from another path
    Copied,
}

impl ScmFileStatus {
    /// Statuses a diff can report
    pub fn is_diff(&self) -> bool {
        matches!(
            self,
            Self::Added | Self::Modified | Self::Deleted | Self::Renamed | Self::Copied
        )
    }

    /// Statuses an update can report
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            Self::Updated | Self::Patched | Self::Added | Self::Deleted | Self::Conflict | Self::Modified
        )
    }

    /// Statuses a working copy status check can report
    pub fn is_status(&self) -> bool {
        !matches!(self, Self::CheckedIn | Self::CheckedOut | Self::Tagged)
    }

    /// Stable text form
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Unknown => "unknown",
            Self::Conflict => "conflict",
            Self::CheckedIn => "checked-in",
            Self::CheckedOut => "checked-out",
            Self::Updated => "updated",
            Self::Patched => "patched",
            Self::Tagged => "tagged",
            Self::Renamed => "renamed",
            Self::Copied => "copied",
        }
    }
}

impl fmt::Display for ScmFileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScmFileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "added" => Ok(Self::Added),
            "modified" => Ok(Self::Modified),
            "deleted" => Ok(Self::Deleted),
            "unknown" => Ok(Self::Unknown),
            "conflict" => Ok(Self::Conflict),
            "checked-in" => Ok(Self::CheckedIn),
            "checked-out" => Ok(Self::CheckedOut),
            "updated" => Ok(Self::Updated),
            "patched" => Ok(Self::Patched),
            "tagged" => Ok(Self::Tagged),
            "renamed" => Ok(Self::Renamed),
            "copied" => Ok(Self::Copied),
            _ => Err(format!("Unknown file status: '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(ScmFileStatus::Renamed.is_diff());
        assert!(!ScmFileStatus::Tagged.is_diff());
        assert!(ScmFileStatus::Patched.is_update());
        assert!(!ScmFileStatus::CheckedOut.is_update());
        assert!(ScmFileStatus::Unknown.is_status());
        assert!(!ScmFileStatus::CheckedIn.is_status());
    }

    #[test]
    fn test_text_form() {
        assert_eq!(ScmFileStatus::CheckedIn.to_string(), "checked-in");
        assert_eq!("checked_in".parse::<ScmFileStatus>().unwrap(), ScmFileStatus::CheckedIn);
        assert_eq!("MODIFIED".parse::<ScmFileStatus>().unwrap(), ScmFileStatus::Modified);
        assert!("bogus".parse::<ScmFileStatus>().is_err());
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&ScmFileStatus::CheckedOut).unwrap();
        assert_eq!(json, "\"checked_out\"");

        let deserialized: ScmFileStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, ScmFileStatus::CheckedOut);
    }
}
