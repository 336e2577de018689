//! Files and file sets relative to a working copy

use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Directories holding VCS metadata, never part of a working copy file set
pub const METADATA_DIRECTORIES: [&str; 6] = [".git", ".svn", ".hg", ".bzr", "CVS", "_darcs"];

/// Normalize a path reported by a tool: `\` becomes `/` and a leading `./` is dropped
pub fn normalize_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    let mut trimmed = normalized.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

/// A repository-relative path with the outcome of an operation on it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScmFile {
    /// Repository-relative path, `/`-separated
    pub path: String,
    /// Outcome for this path
    pub status: ScmFileStatus,
}

impl ScmFile {
    /// Create a file record; the path is normalized
    pub fn new(path: impl AsRef<str>, status: ScmFileStatus) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            status,
        }
    }
}

impl fmt::Display for ScmFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.path)
    }
}

/// Files a command operates on, relative to a working copy base directory
///
/// Every entry resolves under the base directory. Absolute inputs inside the
/// base are stored relative to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmFileSet {
    base_directory: PathBuf,
    files: Vec<PathBuf>,
}

impl ScmFileSet {
    /// Create a file set, rejecting entries that escape `base_directory`
    pub fn new<I, P>(base_directory: impl Into<PathBuf>, files: I) -> UniscmResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let base_directory = base_directory.into();
        let files = files
            .into_iter()
            .map(|file| Self::relativize(&base_directory, file.as_ref()))
            .collect::<UniscmResult<Vec<_>>>()?;

        Ok(Self {
            base_directory,
            files,
        })
    }

    /// A file set with no explicit files (the whole working copy)
    pub fn whole(base_directory: impl Into<PathBuf>) -> Self {
        Self {
            base_directory: base_directory.into(),
            files: Vec::new(),
        }
    }

    /// Select regular files under `base_directory` by glob patterns
    ///
    /// Patterns match the `/`-separated relative path. An empty `includes` means
    /// `**`. VCS metadata directories are never descended into.
    pub fn from_patterns(
        base_directory: impl Into<PathBuf>,
        includes: &[&str],
        excludes: &[&str],
    ) -> UniscmResult<Self> {
        let base_directory = base_directory.into();
        let includes = if includes.is_empty() {
            vec![Self::compile("**")?]
        } else {
            includes
                .iter()
                .map(|pattern| Self::compile(pattern))
                .collect::<UniscmResult<Vec<_>>>()?
        };
        let excludes = excludes
            .iter()
            .map(|pattern| Self::compile(pattern))
            .collect::<UniscmResult<Vec<_>>>()?;

        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let mut files = Vec::new();
        for entry in WalkDir::new(&base_directory)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !(entry.file_type().is_dir()
                    && entry
                        .file_name()
                        .to_str()
                        .map(|name| METADATA_DIRECTORIES.contains(&name))
                        .unwrap_or(false))
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let Ok(relative) = entry.path().strip_prefix(&base_directory) else {
                continue;
            };
            let candidate = normalize_path(&relative.to_string_lossy());
            let included = includes
                .iter()
                .any(|pattern| pattern.matches_with(&candidate, options));
            let excluded = excludes
                .iter()
                .any(|pattern| pattern.matches_with(&candidate, options));
            if included && !excluded {
                files.push(relative.to_path_buf());
            }
        }

        Ok(Self {
            base_directory,
            files,
        })
    }

    fn compile(pattern: &str) -> UniscmResult<Pattern> {
        Pattern::new(pattern).map_err(|e| {
            ScmError::invalid_file_set(format!("Invalid pattern '{}': {}", pattern, e.msg), None)
        })
    }

    fn relativize(base: &Path, file: &Path) -> UniscmResult<PathBuf> {
        let relative = if file.is_absolute() {
            file.strip_prefix(base).map_err(|_| {
                ScmError::invalid_file_set(
                    format!("{} is outside {}", file.display(), base.display()),
                    Some(file.to_path_buf()),
                )
            })?
        } else {
            file
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(ScmError::invalid_file_set(
                            format!("{} escapes {}", file.display(), base.display()),
                            Some(file.to_path_buf()),
                        ));
                    }
                }
                Component::Normal(part) => normalized.push(part),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ScmError::invalid_file_set(
                        format!("{} is outside {}", file.display(), base.display()),
                        Some(file.to_path_buf()),
                    ))
                }
            }
        }
        Ok(normalized)
    }

    /// Working copy base directory
    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    /// Files relative to the base directory
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Whether no file is named
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Number of named files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Relative paths as `/`-separated strings, suitable as tool arguments
    pub fn relative_paths(&self) -> Vec<String> {
        self.files
            .iter()
            .map(|file| normalize_path(&file.to_string_lossy()))
            .collect()
    }

    /// Paths joined onto the base directory
    pub fn absolute_paths(&self) -> Vec<PathBuf> {
        self.files
            .iter()
            .map(|file| self.base_directory.join(file))
            .collect()
    }
}
