//! Small consumers driven by one line pattern

use super::OutputConsumer;
use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::{ScmFile, ScmFileSet};
use crate::domain::entities::scm_result::CommandPayload;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reports the `path` group of every matching line with a fixed status
pub struct RegexLineConsumer {
    pattern: Regex,
    status: ScmFileStatus,
    base_directory: Option<PathBuf>,
    files: Vec<ScmFile>,
}

impl RegexLineConsumer {
    /// Consumer for `pattern`, which must have a `path` group
    pub fn new(pattern: &str, status: ScmFileStatus) -> UniscmResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            ScmError::illegal_state(format!("Invalid line pattern '{}': {}", pattern, e))
        })?;
        if !pattern.capture_names().any(|name| name == Some("path")) {
            return Err(ScmError::illegal_state(format!(
                "Line pattern '{}' has no 'path' group",
                pattern
            )));
        }
        Ok(Self {
            pattern,
            status,
            base_directory: None,
            files: Vec::new(),
        })
    }

    /// Only report paths that exist as regular files under `base_directory`
    pub fn existing_under(mut self, base_directory: impl AsRef<Path>) -> Self {
        self.base_directory = Some(base_directory.as_ref().to_path_buf());
        self
    }
}

impl OutputConsumer for RegexLineConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        let Some(path) = self
            .pattern
            .captures(line)
            .and_then(|captures| captures.name("path"))
        else {
            debug!("Ignoring line: '{}'", line);
            return Ok(());
        };

        let file = ScmFile::new(path.as_str().trim(), self.status);
        if let Some(base) = &self.base_directory {
            if !base.join(&file.path).is_file() {
                debug!("Dropping '{}': not a file in the working copy", file.path);
                return Ok(());
            }
        }
        self.files.push(file);
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::Files(self.files)
    }
}

/// One path per non-empty line
pub struct PathListConsumer {
    status: ScmFileStatus,
    skip_directories: bool,
    files: Vec<ScmFile>,
}

impl PathListConsumer {
    /// Consumer reporting every listed path with `status`
    pub fn new(status: ScmFileStatus) -> Self {
        Self {
            status,
            skip_directories: false,
            files: Vec::new(),
        }
    }

    /// Drop entries ending in `/`
    pub fn skip_directories(mut self) -> Self {
        self.skip_directories = true;
        self
    }
}

impl OutputConsumer for PathListConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        let path = line.trim();
        if path.is_empty() || (self.skip_directories && path.ends_with('/')) {
            return Ok(());
        }
        self.files.push(ScmFile::new(path, self.status));
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::Files(self.files)
    }
}

/// Reports the request's files with a fixed status, for tools that print no
/// per-file confirmation
pub struct FileSetEchoConsumer {
    files: Vec<ScmFile>,
}

impl FileSetEchoConsumer {
    /// Consumer echoing `file_set`
    pub fn new(file_set: &ScmFileSet, status: ScmFileStatus) -> Self {
        Self {
            files: file_set
                .relative_paths()
                .into_iter()
                .map(|path| ScmFile::new(path, status))
                .collect(),
        }
    }
}

impl OutputConsumer for FileSetEchoConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        debug!("{}", line);
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::Files(self.files)
    }
}

/// Discards output
#[derive(Debug, Default)]
pub struct NullConsumer;

impl OutputConsumer for NullConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        debug!("{}", line);
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::Empty
    }
}
