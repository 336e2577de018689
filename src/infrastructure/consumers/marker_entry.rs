//! Lock listings grouped under directory markers

use super::OutputConsumer;
use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::{normalize_path, ScmFile};
use crate::domain::entities::scm_result::CommandPayload;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Layout of directory-scoped confirmation output
#[derive(Debug, Clone)]
pub struct MarkerEntryFormat {
    directory_marker: String,
    entry_marker: String,
    status: ScmFileStatus,
}

impl MarkerEntryFormat {
    /// Lines containing `directory_marker` switch directory; lines containing
    /// `entry_marker` name a file in it
    pub fn new(
        directory_marker: impl Into<String>,
        entry_marker: impl Into<String>,
        status: ScmFileStatus,
    ) -> Self {
        Self {
            directory_marker: directory_marker.into(),
            entry_marker: entry_marker.into(),
            status,
        }
    }

    /// `Folder: <name>  (working dir: <path>)` headers followed by
    /// `<file><entry_marker>` lines
    pub fn working_dir_listing(entry_marker: impl Into<String>, status: ScmFileStatus) -> Self {
        Self::new("(working dir: ", entry_marker, status)
    }
}

fn lexical_normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Anchor a relative working directory at the process's current directory
fn absolute_working_directory(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return lexical_normalize(path);
    }
    match std::env::current_dir() {
        Ok(current) => lexical_normalize(&current.join(path)),
        Err(e) => {
            debug!("Cannot resolve '{}' against the current directory: {}", path.display(), e);
            lexical_normalize(path)
        }
    }
}

/// Directory and entry marker consumer
///
/// A directory line must name the working directory or one of its
/// descendants; anything else means the tool is operating on a different tree
/// and fails the whole parse.
pub struct MarkerEntryConsumer {
    format: MarkerEntryFormat,
    working_directory: PathBuf,
    current_directory: PathBuf,
    files: Vec<ScmFile>,
}

impl MarkerEntryConsumer {
    /// Consumer resolving entries under `working_directory`
    pub fn new(format: MarkerEntryFormat, working_directory: impl AsRef<Path>) -> Self {
        Self {
            format,
            working_directory: absolute_working_directory(working_directory.as_ref()),
            current_directory: PathBuf::new(),
            files: Vec::new(),
        }
    }

    fn enter_directory(&mut self, reported: &str) -> UniscmResult<()> {
        let reported = reported.trim();
        let reported = reported.strip_suffix(')').unwrap_or(reported).trim_end();
        let reported = PathBuf::from(reported.replace('\\', "/"));
        let absolute = if reported.is_absolute() {
            lexical_normalize(&reported)
        } else {
            lexical_normalize(&self.working_directory.join(&reported))
        };

        let relative = pathdiff::diff_paths(&absolute, &self.working_directory)
            .filter(|relative| {
                !relative.is_absolute()
                    && !relative
                        .components()
                        .any(|component| matches!(component, Component::ParentDir))
            })
            .ok_or_else(|| {
                ScmError::illegal_state(format!(
                    "Directory '{}' reported by the tool is not under the working directory '{}'",
                    absolute.display(),
                    self.working_directory.display()
                ))
            })?;

        debug!("Entering directory '{}'", relative.display());
        self.current_directory = relative;
        Ok(())
    }
}

impl OutputConsumer for MarkerEntryConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        if let Some(index) = line.find(self.format.directory_marker.as_str()) {
            let reported = line[index + self.format.directory_marker.len()..].to_string();
            return self.enter_directory(&reported);
        }

        if let Some(index) = line.find(self.format.entry_marker.as_str()) {
            let entry = normalize_path(line[..index].trim());
            if entry.is_empty() {
                debug!("Ignoring entry line without a name: '{}'", line);
                return Ok(());
            }
            let path = self.current_directory.join(entry);
            self.files.push(ScmFile::new(
                path.to_string_lossy(),
                self.format.status,
            ));
            return Ok(());
        }

        debug!("Ignoring line: '{}'", line);
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::Files(self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn unlock_consumer() -> Box<MarkerEntryConsumer> {
        Box::new(MarkerEntryConsumer::new(
            MarkerEntryFormat::working_dir_listing(": unlocked", ScmFileStatus::CheckedIn),
            "/work/project",
        ))
    }

    #[test]
    fn test_entries_resolve_against_current_directory() {
        let mut consumer = unlock_consumer();
        for line in [
            "a.txt: unlocked",
            "Folder: src  (working dir: /work/project/src)",
            "main.c: unlocked",
            "Folder: nested  (working dir: /work/project/src/nested)",
            "deep.c: unlocked",
            "some unrelated chatter",
        ] {
            consumer.consume_line(line).unwrap();
        }
        assert_eq!(
            consumer.finish().into_files(),
            vec![
                ScmFile::new("a.txt", ScmFileStatus::CheckedIn),
                ScmFile::new("src/main.c", ScmFileStatus::CheckedIn),
                ScmFile::new("src/nested/deep.c", ScmFileStatus::CheckedIn),
            ]
        );
    }

    #[test]
    fn test_working_directory_itself_is_accepted() {
        let mut consumer = unlock_consumer();
        consumer
            .consume_line("Folder: project  (working dir: /work/project)")
            .unwrap();
        consumer.consume_line("top.txt: unlocked").unwrap();
        assert_eq!(
            consumer.finish().into_files(),
            vec![ScmFile::new("top.txt", ScmFileStatus::CheckedIn)]
        );
    }

    #[test]
    fn test_foreign_directory_is_illegal_state() {
        let mut consumer = unlock_consumer();
        let result = consumer.consume_line("Folder: x  (working dir: /elsewhere/x)");
        assert!(matches!(result, Err(ScmError::IllegalState { .. })));

        let mut consumer = unlock_consumer();
        let result = consumer.consume_line("Folder: up  (working dir: /work/project/../other)");
        assert!(matches!(result, Err(ScmError::IllegalState { .. })));
    }

    #[test]
    fn test_relative_working_directory_still_rejects_foreign_directories() {
        let mut consumer = Box::new(MarkerEntryConsumer::new(
            MarkerEntryFormat::working_dir_listing(": unlocked", ScmFileStatus::CheckedIn),
            ".",
        ));
        let result = consumer.consume_line("Folder: x  (working dir: /somewhere/else)");
        assert!(matches!(result, Err(ScmError::IllegalState { .. })));

        let current = std::env::current_dir().unwrap();
        let mut consumer = Box::new(MarkerEntryConsumer::new(
            MarkerEntryFormat::working_dir_listing(": unlocked", ScmFileStatus::CheckedIn),
            ".",
        ));
        consumer
            .consume_line(&format!("Folder: sub  (working dir: {}/sub)", current.display()))
            .unwrap();
        consumer.consume_line("x.c: unlocked").unwrap();
        assert_eq!(
            consumer.finish().into_files(),
            vec![ScmFile::new("sub/x.c", ScmFileStatus::CheckedIn)]
        );
    }

    #[test]
    fn test_windows_separators() {
        let mut consumer = Box::new(MarkerEntryConsumer::new(
            MarkerEntryFormat::working_dir_listing(": locked", ScmFileStatus::CheckedOut),
            "/work/project",
        ));
        consumer
            .consume_line("Folder: sub  (working dir: /work/project\\sub)")
            .unwrap();
        consumer.consume_line("dir\\file.txt: locked").unwrap();
        assert_eq!(
            consumer.finish().into_files(),
            vec![ScmFile::new("sub/dir/file.txt", ScmFileStatus::CheckedOut)]
        );
    }
}
