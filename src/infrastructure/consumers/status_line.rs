//! Status code plus path lines

use super::OutputConsumer;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::{normalize_path, ScmFile};
use crate::domain::entities::scm_result::CommandPayload;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// What a status code means
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeAction {
    /// Report the file with this status
    Status(ScmFileStatus),
    /// Known code that carries nothing to report
    Skip,
}

/// Outcome of parsing a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A file record
    Entry(ScmFile),
    /// Code mapped to [`CodeAction::Skip`]
    Skipped,
    /// Informational line
    Ignored,
    /// Line shorter than code, separator and one path character
    TooShort,
    /// Code missing from the table
    UnknownCode(String),
    /// Separator columns are not blank
    BadSeparator,
}

/// Fixed-column status output layout: `<code><separator><path>`
///
/// Columns are counted in characters, never by splitting on whitespace, so
/// paths containing blanks survive.
#[derive(Debug, Clone)]
pub struct StatusLineFormat {
    code_width: usize,
    separator_width: usize,
    strict_separator: bool,
    codes: HashMap<String, CodeAction>,
    ignored_prefixes: Vec<String>,
    rename_arrow: Option<String>,
    unquote_paths: bool,
}

impl StatusLineFormat {
    /// Empty layout with the given code and separator widths
    pub fn new(code_width: usize, separator_width: usize) -> Self {
        Self {
            code_width,
            separator_width,
            strict_separator: true,
            codes: HashMap::new(),
            ignored_prefixes: Vec::new(),
            rename_arrow: None,
            unquote_paths: false,
        }
    }

    /// Map a code to a status
    pub fn code(mut self, code: &str, status: ScmFileStatus) -> Self {
        self.codes.insert(code.to_string(), CodeAction::Status(status));
        self
    }

    /// Mark a code as known but not reported
    pub fn skip(mut self, code: &str) -> Self {
        self.codes.insert(code.to_string(), CodeAction::Skip);
        self
    }

    /// Silently ignore lines starting with `prefix`
    pub fn ignore_prefix(mut self, prefix: &str) -> Self {
        self.ignored_prefixes.push(prefix.to_string());
        self
    }

    /// Whether separator columns must be blank
    pub fn strict_separator(mut self, strict: bool) -> Self {
        self.strict_separator = strict;
        self
    }

    /// Keep only the part after `arrow` (`old -> new`)
    pub fn rename_arrow(mut self, arrow: &str) -> Self {
        self.rename_arrow = Some(arrow.to_string());
        self
    }

    /// Strip C-style quotes around paths
    pub fn unquote_paths(mut self) -> Self {
        self.unquote_paths = true;
        self
    }

    /// Shortest line that can carry a path
    pub fn minimum_width(&self) -> usize {
        self.code_width + self.separator_width + 1
    }

    /// One-letter codes in the CVS style
    pub fn single_letter() -> Self {
        Self::new(1, 1)
            .code("A", ScmFileStatus::Added)
            .code("M", ScmFileStatus::Modified)
            .code("D", ScmFileStatus::Deleted)
            .code("R", ScmFileStatus::Deleted)
            .code("U", ScmFileStatus::Updated)
            .code("P", ScmFileStatus::Patched)
            .code("C", ScmFileStatus::Conflict)
            .code("T", ScmFileStatus::Tagged)
            .code("?", ScmFileStatus::Unknown)
            .skip("I")
            .skip("*")
    }

    /// `svn status`: one code column, seven flag columns
    pub fn svn_status() -> Self {
        Self::new(1, 7)
            .strict_separator(false)
            .code("A", ScmFileStatus::Added)
            .code("M", ScmFileStatus::Modified)
            .code("R", ScmFileStatus::Modified)
            .code("D", ScmFileStatus::Deleted)
            .code("C", ScmFileStatus::Conflict)
            .code("?", ScmFileStatus::Unknown)
            .code("U", ScmFileStatus::Updated)
            .code("G", ScmFileStatus::Patched)
            .skip("!")
            .skip("I")
            .skip("X")
            .skip("~")
            .skip(" ")
            .ignore_prefix("Performing status on external item")
            .ignore_prefix("Status against revision")
            .ignore_prefix("--- Changelist")
    }

    /// `svn checkout`, `svn update` and `svn export`: one code, four flag columns
    pub fn svn_update() -> Self {
        Self::new(1, 4)
            .strict_separator(false)
            .code("A", ScmFileStatus::Added)
            .code("D", ScmFileStatus::Deleted)
            .code("U", ScmFileStatus::Updated)
            .code("C", ScmFileStatus::Conflict)
            .code("G", ScmFileStatus::Patched)
            .code("E", ScmFileStatus::Updated)
            .code("R", ScmFileStatus::Updated)
            .skip(" ")
            .ignore_prefix("Updating '")
            .ignore_prefix("Updated to revision")
            .ignore_prefix("At revision")
            .ignore_prefix("Checked out revision")
            .ignore_prefix("Exported revision")
            .ignore_prefix("Export complete")
            .ignore_prefix("Fetching external item")
            .ignore_prefix("Updated external to revision")
            .ignore_prefix("External at revision")
            .ignore_prefix("External checked out at revision")
            .ignore_prefix("Summary of conflicts")
            .ignore_prefix("Restored '")
    }

    /// `svn add` and `svn delete`: one code, nine flag columns
    pub fn svn_add() -> Self {
        Self::new(1, 9)
            .strict_separator(false)
            .code("A", ScmFileStatus::Added)
            .code("D", ScmFileStatus::Deleted)
    }

    /// `git status --porcelain`: two code columns, one blank
    pub fn git_porcelain() -> Self {
        let mut format = Self::new(2, 1)
            .rename_arrow(" -> ")
            .unquote_paths()
            .code("??", ScmFileStatus::Unknown)
            .code(" A", ScmFileStatus::Added)
            .skip("!!");

        for code in ["DD", "AU", "UD", "UA", "DU", "AA", "UU"] {
            format = format.code(code, ScmFileStatus::Conflict);
        }

        for index in [' ', 'M', 'T', 'A', 'D', 'R', 'C'] {
            for worktree in [' ', 'M', 'T', 'D'] {
                if index == ' ' && worktree == ' ' {
                    continue;
                }
                let status = match (index, worktree) {
                    ('R', _) => ScmFileStatus::Renamed,
                    ('C', _) => ScmFileStatus::Copied,
                    ('D', _) | (_, 'D') => ScmFileStatus::Deleted,
                    ('A', _) => ScmFileStatus::Added,
                    _ => ScmFileStatus::Modified,
                };
                format = format.code(&format!("{}{}", index, worktree), status);
            }
        }
        format
    }

    /// Parse one line without any file system access
    pub fn parse_line(&self, line: &str) -> ParsedLine {
        if self
            .ignored_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
        {
            return ParsedLine::Ignored;
        }

        if line.chars().count() < self.minimum_width() {
            return ParsedLine::TooShort;
        }

        let code_end = byte_offset(line, self.code_width);
        let path_start = byte_offset(line, self.code_width + self.separator_width);
        let code = &line[..code_end];

        match self.codes.get(code) {
            None => ParsedLine::UnknownCode(code.to_string()),
            Some(CodeAction::Skip) => ParsedLine::Skipped,
            Some(CodeAction::Status(status)) => {
                let separator = &line[code_end..path_start];
                if self.strict_separator && !separator.chars().all(char::is_whitespace) {
                    return ParsedLine::BadSeparator;
                }

                let mut path = &line[path_start..];
                if let Some(arrow) = &self.rename_arrow {
                    if let Some(index) = path.find(arrow.as_str()) {
                        path = &path[index + arrow.len()..];
                    }
                }
                let path = if self.unquote_paths {
                    unquote(path)
                } else {
                    path.to_string()
                };
                if path.trim().is_empty() {
                    return ParsedLine::TooShort;
                }
                ParsedLine::Entry(ScmFile::new(normalize_path(&path), *status))
            }
        }
    }
}

fn byte_offset(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(line.len())
}

fn unquote(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unquoted.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => unquoted.push('\t'),
            Some('n') => unquoted.push('\n'),
            Some(other) => unquoted.push(other),
            None => unquoted.push('\\'),
        }
    }
    unquoted
}

/// Status code consumer: one code and one path per line
///
/// Files reported with any status but [`ScmFileStatus::Deleted`] are kept only
/// if they exist as regular files under the working copy base.
pub struct StatusLineConsumer {
    format: StatusLineFormat,
    base_directory: PathBuf,
    check_existence: bool,
    files: Vec<ScmFile>,
}

impl StatusLineConsumer {
    /// Consumer that checks reported files against `base_directory`
    pub fn new(format: StatusLineFormat, base_directory: impl AsRef<Path>) -> Self {
        Self {
            format,
            base_directory: base_directory.as_ref().to_path_buf(),
            check_existence: true,
            files: Vec::new(),
        }
    }

    /// Consumer that trusts the tool (output describes remote or removed state)
    pub fn without_existence_check(format: StatusLineFormat) -> Self {
        Self {
            format,
            base_directory: PathBuf::new(),
            check_existence: false,
            files: Vec::new(),
        }
    }

    /// Files collected so far
    pub fn files(&self) -> &[ScmFile] {
        &self.files
    }
}

/// Log a parse anomaly the same way for every status code consumer
pub(crate) fn report_anomaly(parsed: &ParsedLine, line: &str, minimum_width: usize) {
    match parsed {
        ParsedLine::TooShort => {
            warn!(
                "Skipping status line shorter than {} characters: '{}'",
                minimum_width, line
            )
        }
        ParsedLine::UnknownCode(code) => {
            warn!("Skipping line with unknown status code '{}': '{}'", code, line)
        }
        ParsedLine::BadSeparator => warn!("Skipping malformed status line: '{}'", line),
        ParsedLine::Skipped | ParsedLine::Ignored => debug!("Ignoring line: '{}'", line),
        ParsedLine::Entry(_) => {}
    }
}

impl OutputConsumer for StatusLineConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        match self.format.parse_line(line) {
            ParsedLine::Entry(file) => {
                if self.check_existence
                    && file.status != ScmFileStatus::Deleted
                    && !self.base_directory.join(&file.path).is_file()
                {
                    debug!("Dropping '{}': not a file in the working copy", file.path);
                } else {
                    self.files.push(file);
                }
            }
            other => report_anomaly(&other, line, self.format.minimum_width()),
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::Files(self.files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::consumers::test_support::count_warnings;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn run(consumer: StatusLineConsumer, lines: &[&str]) -> (Vec<ScmFile>, usize) {
        count_warnings(move || {
            let mut consumer = Box::new(consumer);
            for line in lines {
                consumer.consume_line(line).unwrap();
            }
            consumer.finish().into_files()
        })
    }

    fn working_copy(files: &[&str]) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        for file in files {
            let path = temp_dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "content").unwrap();
        }
        temp_dir
    }

    #[test]
    fn test_added_file_that_exists() {
        let temp_dir = working_copy(&["foo/bar.txt"]);
        let consumer = StatusLineConsumer::new(StatusLineFormat::single_letter(), temp_dir.path());
        let (files, warnings) = run(consumer, &["A foo/bar.txt"]);
        assert_eq!(files, vec![ScmFile::new("foo/bar.txt", ScmFileStatus::Added)]);
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_missing_file_is_suppressed_unless_deleted() {
        let temp_dir = working_copy(&[]);
        let consumer = StatusLineConsumer::new(StatusLineFormat::single_letter(), temp_dir.path());
        let (files, warnings) = run(consumer, &["M foo/bar.txt", "D removed/file"]);
        assert_eq!(files, vec![ScmFile::new("removed/file", ScmFileStatus::Deleted)]);
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_short_line_warns() {
        let temp_dir = working_copy(&[]);
        for line in ["A ", "A", ""] {
            let consumer =
                StatusLineConsumer::new(StatusLineFormat::single_letter(), temp_dir.path());
            let (files, warnings) = run(consumer, &[line]);
            assert!(files.is_empty());
            assert_eq!(warnings, 1, "line {:?}", line);
        }
    }

    #[test]
    fn test_unknown_code_warns() {
        let temp_dir = working_copy(&["foo"]);
        let consumer = StatusLineConsumer::new(StatusLineFormat::single_letter(), temp_dir.path());
        let (files, warnings) = run(consumer, &["X foo"]);
        assert!(files.is_empty());
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_skip_codes_are_silent() {
        let temp_dir = working_copy(&["ignored.o"]);
        let consumer = StatusLineConsumer::new(StatusLineFormat::single_letter(), temp_dir.path());
        let (files, warnings) = run(consumer, &["I ignored.o"]);
        assert!(files.is_empty());
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_strict_separator() {
        let temp_dir = working_copy(&["Mfoo"]);
        let consumer = StatusLineConsumer::new(StatusLineFormat::single_letter(), temp_dir.path());
        let (files, warnings) = run(consumer, &["AMfoo"]);
        assert!(files.is_empty());
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_svn_status_columns() {
        let temp_dir = working_copy(&["src/main.c", "my file.txt"]);
        let consumer = StatusLineConsumer::new(StatusLineFormat::svn_status(), temp_dir.path());
        let (files, warnings) = run(
            consumer,
            &[
                "M       src/main.c",
                "?       my file.txt",
                "!       gone.c",
                "D       old.c",
                "Status against revision:     42",
            ],
        );
        assert_eq!(
            files,
            vec![
                ScmFile::new("src/main.c", ScmFileStatus::Modified),
                ScmFile::new("my file.txt", ScmFileStatus::Unknown),
                ScmFile::new("old.c", ScmFileStatus::Deleted),
            ]
        );
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_svn_update_ignores_informational_lines() {
        let consumer = StatusLineConsumer::without_existence_check(StatusLineFormat::svn_update());
        let (files, warnings) = run(
            consumer,
            &[
                "Updating '.':",
                "U    trunk/a.c",
                "A    trunk/new.c",
                "Updated to revision 7.",
            ],
        );
        assert_eq!(
            files,
            vec![
                ScmFile::new("trunk/a.c", ScmFileStatus::Updated),
                ScmFile::new("trunk/new.c", ScmFileStatus::Added),
            ]
        );
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_git_porcelain_codes() {
        let temp_dir = working_copy(&["a.txt", "new name.txt", "untracked.rs", "staged.rs"]);
        let consumer = StatusLineConsumer::new(StatusLineFormat::git_porcelain(), temp_dir.path());
        let (files, warnings) = run(
            consumer,
            &[
                " M a.txt",
                "R  old.txt -> \"new name.txt\"",
                "?? untracked.rs",
                "A  staged.rs",
                " D gone.rs",
            ],
        );
        assert_eq!(
            files,
            vec![
                ScmFile::new("a.txt", ScmFileStatus::Modified),
                ScmFile::new("new name.txt", ScmFileStatus::Renamed),
                ScmFile::new("untracked.rs", ScmFileStatus::Unknown),
                ScmFile::new("staged.rs", ScmFileStatus::Added),
                ScmFile::new("gone.rs", ScmFileStatus::Deleted),
            ]
        );
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_windows_separators_are_normalized() {
        let format = StatusLineFormat::single_letter();
        assert_eq!(
            format.parse_line("D dir\\file.txt"),
            ParsedLine::Entry(ScmFile::new("dir/file.txt", ScmFileStatus::Deleted))
        );
    }
}
