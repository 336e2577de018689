//! Unified diff output

use super::OutputConsumer;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::{normalize_path, ScmFile};
use crate::domain::entities::scm_result::{CommandPayload, DiffOutput};
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

const BODY_PREFIXES: [&str; 8] = [
    "---",
    "+++",
    "===",
    "@@",
    "\\ No newline at end of file",
    "+",
    "-",
    " ",
];

/// Layout of a section-delimited diff
#[derive(Clone)]
pub struct DiffFormat {
    file_marker: String,
    extract_path: fn(&str) -> Option<String>,
    provenance_prefixes: Vec<String>,
    status_hints: Vec<(String, ScmFileStatus)>,
    status: ScmFileStatus,
}

impl DiffFormat {
    /// `Index: <path>` sections as printed by svn and cvs
    pub fn index() -> Self {
        Self {
            file_marker: "Index: ".to_string(),
            extract_path: |line| {
                line.strip_prefix("Index: ")
                    .map(str::trim)
                    .filter(|path| !path.is_empty())
                    .map(str::to_string)
            },
            provenance_prefixes: vec![
                "RCS file: ".to_string(),
                "retrieving revision ".to_string(),
                "diff ".to_string(),
            ],
            status_hints: Vec::new(),
            status: ScmFileStatus::Modified,
        }
    }

    /// `diff --git a/<path> b/<path>` sections
    pub fn git() -> Self {
        let provenance = [
            "index ",
            "new file mode ",
            "deleted file mode ",
            "old mode ",
            "new mode ",
            "similarity index ",
            "dissimilarity index ",
            "rename from ",
            "rename to ",
            "copy from ",
            "copy to ",
            "Binary files ",
        ];
        Self {
            file_marker: "diff --git ".to_string(),
            extract_path: |line| {
                let rest = line.strip_prefix("diff --git ")?;
                let index = rest.rfind(" b/")?;
                Some(rest[index + 3..].trim_matches('"').to_string())
            },
            provenance_prefixes: provenance.iter().map(|p| p.to_string()).collect(),
            status_hints: vec![
                ("new file mode ".to_string(), ScmFileStatus::Added),
                ("deleted file mode ".to_string(), ScmFileStatus::Deleted),
                ("rename to ".to_string(), ScmFileStatus::Renamed),
                ("copy to ".to_string(), ScmFileStatus::Copied),
            ],
            status: ScmFileStatus::Modified,
        }
    }

    /// Status reported for files the output gives no status hint for
    pub fn with_status(mut self, status: ScmFileStatus) -> Self {
        self.status = status;
        self
    }
}

impl fmt::Debug for DiffFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffFormat")
            .field("file_marker", &self.file_marker)
            .field("provenance_prefixes", &self.provenance_prefixes)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

struct CurrentFile {
    path: String,
    status: ScmFileStatus,
    text: String,
}

/// Unified diff consumer
///
/// A marker line opens a file section; body lines accumulate into that file's
/// diff text; provenance lines are discarded. Any other line closes the open
/// section so stray output is never attributed to the previous file.
pub struct UnifiedDiffConsumer {
    format: DiffFormat,
    current: Option<CurrentFile>,
    changed_files: Vec<ScmFile>,
    differences: BTreeMap<String, String>,
    patch: String,
}

impl UnifiedDiffConsumer {
    /// Consumer for `format`
    pub fn new(format: DiffFormat) -> Self {
        Self {
            format,
            current: None,
            changed_files: Vec::new(),
            differences: BTreeMap::new(),
            patch: String::new(),
        }
    }

    fn close_current(&mut self) {
        let Some(current) = self.current.take() else {
            return;
        };
        match self
            .changed_files
            .iter_mut()
            .find(|file| file.path == current.path)
        {
            Some(existing) => existing.status = current.status,
            None => self
                .changed_files
                .push(ScmFile::new(&current.path, current.status)),
        }
        self.differences.insert(current.path, current.text);
    }
}

impl OutputConsumer for UnifiedDiffConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        self.patch.push_str(line);
        self.patch.push('\n');

        if line.starts_with(self.format.file_marker.as_str()) {
            self.close_current();
            match (self.format.extract_path)(line) {
                Some(path) => {
                    self.current = Some(CurrentFile {
                        path: normalize_path(&path),
                        status: self.format.status,
                        text: String::new(),
                    });
                }
                None => warn!("Cannot extract a path from diff marker: '{}'", line),
            }
            return Ok(());
        }

        if self
            .format
            .provenance_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
        {
            if let Some(current) = self.current.as_mut() {
                if let Some((_, status)) = self
                    .format
                    .status_hints
                    .iter()
                    .find(|(prefix, _)| line.starts_with(prefix.as_str()))
                {
                    current.status = *status;
                }
            }
            debug!("Skipping diff provenance line: '{}'", line);
            return Ok(());
        }

        if BODY_PREFIXES.iter().any(|prefix| line.starts_with(prefix)) {
            match self.current.as_mut() {
                Some(current) => {
                    current.text.push_str(line);
                    current.text.push('\n');
                }
                None => warn!("Dropping diff line outside of any file: '{}'", line),
            }
            return Ok(());
        }

        if self.current.is_some() {
            warn!("Unparseable diff line closes the current file: '{}'", line);
            self.close_current();
        } else {
            debug!("Ignoring line outside of any file: '{}'", line);
        }
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> CommandPayload {
        self.close_current();
        CommandPayload::Diff(DiffOutput {
            changed_files: self.changed_files,
            differences: self.differences,
            patch: self.patch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::consumers::test_support::count_warnings;
    use pretty_assertions::assert_eq;

    fn run(format: DiffFormat, lines: &[&str]) -> (DiffOutput, usize) {
        count_warnings(|| {
            let mut consumer = Box::new(UnifiedDiffConsumer::new(format));
            for line in lines {
                consumer.consume_line(line).unwrap();
            }
            consumer.finish().into_diff()
        })
    }

    #[test]
    fn test_index_sample() {
        let (diff, warnings) = run(
            DiffFormat::index(),
            &["Index: a.txt", "---a", "+++b", "@@ -1,1 +1,1 @@", "-old", "+new"],
        );
        assert_eq!(diff.changed_files, vec![ScmFile::new("a.txt", ScmFileStatus::Modified)]);
        assert_eq!(
            diff.differences["a.txt"],
            "---a\n+++b\n@@ -1,1 +1,1 @@\n-old\n+new\n"
        );
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_stray_line_closes_file() {
        let (diff, warnings) = run(
            DiffFormat::index(),
            &[
                "Index: a.txt",
                "@@ -1 +1 @@",
                "-old",
                "+new",
                "garbage from the tool",
                "+added",
            ],
        );
        assert_eq!(diff.differences["a.txt"], "@@ -1 +1 @@\n-old\n+new\n");
        assert_eq!(diff.changed_files.len(), 1);
        // one for the stray line, one for the orphaned body line
        assert_eq!(warnings, 2);
    }

    #[test]
    fn test_provenance_lines_are_discarded() {
        let (diff, _) = run(
            DiffFormat::index(),
            &[
                "Index: src/lib.c",
                "===================================================================",
                "RCS file: /cvs/src/lib.c,v",
                "retrieving revision 1.2",
                "diff -u -r1.2 lib.c",
                "--- lib.c",
                "+++ lib.c",
                "@@ -3 +3 @@",
                "-a",
                "+b",
                "Index: README",
                "@@ -1 +1 @@",
                " context",
            ],
        );
        assert_eq!(
            diff.changed_files,
            vec![
                ScmFile::new("src/lib.c", ScmFileStatus::Modified),
                ScmFile::new("README", ScmFileStatus::Modified),
            ]
        );
        assert!(diff.differences["src/lib.c"].starts_with("===="));
        assert!(!diff.differences["src/lib.c"].contains("RCS file"));
        assert_eq!(diff.differences["README"], "@@ -1 +1 @@\n context\n");
        assert_eq!(diff.patch.lines().count(), 13);
    }

    #[test]
    fn test_repeated_marker_resets_buffer() {
        let (diff, _) = run(
            DiffFormat::index(),
            &["Index: a.txt", "-first", "Index: a.txt", "+second"],
        );
        assert_eq!(diff.changed_files.len(), 1);
        assert_eq!(diff.differences["a.txt"], "+second\n");
    }

    #[test]
    fn test_git_sections() {
        let (diff, warnings) = run(
            DiffFormat::git(),
            &[
                "diff --git a/src/main.rs b/src/main.rs",
                "index 3b18e51..a1f2c3d 100644",
                "--- a/src/main.rs",
                "+++ b/src/main.rs",
                "@@ -1 +1 @@",
                "-fn main() {}",
                "+fn main() { run(); }",
                "diff --git a/new.txt b/new.txt",
                "new file mode 100644",
                "index 0000000..e69de29",
            ],
        );
        assert_eq!(
            diff.changed_files,
            vec![
                ScmFile::new("src/main.rs", ScmFileStatus::Modified),
                ScmFile::new("new.txt", ScmFileStatus::Added),
            ]
        );
        assert_eq!(diff.differences["new.txt"], "");
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_default_status_yields_to_hints() {
        let (diff, _) = run(
            DiffFormat::git().with_status(ScmFileStatus::Unknown),
            &[
                "diff --git a/plain.txt b/plain.txt",
                "@@ -1 +1 @@",
                "+x",
                "diff --git a/gone.txt b/gone.txt",
                "deleted file mode 100644",
            ],
        );
        assert_eq!(
            diff.changed_files,
            vec![
                ScmFile::new("plain.txt", ScmFileStatus::Unknown),
                ScmFile::new("gone.txt", ScmFileStatus::Deleted),
            ]
        );

        let (diff, _) = run(
            DiffFormat::index().with_status(ScmFileStatus::Added),
            &["Index: a.txt", "+new"],
        );
        assert_eq!(
            diff.changed_files,
            vec![ScmFile::new("a.txt", ScmFileStatus::Added)]
        );
    }
}
