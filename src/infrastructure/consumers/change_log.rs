//! Change log output of git and svn

use super::status_line::{report_anomaly, ParsedLine, StatusLineFormat};
use super::OutputConsumer;
use crate::common::result::UniscmResult;
use crate::domain::entities::change_log::{ChangeFile, ChangeLogSet, ChangeSet};
use crate::domain::entities::scm_file::normalize_path;
use crate::domain::entities::scm_result::CommandPayload;
use crate::domain::value_objects::scm_file_status::ScmFileStatus;
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt::Write;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Date layout requested from `git log --date=format:...` and printed by `svn log`
pub const DEFAULT_LOG_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Collects change sets and drops those outside the requested range
#[derive(Debug, Default)]
pub struct ChangeSetAccumulator {
    start_date: Option<DateTime<FixedOffset>>,
    end_date: Option<DateTime<FixedOffset>>,
    current: Option<ChangeSet>,
    change_sets: Vec<ChangeSet>,
}

impl ChangeSetAccumulator {
    /// Accumulator for `[start_date, end_date]`; open bounds accept everything
    pub fn new(
        start_date: Option<DateTime<FixedOffset>>,
        end_date: Option<DateTime<FixedOffset>>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            ..Default::default()
        }
    }

    /// Close the open change set and open `change_set`
    pub fn begin(&mut self, change_set: ChangeSet) {
        self.flush();
        self.current = Some(change_set);
    }

    /// The open change set
    pub fn current_mut(&mut self) -> Option<&mut ChangeSet> {
        self.current.as_mut()
    }

    /// Close the open change set
    pub fn flush(&mut self) {
        let Some(change_set) = self.current.take() else {
            return;
        };
        if self.in_range(&change_set) {
            self.change_sets.push(change_set);
        } else {
            debug!(
                "Dropping change set {:?} outside the requested range",
                change_set.key
            );
        }
    }

    fn in_range(&self, change_set: &ChangeSet) -> bool {
        let Some(date) = change_set.date else {
            return true;
        };
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }

    /// Close the open change set and produce the log
    pub fn finish(mut self) -> ChangeLogSet {
        self.flush();
        ChangeLogSet {
            start_date: self.start_date,
            end_date: self.end_date,
            change_sets: self.change_sets,
        }
    }
}

/// Read a log date with `format`
///
/// Formats without an offset read as UTC; date-only formats read as midnight UTC.
pub fn read_log_date(text: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_str(text, format) {
        return Some(date);
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
        return Some(date.and_utc().fixed_offset());
    }
    NaiveDate::parse_from_str(text, format)
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().fixed_offset())
}

/// Whether dates written with `format` can be read back by [`read_log_date`]
pub fn is_usable_log_date_format(format: &str) -> bool {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return false;
    }
    let Ok(sample) = DateTime::parse_from_rfc3339("2001-02-03T04:05:06+07:00") else {
        return false;
    };
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(format)).is_err() {
        return false;
    }
    read_log_date(&rendered, format).is_some()
}

fn parse_date(text: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    let date = read_log_date(text, format);
    if date.is_none() {
        warn!("Cannot parse date '{}' with format '{}'", text.trim(), format);
    }
    date
}

fn change_status(letter: &str) -> Option<ScmFileStatus> {
    match letter {
        "A" => Some(ScmFileStatus::Added),
        "M" | "T" => Some(ScmFileStatus::Modified),
        "D" => Some(ScmFileStatus::Deleted),
        "R" => Some(ScmFileStatus::Renamed),
        "C" => Some(ScmFileStatus::Copied),
        "U" => Some(ScmFileStatus::Conflict),
        "X" => Some(ScmFileStatus::Unknown),
        _ => None,
    }
}

fn git_name_status() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<status>[AMDRCTUX])(?P<score>\d*)\t(?P<paths>.+)$")
            .unwrap_or_else(|e| panic!("invalid name-status pattern: {}", e))
    })
}

/// `git log --name-status` with an explicit date format
pub struct GitLogConsumer {
    date_format: String,
    accumulator: ChangeSetAccumulator,
}

impl GitLogConsumer {
    /// Consumer for the given range and date format
    pub fn new(
        start_date: Option<DateTime<FixedOffset>>,
        end_date: Option<DateTime<FixedOffset>>,
        date_format: impl Into<String>,
    ) -> Self {
        Self {
            date_format: date_format.into(),
            accumulator: ChangeSetAccumulator::new(start_date, end_date),
        }
    }
}

impl OutputConsumer for GitLogConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        if let Some(rest) = line.strip_prefix("commit ") {
            let key = rest.split_whitespace().next().unwrap_or_default();
            self.accumulator.begin(ChangeSet::keyed(key));
            return Ok(());
        }

        let Some(current) = self.accumulator.current_mut() else {
            if !line.trim().is_empty() {
                warn!("Skipping log line before the first commit: '{}'", line);
            }
            return Ok(());
        };

        if let Some(author) = line.strip_prefix("Author:") {
            current.author = Some(author.trim().to_string());
        } else if let Some(date) = line.strip_prefix("Date:") {
            current.date = parse_date(date, &self.date_format);
        } else if let Some(comment) = line.strip_prefix("    ") {
            current.push_comment_line(comment);
        } else if let Some(captures) = git_name_status().captures(line) {
            let paths = &captures["paths"];
            // renames and copies list the source first
            let path = paths.rsplit('\t').next().unwrap_or(paths);
            if let Some(status) = change_status(&captures["status"]) {
                let mut file = ChangeFile::new(normalize_path(path), status);
                if let Some(key) = &current.key {
                    file = file.with_revision(key.clone());
                }
                current.files.push(file);
            }
        } else if line.starts_with("Merge:") || line.trim().is_empty() {
            debug!("Ignoring log line: '{}'", line);
        } else {
            warn!("Skipping unrecognized log line: '{}'", line);
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::ChangeLog(self.accumulator.finish())
    }
}

fn svn_header() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^r(?P<revision>\d+) \| (?P<author>.*?) \| (?P<date>\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2} [+-]\d{4})[^|]*\| \d+ lines?$",
        )
        .unwrap_or_else(|e| panic!("invalid svn log header pattern: {}", e))
    })
}

fn svn_changed_path() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s+(?P<status>[AMDR]) (?P<path>.+?)(?: \(from .+\))?$")
            .unwrap_or_else(|e| panic!("invalid svn changed path pattern: {}", e))
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SvnLogState {
    Header,
    Paths,
    Comment,
}

/// `svn log -v`
pub struct SvnLogConsumer {
    date_format: String,
    state: SvnLogState,
    accumulator: ChangeSetAccumulator,
}

impl SvnLogConsumer {
    /// Consumer for the given range and date format
    pub fn new(
        start_date: Option<DateTime<FixedOffset>>,
        end_date: Option<DateTime<FixedOffset>>,
        date_format: impl Into<String>,
    ) -> Self {
        Self {
            date_format: date_format.into(),
            state: SvnLogState::Header,
            accumulator: ChangeSetAccumulator::new(start_date, end_date),
        }
    }
}

impl OutputConsumer for SvnLogConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        if line.len() >= 20 && line.chars().all(|c| c == '-') {
            self.accumulator.flush();
            self.state = SvnLogState::Header;
            return Ok(());
        }

        match self.state {
            SvnLogState::Header => {
                if let Some(captures) = svn_header().captures(line) {
                    let revision = captures["revision"].to_string();
                    let mut change_set = ChangeSet::keyed(revision);
                    change_set.author = Some(captures["author"].to_string());
                    change_set.date = parse_date(&captures["date"], &self.date_format);
                    self.accumulator.begin(change_set);
                    self.state = SvnLogState::Paths;
                } else if !line.trim().is_empty() {
                    warn!("Skipping unrecognized log header: '{}'", line);
                }
            }
            SvnLogState::Paths => {
                if line.starts_with("Changed paths:") {
                    return Ok(());
                }
                if line.trim().is_empty() {
                    self.state = SvnLogState::Comment;
                    return Ok(());
                }
                let Some(current) = self.accumulator.current_mut() else {
                    return Ok(());
                };
                match svn_changed_path().captures(line) {
                    Some(captures) => {
                        if let Some(status) = change_status(&captures["status"]) {
                            let path = captures["path"].trim_start_matches('/');
                            let mut file = ChangeFile::new(normalize_path(path), status);
                            if let Some(key) = &current.key {
                                file = file.with_revision(key.clone());
                            }
                            current.files.push(file);
                        }
                    }
                    None => warn!("Skipping unrecognized changed path: '{}'", line),
                }
            }
            SvnLogState::Comment => {
                if let Some(current) = self.accumulator.current_mut() {
                    current.push_comment_line(line);
                }
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::ChangeLog(self.accumulator.finish())
    }
}

/// Tools without change sets: every reported file lands in one implicit group
/// spanning the requested range
pub struct UngroupedChangeLogConsumer {
    format: StatusLineFormat,
    start_date: Option<DateTime<FixedOffset>>,
    end_date: Option<DateTime<FixedOffset>>,
    files: Vec<ChangeFile>,
}

impl UngroupedChangeLogConsumer {
    /// Consumer parsing status lines with `format`
    pub fn new(
        format: StatusLineFormat,
        start_date: Option<DateTime<FixedOffset>>,
        end_date: Option<DateTime<FixedOffset>>,
    ) -> Self {
        Self {
            format,
            start_date,
            end_date,
            files: Vec::new(),
        }
    }
}

impl OutputConsumer for UngroupedChangeLogConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        match self.format.parse_line(line) {
            ParsedLine::Entry(file) => self.files.push(ChangeFile::new(file.path, file.status)),
            other => report_anomaly(&other, line, self.format.minimum_width()),
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        let change_sets = if self.files.is_empty() {
            Vec::new()
        } else {
            vec![ChangeSet {
                date: self.end_date,
                files: self.files,
                ..Default::default()
            }]
        };
        CommandPayload::ChangeLog(ChangeLogSet {
            start_date: self.start_date,
            end_date: self.end_date,
            change_sets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::consumers::test_support::count_warnings;
    use pretty_assertions::assert_eq;

    fn date(text: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_str(text, DEFAULT_LOG_DATE_FORMAT).unwrap()
    }

    fn run(consumer: Box<dyn OutputConsumer>, lines: &[&str]) -> (ChangeLogSet, usize) {
        count_warnings(move || {
            let mut consumer = consumer;
            for line in lines {
                consumer.consume_line(line).unwrap();
            }
            consumer.finish().into_change_log()
        })
    }

    const GIT_LOG: &[&str] = &[
        "commit 5d1f0c2a9e (HEAD -> main)",
        "Author: Alice <alice@example.com>",
        "Date:   2024-03-02 10:15:00 +0100",
        "",
        "    Add parser",
        "    ",
        "    With tests.",
        "",
        "A\tsrc/parser.rs",
        "M\tsrc/lib.rs",
        "R095\tsrc/old.rs\tsrc/new.rs",
        "commit 0a1b2c3d4e",
        "Merge: 1111111 2222222",
        "Author: Bob <bob@example.com>",
        "Date:   2024-01-05 08:00:00 +0000",
        "",
        "    Initial import",
        "",
        "D\tjunk.txt",
    ];

    #[test]
    fn test_git_log() {
        let consumer = Box::new(GitLogConsumer::new(None, None, DEFAULT_LOG_DATE_FORMAT));
        let (log, warnings) = run(consumer, GIT_LOG);
        assert_eq!(warnings, 0);
        assert_eq!(log.len(), 2);

        let first = &log.change_sets[0];
        assert_eq!(first.key.as_deref(), Some("5d1f0c2a9e"));
        assert_eq!(first.author.as_deref(), Some("Alice <alice@example.com>"));
        assert_eq!(first.date, Some(date("2024-03-02 10:15:00 +0100")));
        assert_eq!(first.comment, "Add parser\n\nWith tests.");
        assert_eq!(
            first.files,
            vec![
                ChangeFile::new("src/parser.rs", ScmFileStatus::Added).with_revision("5d1f0c2a9e"),
                ChangeFile::new("src/lib.rs", ScmFileStatus::Modified).with_revision("5d1f0c2a9e"),
                ChangeFile::new("src/new.rs", ScmFileStatus::Renamed).with_revision("5d1f0c2a9e"),
            ]
        );
        assert_eq!(log.change_sets[1].files[0].status, ScmFileStatus::Deleted);
    }

    #[test]
    fn test_date_format_without_offset_reads_as_utc() {
        let consumer = Box::new(GitLogConsumer::new(
            Some(date("2024-02-01 00:00:00 +0000")),
            None,
            "%Y-%m-%d %H:%M:%S",
        ));
        let (log, warnings) = run(
            consumer,
            &[
                "commit new",
                "Date:   2024-03-02 10:15:00",
                "commit old",
                "Date:   2024-01-05 08:00:00",
            ],
        );
        assert_eq!(warnings, 0);
        assert_eq!(log.len(), 1);
        assert_eq!(log.change_sets[0].key.as_deref(), Some("new"));
        assert_eq!(
            log.change_sets[0].date,
            Some(date("2024-03-02 10:15:00 +0000"))
        );
    }

    #[test]
    fn test_usable_log_date_formats() {
        assert!(is_usable_log_date_format(DEFAULT_LOG_DATE_FORMAT));
        assert!(is_usable_log_date_format("%Y-%m-%d %H:%M:%S"));
        assert!(is_usable_log_date_format("%Y-%m-%d"));
        assert!(!is_usable_log_date_format("%Y"));
        assert!(!is_usable_log_date_format("%H:%M"));
        assert!(!is_usable_log_date_format("%Q-%m"));
    }

    #[test]
    fn test_git_log_range_filter() {
        let consumer = Box::new(GitLogConsumer::new(
            Some(date("2024-02-01 00:00:00 +0000")),
            None,
            DEFAULT_LOG_DATE_FORMAT,
        ));
        let (log, _) = run(consumer, GIT_LOG);
        assert_eq!(log.len(), 1);
        assert_eq!(log.change_sets[0].key.as_deref(), Some("5d1f0c2a9e"));
    }

    #[test]
    fn test_unparseable_date_is_kept_without_date() {
        let consumer = Box::new(GitLogConsumer::new(None, None, DEFAULT_LOG_DATE_FORMAT));
        let (log, warnings) = run(
            consumer,
            &["commit abc", "Author: A", "Date:   yesterday", "", "    msg"],
        );
        assert_eq!(log.len(), 1);
        assert_eq!(log.change_sets[0].date, None);
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_svn_log() {
        let consumer = Box::new(SvnLogConsumer::new(None, None, DEFAULT_LOG_DATE_FORMAT));
        let (log, warnings) = run(
            consumer,
            &[
                "------------------------------------------------------------------------",
                "r12 | alice | 2024-03-02 10:15:00 +0100 (Sat, 02 Mar 2024) | 2 lines",
                "Changed paths:",
                "   M /trunk/src/main.c",
                "   A /trunk/src/util.c (from /trunk/src/old.c:11)",
                "",
                "Split utilities",
                "out of main",
                "------------------------------------------------------------------------",
                "r11 | bob | 2024-03-01 09:00:00 +0000 (Fri, 01 Mar 2024) | 1 line",
                "Changed paths:",
                "   D /trunk/src/old.c",
                "",
                "Remove old file",
                "------------------------------------------------------------------------",
            ],
        );
        assert_eq!(warnings, 0);
        assert_eq!(log.len(), 2);

        let first = &log.change_sets[0];
        assert_eq!(first.key.as_deref(), Some("12"));
        assert_eq!(first.author.as_deref(), Some("alice"));
        assert_eq!(first.comment, "Split utilities\nout of main");
        assert_eq!(
            first.files,
            vec![
                ChangeFile::new("trunk/src/main.c", ScmFileStatus::Modified).with_revision("12"),
                ChangeFile::new("trunk/src/util.c", ScmFileStatus::Added).with_revision("12"),
            ]
        );
        assert_eq!(log.change_sets[1].files[0].status, ScmFileStatus::Deleted);
    }

    #[test]
    fn test_ungrouped_log_collapses_into_one_set() {
        let end = date("2024-03-31 23:59:59 +0000");
        let consumer = Box::new(UngroupedChangeLogConsumer::new(
            StatusLineFormat::single_letter(),
            Some(date("2024-03-01 00:00:00 +0000")),
            Some(end),
        ));
        let (log, warnings) = run(consumer, &["M src/a.c", "A src/b.c", "?"]);
        assert_eq!(warnings, 1);
        assert_eq!(log.len(), 1);
        assert_eq!(log.change_sets[0].key, None);
        assert_eq!(log.change_sets[0].date, Some(end));
        assert_eq!(log.change_sets[0].files.len(), 2);
    }
}
