//! Per-line annotation output

use super::OutputConsumer;
use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_result::{BlameLine, CommandPayload};
use chrono::DateTime;
use regex::Regex;
use tracing::warn;

/// Date layout passed to `git blame --date=format:...`
pub const GIT_BLAME_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Blame line layout: a regex with `revision` and `author` groups and an
/// optional `date` group read with an explicit format
#[derive(Debug, Clone)]
pub struct BlameFormat {
    pattern: Regex,
    date_format: Option<String>,
}

impl BlameFormat {
    /// Custom layout
    pub fn new(pattern: &str, date_format: Option<&str>) -> UniscmResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| {
            ScmError::illegal_state(format!("Invalid blame pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            pattern,
            date_format: date_format.map(str::to_string),
        })
    }

    /// `git blame -c --date=format:%Y-%m-%d %H:%M:%S %z`
    pub fn git() -> UniscmResult<Self> {
        Self::new(
            r"^\^?(?P<revision>[0-9a-f]+)\s+\(\s*(?P<author>[^\t]*?)\s*\t(?P<date>[^\t]+)\t\s*\d+\)",
            Some(GIT_BLAME_DATE_FORMAT),
        )
    }

    /// `svn blame`
    pub fn svn() -> UniscmResult<Self> {
        Self::new(r"^\s*(?P<revision>\d+|-)\s+(?P<author>\S+)", None)
    }
}

/// One [`BlameLine`] per annotated source line
pub struct BlameConsumer {
    format: BlameFormat,
    lines: Vec<BlameLine>,
}

impl BlameConsumer {
    /// Consumer for `format`
    pub fn new(format: BlameFormat) -> Self {
        Self {
            format,
            lines: Vec::new(),
        }
    }
}

impl OutputConsumer for BlameConsumer {
    fn consume_line(&mut self, line: &str) -> UniscmResult<()> {
        let Some(captures) = self.format.pattern.captures(line) else {
            warn!("Skipping unrecognized blame line: '{}'", line);
            return Ok(());
        };

        let date = match (captures.name("date"), &self.format.date_format) {
            (Some(text), Some(format)) => {
                match DateTime::parse_from_str(text.as_str().trim(), format) {
                    Ok(date) => Some(date),
                    Err(e) => {
                        warn!("Cannot parse blame date '{}': {}", text.as_str(), e);
                        None
                    }
                }
            }
            _ => None,
        };

        self.lines.push(BlameLine {
            revision: captures
                .name("revision")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            author: captures
                .name("author")
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
            date,
        });
        Ok(())
    }

    fn finish(self: Box<Self>) -> CommandPayload {
        CommandPayload::Blame(self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::consumers::test_support::count_warnings;

    fn run(format: BlameFormat, lines: &[&str]) -> (Vec<BlameLine>, usize) {
        count_warnings(|| {
            let mut consumer = Box::new(BlameConsumer::new(format));
            for line in lines {
                consumer.consume_line(line).unwrap();
            }
            consumer.finish().into_blame()
        })
    }

    #[test]
    fn test_git_blame() {
        let (lines, warnings) = run(
            BlameFormat::git().unwrap(),
            &[
                "5d1f0c2a\t(  Alice Smith\t2024-03-02 10:15:00 +0100\t1)fn main() {",
                "^0a1b2c3\t(        Bob\t2024-01-05 08:00:00 +0000\t2)}",
            ],
        );
        assert_eq!(warnings, 0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].revision, "5d1f0c2a");
        assert_eq!(lines[0].author, "Alice Smith");
        assert_eq!(
            lines[0].date,
            Some(DateTime::parse_from_rfc3339("2024-03-02T10:15:00+01:00").unwrap())
        );
        assert_eq!(lines[1].revision, "0a1b2c3");
        assert_eq!(lines[1].author, "Bob");
    }

    #[test]
    fn test_svn_blame() {
        let (lines, warnings) = run(
            BlameFormat::svn().unwrap(),
            &[
                "    12      alice int main(void)",
                "     -          - local change",
                "garbage",
            ],
        );
        assert_eq!(warnings, 1);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].revision, "12");
        assert_eq!(lines[0].author, "alice");
        assert_eq!(lines[0].date, None);
        assert_eq!(lines[1].revision, "-");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(BlameFormat::new("(unclosed", None).is_err());
    }
}
