//! Typed, keyed command parameters

use crate::common::error::ScmError;
use crate::common::result::{OptionExt, UniscmResult};
use crate::domain::value_objects::scm_version::ScmVersion;
use chrono::{DateTime, Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Named inputs a command may read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandParameter {
    /// Commit, tag or lock message
    Message,
    /// Name of the tag to create
    TagName,
    /// Name of the branch to create
    BranchName,
    /// Single file a command operates on (blame)
    File,
    /// Whether to descend into directories
    Recursive,
    /// Treat files as binary
    Binary,
    /// Version to operate on
    ScmVersion,
    /// Lower bound of a version range
    StartScmVersion,
    /// Upper bound of a version range
    EndScmVersion,
    /// Target directory for checkout or export
    OutputDirectory,
    /// Signing flag passed through to the tool
    SignOption,
    /// Lower bound of a date range
    StartDate,
    /// Upper bound of a date range
    EndDate,
    /// Number of days of history, counted back from now
    NumDays,
    /// Maximum number of records
    Limit,
    /// Ignore whitespace differences
    IgnoreWhitespace,
    /// Lock files while operating on them
    Lock,
    /// Override safety checks of the tool
    Force,
    /// Account name
    Username,
    /// Account password
    Password,
    /// Structured tag options
    ScmTagParameters,
    /// Structured branch options
    ScmBranchParameters,
    /// Sub-directory a command operates in
    Directory,
}

impl CommandParameter {
    /// Upper-case name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            CommandParameter::Message => "MESSAGE",
            CommandParameter::TagName => "TAG_NAME",
            CommandParameter::BranchName => "BRANCH_NAME",
            CommandParameter::File => "FILE",
            CommandParameter::Recursive => "RECURSIVE",
            CommandParameter::Binary => "BINARY",
            CommandParameter::ScmVersion => "SCM_VERSION",
            CommandParameter::StartScmVersion => "START_SCM_VERSION",
            CommandParameter::EndScmVersion => "END_SCM_VERSION",
            CommandParameter::OutputDirectory => "OUTPUT_DIRECTORY",
            CommandParameter::SignOption => "SIGN_OPTION",
            CommandParameter::StartDate => "START_DATE",
            CommandParameter::EndDate => "END_DATE",
            CommandParameter::NumDays => "NUM_DAYS",
            CommandParameter::Limit => "LIMIT",
            CommandParameter::IgnoreWhitespace => "IGNORE_WHITESPACE",
            CommandParameter::Lock => "LOCK",
            CommandParameter::Force => "FORCE",
            CommandParameter::Username => "USERNAME",
            CommandParameter::Password => "PASSWORD",
            CommandParameter::ScmTagParameters => "SCM_TAG_PARAMETERS",
            CommandParameter::ScmBranchParameters => "SCM_BRANCH_PARAMETERS",
            CommandParameter::Directory => "DIRECTORY",
        }
    }
}

impl fmt::Display for CommandParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for creating a tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagParameters {
    /// Annotation or commit message
    pub message: Option<String>,
    /// Create the tag directly in the remote repository
    pub remote: bool,
    /// Pin externals to their current revision (svn)
    pub pin_externals: bool,
}

impl TagParameters {
    /// Tag options with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Options for creating a branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchParameters {
    /// Commit message
    pub message: Option<String>,
    /// Create the branch directly in the remote repository
    pub remote: bool,
}

/// Value stored under a [`CommandParameter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    /// Free text
    Text(String),
    /// Boolean flag
    Flag(bool),
    /// Integer
    Integer(i64),
    /// Point in time
    Date(DateTime<FixedOffset>),
    /// File system path
    Path(PathBuf),
    /// History position
    Version(ScmVersion),
    /// Structured tag options
    Tag(TagParameters),
    /// Structured branch options
    Branch(BranchParameters),
}

impl ParameterValue {
    fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Text(_) => "text",
            ParameterValue::Flag(_) => "flag",
            ParameterValue::Integer(_) => "integer",
            ParameterValue::Date(_) => "date",
            ParameterValue::Path(_) => "path",
            ParameterValue::Version(_) => "version",
            ParameterValue::Tag(_) => "tag parameters",
            ParameterValue::Branch(_) => "branch parameters",
        }
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Flag(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Integer(value)
    }
}

impl From<DateTime<FixedOffset>> for ParameterValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        ParameterValue::Date(value)
    }
}

impl From<PathBuf> for ParameterValue {
    fn from(value: PathBuf) -> Self {
        ParameterValue::Path(value)
    }
}

impl From<ScmVersion> for ParameterValue {
    fn from(value: ScmVersion) -> Self {
        ParameterValue::Version(value)
    }
}

impl From<TagParameters> for ParameterValue {
    fn from(value: TagParameters) -> Self {
        ParameterValue::Tag(value)
    }
}

impl From<BranchParameters> for ParameterValue {
    fn from(value: BranchParameters) -> Self {
        ParameterValue::Branch(value)
    }
}

/// Typed bag of named command inputs
///
/// Required getters fail with [`ScmError::MissingParameter`] when the key is
/// absent; `*_or` getters fall back to the given default. A present value of the
/// wrong type always fails with [`ScmError::InvalidParameter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandParameters {
    values: BTreeMap<CommandParameter, ParameterValue>,
}

impl CommandParameters {
    /// Create an empty parameter bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: CommandParameter, value: impl Into<ParameterValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style insert of an optional value; `None` leaves the bag untouched
    pub fn with_optional<V: Into<ParameterValue>>(
        mut self,
        key: CommandParameter,
        value: Option<V>,
    ) -> Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    /// Insert or replace a value
    pub fn set(&mut self, key: CommandParameter, value: impl Into<ParameterValue>) {
        self.values.insert(key, value.into());
    }

    /// Remove a value
    pub fn remove(&mut self, key: CommandParameter) -> Option<ParameterValue> {
        self.values.remove(&key)
    }

    /// Raw access
    pub fn get(&self, key: CommandParameter) -> Option<&ParameterValue> {
        self.values.get(&key)
    }

    /// Whether the key is present
    pub fn contains(&self, key: CommandParameter) -> bool {
        self.values.contains_key(&key)
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no value is stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over stored values in key order
    pub fn iter(&self) -> impl Iterator<Item = (&CommandParameter, &ParameterValue)> {
        self.values.iter()
    }

    fn typed<'a, T>(
        &'a self,
        key: CommandParameter,
        expected: &str,
        extract: impl Fn(&'a ParameterValue) -> Option<T>,
    ) -> UniscmResult<Option<T>> {
        match self.values.get(&key) {
            None => Ok(None),
            Some(value) => extract(value).map(Some).ok_or_else(|| {
                ScmError::invalid_parameter(
                    key,
                    format!("expected {}, found {}", expected, value.type_name()),
                )
            }),
        }
    }

    /// Optional text value
    pub fn optional_string(&self, key: CommandParameter) -> UniscmResult<Option<&str>> {
        self.typed(key, "text", |value| match value {
            ParameterValue::Text(text) => Some(text.as_str()),
            _ => None,
        })
    }

    /// Required text value
    pub fn string(&self, key: CommandParameter) -> UniscmResult<&str> {
        self.optional_string(key)?.ok_or_missing_parameter(key)
    }

    /// Text value with a default
    pub fn string_or<'a>(&'a self, key: CommandParameter, default: &'a str) -> UniscmResult<&'a str> {
        Ok(self.optional_string(key)?.unwrap_or(default))
    }

    /// Optional flag value
    pub fn optional_bool(&self, key: CommandParameter) -> UniscmResult<Option<bool>> {
        self.typed(key, "flag", |value| match value {
            ParameterValue::Flag(flag) => Some(*flag),
            _ => None,
        })
    }

    /// Required flag value
    pub fn boolean(&self, key: CommandParameter) -> UniscmResult<bool> {
        self.optional_bool(key)?.ok_or_missing_parameter(key)
    }

    /// Flag value with a default
    pub fn boolean_or(&self, key: CommandParameter, default: bool) -> UniscmResult<bool> {
        Ok(self.optional_bool(key)?.unwrap_or(default))
    }

    /// Optional integer value
    pub fn optional_integer(&self, key: CommandParameter) -> UniscmResult<Option<i64>> {
        self.typed(key, "integer", |value| match value {
            ParameterValue::Integer(number) => Some(*number),
            _ => None,
        })
    }

    /// Integer value with a default
    pub fn integer_or(&self, key: CommandParameter, default: i64) -> UniscmResult<i64> {
        Ok(self.optional_integer(key)?.unwrap_or(default))
    }

    /// Optional date value
    pub fn optional_date(
        &self,
        key: CommandParameter,
    ) -> UniscmResult<Option<DateTime<FixedOffset>>> {
        self.typed(key, "date", |value| match value {
            ParameterValue::Date(date) => Some(*date),
            _ => None,
        })
    }

    /// Optional path value
    pub fn optional_path(&self, key: CommandParameter) -> UniscmResult<Option<&Path>> {
        self.typed(key, "path", |value| match value {
            ParameterValue::Path(path) => Some(path.as_path()),
            _ => None,
        })
    }

    /// Optional version value
    pub fn optional_version(&self, key: CommandParameter) -> UniscmResult<Option<&ScmVersion>> {
        self.typed(key, "version", |value| match value {
            ParameterValue::Version(version) => Some(version),
            _ => None,
        })
    }

    /// Date range of a change log query
    ///
    /// The lower bound is `START_DATE`, or `NUM_DAYS` days before `now` when no
    /// start date is given. The upper bound is `END_DATE`.
    pub fn date_range(
        &self,
        now: DateTime<FixedOffset>,
    ) -> UniscmResult<(Option<DateTime<FixedOffset>>, Option<DateTime<FixedOffset>>)> {
        let start = match self.optional_date(CommandParameter::StartDate)? {
            Some(start) => Some(start),
            None => match self.optional_integer(CommandParameter::NumDays)? {
                Some(days) if days < 0 => {
                    return Err(ScmError::invalid_parameter(
                        CommandParameter::NumDays,
                        format!("must not be negative, got {}", days),
                    ))
                }
                Some(days) => Some(now - Duration::days(days)),
                None => None,
            },
        };
        Ok((start, self.optional_date(CommandParameter::EndDate)?))
    }

    /// Tag options, defaulting to empty options
    pub fn tag_parameters(&self) -> UniscmResult<TagParameters> {
        let parameters = self.typed(CommandParameter::ScmTagParameters, "tag parameters", |value| {
            match value {
                ParameterValue::Tag(parameters) => Some(parameters.clone()),
                _ => None,
            }
        })?;
        Ok(parameters.unwrap_or_default())
    }

    /// Branch options, defaulting to empty options
    pub fn branch_parameters(&self) -> UniscmResult<BranchParameters> {
        let parameters = self.typed(
            CommandParameter::ScmBranchParameters,
            "branch parameters",
            |value| match value {
                ParameterValue::Branch(parameters) => Some(parameters.clone()),
                _ => None,
            },
        )?;
        Ok(parameters.unwrap_or_default())
    }
}
