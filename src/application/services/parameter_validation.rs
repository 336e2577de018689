//! Checks run on command parameters before dispatch

use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::ScmFileSet;
use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::{CommandParameter, CommandParameters};
use chrono::Utc;

/// Message used by Remove when the caller gives none
pub const DEFAULT_REMOVE_MESSAGE: &str = "Removed by uniscm";

/// Check the inputs shared by every provider's implementation of `kind` and
/// return the parameters with declared defaults filled in.
///
/// Runs before any invocation is built, so a failure here never spawns a process.
pub fn validate_request(
    kind: CommandKind,
    file_set: &ScmFileSet,
    parameters: &CommandParameters,
) -> UniscmResult<CommandParameters> {
    let mut parameters = parameters.clone();

    match kind {
        CommandKind::List | CommandKind::Mkdir => {
            if file_set.is_empty() {
                return Err(ScmError::invalid_file_set(
                    format!("{} needs at least one file", kind),
                    Some(file_set.base_directory().to_path_buf()),
                ));
            }
        }
        CommandKind::Tag => {
            require_non_empty(&parameters, CommandParameter::TagName)?;
            parameters.tag_parameters()?;
        }
        CommandKind::Branch => {
            require_non_empty(&parameters, CommandParameter::BranchName)?;
            parameters.branch_parameters()?;
        }
        CommandKind::CheckIn => {
            require_non_empty(&parameters, CommandParameter::Message)?;
        }
        CommandKind::Remove => {
            let message = parameters
                .string_or(CommandParameter::Message, DEFAULT_REMOVE_MESSAGE)?
                .to_string();
            parameters.set(CommandParameter::Message, message);
        }
        CommandKind::Blame => {
            if file_set.len() > 1 {
                return Err(ScmError::invalid_file_set(
                    format!("blame takes exactly one file, got {}", file_set.len()),
                    None,
                ));
            }
            match (parameters.optional_string(CommandParameter::File)?, file_set.files().first()) {
                (Some(_), None) => {}
                (Some(file), Some(listed)) => {
                    if ScmFileSet::new(file_set.base_directory(), [file])?.files().first()
                        != Some(listed)
                    {
                        return Err(ScmError::invalid_parameter(
                            CommandParameter::File,
                            format!("'{}' is not the file in the file set", file),
                        ));
                    }
                }
                (None, Some(_)) => {
                    let file = file_set.relative_paths().remove(0);
                    parameters.set(CommandParameter::File, file);
                }
                (None, None) => return Err(ScmError::missing_parameter(CommandParameter::File)),
            }
        }
        CommandKind::ChangeLog => {
            let (start, end) = parameters.date_range(Utc::now().fixed_offset())?;
            if let (Some(start), Some(end)) = (start, end) {
                if start > end {
                    return Err(ScmError::invalid_parameter(
                        CommandParameter::StartDate,
                        format!("start date {} is after end date {}", start, end),
                    ));
                }
            }
            if let Some(limit) = parameters.optional_integer(CommandParameter::Limit)? {
                if limit <= 0 {
                    return Err(ScmError::invalid_parameter(
                        CommandParameter::Limit,
                        format!("must be positive, got {}", limit),
                    ));
                }
            }
        }
        _ => {}
    }

    Ok(parameters)
}

fn require_non_empty(parameters: &CommandParameters, key: CommandParameter) -> UniscmResult<()> {
    if parameters.string(key)?.trim().is_empty() {
        return Err(ScmError::invalid_parameter(key, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn whole() -> ScmFileSet {
        ScmFileSet::whole("/work")
    }

    #[test]
    fn test_list_requires_files() {
        let error = validate_request(CommandKind::List, &whole(), &CommandParameters::new())
            .unwrap_err();
        assert!(matches!(error, ScmError::InvalidFileSet { .. }));

        let file_set = ScmFileSet::new("/work", ["a.txt"]).unwrap();
        assert!(validate_request(CommandKind::List, &file_set, &CommandParameters::new()).is_ok());
        assert!(validate_request(CommandKind::Mkdir, &whole(), &CommandParameters::new()).is_err());
    }

    #[test]
    fn test_required_names_and_messages() {
        let empty = CommandParameters::new();
        for (kind, key) in [
            (CommandKind::Tag, CommandParameter::TagName),
            (CommandKind::Branch, CommandParameter::BranchName),
            (CommandKind::CheckIn, CommandParameter::Message),
        ] {
            let error = validate_request(kind, &whole(), &empty).unwrap_err();
            assert!(
                matches!(error, ScmError::MissingParameter { parameter } if parameter == key),
                "{} should require {}",
                kind,
                key
            );
        }

        let blank = CommandParameters::new().with(CommandParameter::TagName, "  ");
        assert!(matches!(
            validate_request(CommandKind::Tag, &whole(), &blank).unwrap_err(),
            ScmError::InvalidParameter { .. }
        ));
    }

    #[test]
    fn test_remove_message_default() {
        let validated =
            validate_request(CommandKind::Remove, &whole(), &CommandParameters::new()).unwrap();
        assert_eq!(
            validated.string(CommandParameter::Message).unwrap(),
            DEFAULT_REMOVE_MESSAGE
        );

        let given = CommandParameters::new().with(CommandParameter::Message, "cleanup");
        let validated = validate_request(CommandKind::Remove, &whole(), &given).unwrap();
        assert_eq!(validated.string(CommandParameter::Message).unwrap(), "cleanup");

        let wrong_type = CommandParameters::new().with(CommandParameter::Message, true);
        assert!(validate_request(CommandKind::Remove, &whole(), &wrong_type).is_err());
    }

    #[test]
    fn test_blame_takes_one_file() {
        let one = ScmFileSet::new("/work", ["src/main.rs"]).unwrap();
        let validated = validate_request(CommandKind::Blame, &one, &CommandParameters::new()).unwrap();
        assert_eq!(validated.string(CommandParameter::File).unwrap(), "src/main.rs");

        let two = ScmFileSet::new("/work", ["a", "b"]).unwrap();
        assert!(validate_request(CommandKind::Blame, &two, &CommandParameters::new()).is_err());

        let error = validate_request(CommandKind::Blame, &whole(), &CommandParameters::new())
            .unwrap_err();
        assert!(matches!(error, ScmError::MissingParameter { .. }));

        let by_parameter = CommandParameters::new().with(CommandParameter::File, "README");
        assert!(validate_request(CommandKind::Blame, &whole(), &by_parameter).is_ok());

        let mismatch = CommandParameters::new().with(CommandParameter::File, "other.rs");
        assert!(validate_request(CommandKind::Blame, &one, &mismatch).is_err());
    }

    #[test]
    fn test_change_log_range_and_limit() {
        let start = DateTime::parse_from_rfc3339("2024-02-01T00:00:00Z").unwrap();
        let end = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let reversed = CommandParameters::new()
            .with(CommandParameter::StartDate, start)
            .with(CommandParameter::EndDate, end);
        assert!(validate_request(CommandKind::ChangeLog, &whole(), &reversed).is_err());

        let zero_limit = CommandParameters::new().with(CommandParameter::Limit, 0i64);
        assert!(validate_request(CommandKind::ChangeLog, &whole(), &zero_limit).is_err());

        let fine = CommandParameters::new()
            .with(CommandParameter::NumDays, 30i64)
            .with(CommandParameter::Limit, 20i64);
        assert!(validate_request(CommandKind::ChangeLog, &whole(), &fine).is_ok());
    }

    #[test]
    fn test_other_commands_pass_through() {
        let parameters = CommandParameters::new().with(CommandParameter::Force, true);
        let validated = validate_request(CommandKind::Status, &whole(), &parameters).unwrap();
        assert_eq!(validated, parameters);
    }
}
