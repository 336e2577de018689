//! Result alias over [`ScmError`](crate::common::error::ScmError)

use crate::common::error::ScmError;
use crate::domain::value_objects::command_parameters::CommandParameter;

/// Result alias used across the crate
///
/// # Examples
///
/// ```
/// use uniscm::common::result::UniscmResult;
/// use uniscm::common::error::ScmError;
///
/// fn example_function() -> UniscmResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> UniscmResult<()> {
///     Err(ScmError::illegal_state("Something went wrong"))
/// }
/// ```
pub type UniscmResult<T> = Result<T, ScmError>;

/// Conversion helpers from `Option` to [`UniscmResult`]
pub trait OptionExt<T> {
    /// Convert `None` into the given error
    ///
    /// # Examples
    ///
    /// ```
    /// use uniscm::common::result::{UniscmResult, OptionExt};
    /// use uniscm::common::error::ScmError;
    ///
    /// let none_value: Option<String> = None;
    /// let result: UniscmResult<String> = none_value.ok_or_scm(
    ///     ScmError::illegal_state("Value not found")
    /// );
    /// assert!(result.is_err());
    /// ```
    fn ok_or_scm(self, error: ScmError) -> UniscmResult<T>;

    /// Convert `None` into a missing parameter error for `parameter`
    fn ok_or_missing_parameter(self, parameter: CommandParameter) -> UniscmResult<T>;

    /// Convert `None` into an illegal state error
    fn ok_or_illegal_state(self, message: impl Into<String>) -> UniscmResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_scm(self, error: ScmError) -> UniscmResult<T> {
        self.ok_or(error)
    }

    fn ok_or_missing_parameter(self, parameter: CommandParameter) -> UniscmResult<T> {
        self.ok_or_else(|| ScmError::missing_parameter(parameter))
    }

    fn ok_or_illegal_state(self, message: impl Into<String>) -> UniscmResult<T> {
        self.ok_or_else(|| ScmError::illegal_state(message))
    }
}

/// Conversion helpers from foreign `Result`s to [`UniscmResult`]
pub trait ResultExt<T, E> {
    /// Map the error as a file system failure on `path`
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> UniscmResult<T>
    where
        E: Into<std::io::Error>;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn with_filesystem_error(
        self,
        message: impl Into<String>,
        path: Option<std::path::PathBuf>,
    ) -> UniscmResult<T>
    where
        E: Into<std::io::Error>,
    {
        self.map_err(|e| {
            let io_error = e.into();
            ScmError::filesystem_error_with_source(message, path, io_error)
        })
    }
}
