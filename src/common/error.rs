//! Error type shared by every layer

use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::CommandParameter;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the facade.
///
/// Tool-reported failures (a non-zero exit code the command's policy rejects) are
/// not errors: they come back as an unsuccessful `ScmResult`.
#[derive(Error, Debug)]
pub enum ScmError {
    /// The symbolic repository URL is malformed
    #[error("Invalid SCM URL: {message}")]
    InvalidUrl {
        /// The offending URL, if one was given at all
        url: Option<String>,
        /// What is wrong with it
        message: String,
    },

    /// No provider is registered under the requested id
    #[error("No such provider: '{provider}'")]
    NoSuchProvider {
        /// Requested provider id
        provider: String,
    },

    /// The provider rejected the provider-specific part of the URL
    #[error("Invalid repository for provider '{provider}': {message}")]
    InvalidProviderRepository {
        /// Provider id
        provider: String,
        /// Why the specific part was rejected
        message: String,
    },

    /// A parameter the command requires is absent
    #[error("Missing required parameter: {parameter}")]
    MissingParameter {
        /// The missing key
        parameter: CommandParameter,
    },

    /// A parameter is present but unusable (wrong type or value)
    #[error("Invalid value for parameter {parameter}: {message}")]
    InvalidParameter {
        /// The offending key
        parameter: CommandParameter,
        /// Why the value was rejected
        message: String,
    },

    /// The file set does not satisfy its invariants or the command's needs
    #[error("Invalid file set: {message}")]
    InvalidFileSet {
        /// What is wrong
        message: String,
        /// Offending path, if any
        path: Option<PathBuf>,
    },

    /// The provider has no implementation for the operation
    #[error("Command '{command}' is not supported by provider '{provider}'")]
    UnsupportedCommand {
        /// Provider id
        provider: String,
        /// Requested operation
        command: CommandKind,
    },

    /// The external tool could not be started or its output could not be read
    #[error("Failed to run '{command}': {message}")]
    ToolInvocation {
        /// Rendered command line
        command: String,
        /// What went wrong
        message: String,
        /// Underlying cause
        #[source]
        source: Option<std::io::Error>,
    },

    /// The tool output contradicts the expected working tree; nothing it says can be trusted
    #[error("Illegal state: {message}")]
    IllegalState {
        /// Description of the inconsistency
        message: String,
    },

    /// Settings could not be loaded or are inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What is wrong
        message: String,
        /// Settings file, if any
        path: Option<PathBuf>,
        /// Underlying cause
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A file system operation failed
    #[error("File system operation failed: {message}")]
    FileSystem {
        /// What was attempted
        message: String,
        /// Path involved, if any
        path: Option<PathBuf>,
        /// Underlying cause
        #[source]
        source: Option<std::io::Error>,
    },

    /// Result or settings (de)serialization failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// What was being (de)serialized
        message: String,
        /// Underlying cause
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ScmError {
    /// Create an invalid URL error
    pub fn invalid_url(url: Option<&str>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.map(str::to_string),
            message: message.into(),
        }
    }

    /// Create a no such provider error
    pub fn no_such_provider(provider: impl Into<String>) -> Self {
        Self::NoSuchProvider {
            provider: provider.into(),
        }
    }

    /// Create an invalid provider repository error
    pub fn invalid_provider_repository(
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidProviderRepository {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a missing parameter error
    pub fn missing_parameter(parameter: CommandParameter) -> Self {
        Self::MissingParameter { parameter }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: CommandParameter, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            message: message.into(),
        }
    }

    /// Create an invalid file set error
    pub fn invalid_file_set(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::InvalidFileSet {
            message: message.into(),
            path,
        }
    }

    /// Create an unsupported command error
    pub fn unsupported_command(provider: impl Into<String>, command: CommandKind) -> Self {
        Self::UnsupportedCommand {
            provider: provider.into(),
            command,
        }
    }

    /// Create a tool invocation error
    pub fn tool_invocation(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            command: command.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a tool invocation error caused by an I/O failure
    pub fn tool_invocation_with_source(
        command: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::ToolInvocation {
            command: command.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an illegal state error
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config {
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create a configuration error with its cause
    pub fn config_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            path,
            source: Some(Box::new(source)),
        }
    }

    /// Create a file system error with its cause
    pub fn filesystem_error_with_source(
        message: impl Into<String>,
        path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::FileSystem {
            message: message.into(),
            path,
            source: Some(source),
        }
    }

    /// Create a serialization error with its cause
    pub fn serialization_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error was raised before any external process was spawned
    /// because the request itself is unusable.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. }
                | Self::NoSuchProvider { .. }
                | Self::InvalidProviderRepository { .. }
                | Self::MissingParameter { .. }
                | Self::InvalidParameter { .. }
                | Self::InvalidFileSet { .. }
                | Self::UnsupportedCommand { .. }
                | Self::Config { .. }
        )
    }
}

impl From<std::io::Error> for ScmError {
    fn from(error: std::io::Error) -> Self {
        Self::filesystem_error_with_source("File system operation failed", None, error)
    }
}

impl From<serde_yaml::Error> for ScmError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::serialization_error_with_source("YAML serialization failed", error)
    }
}

impl From<serde_json::Error> for ScmError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization_error_with_source("JSON serialization failed", error)
    }
}
