//! # uniscm - Uniform SCM Facade
//!
//! `uniscm` lets callers issue abstract version-control operations (add, status,
//! diff, tag, blame, changelog, ...) against a symbolic repository URL such as
//! `scm:git:https://example.com/project.git`. The facade resolves the URL to a
//! registered provider, runs the provider's command line tool, and parses the tool
//! output into a small canonical result model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uniscm::application::services::scm_manager::ScmManager;
//! use uniscm::domain::entities::scm_file::ScmFileSet;
//! use uniscm::domain::value_objects::CommandParameters;
//!
//! # async fn example() -> uniscm::Result<()> {
//! let manager = ScmManager::with_builtin_providers();
//! let repository = manager.make_scm_repository("scm:git:https://example.com/project.git")?;
//! let file_set = ScmFileSet::new(".", Vec::<String>::new())?;
//!
//! let status = manager
//!     .status(&repository, &file_set, &CommandParameters::new())
//!     .await?;
//! for file in &status.changed_files {
//!     println!("{} {}", file.status, file.path);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`domain`]: Files, statuses, parameters, repositories and result types
//! - [`application`]: Provider registry, parameter validation, command dispatch
//!   and the [`application::services::scm_manager::ScmManager`] facade
//! - [`infrastructure`]: Process execution, output consumers (parsers), the
//!   built-in `git` and `svn` providers and settings storage
//! - [`presentation`]: The `uniscm` command line interface
//! - [`common`]: Error type and result helpers
//!
//! ## Output Consumers
//!
//! Every command invocation owns exactly one consumer, fed with the tool's
//! standard output one line at a time. Unexpected lines are logged through
//! `tracing` and skipped; the only fatal parse condition is a directory report
//! that falls outside the working copy.

// Documentation attributes
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod application;
pub mod common;
pub mod domain;
pub mod infrastructure;
pub mod presentation;

// Re-export commonly used types for convenience
pub use crate::common::error::ScmError;
pub use crate::common::result::UniscmResult as Result;
