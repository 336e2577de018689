//! Application services

pub mod command_dispatcher;
pub mod parameter_validation;
pub mod provider_registry;
pub mod scm_manager;

pub use command_dispatcher::CommandDispatcher;
pub use parameter_validation::validate_request;
pub use provider_registry::{ProviderFactory, ProviderRegistry};
pub use scm_manager::ScmManager;
