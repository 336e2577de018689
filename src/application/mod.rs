/// Application layer
///
/// Wires providers, validation and process execution into the
/// [`services::scm_manager::ScmManager`] facade.
pub mod services;
