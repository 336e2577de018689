//! File system access

pub mod settings_store;

pub use settings_store::{Settings, SettingsStore};
