//! Provider lookup by id

use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::infrastructure::filesystem::settings_store::Settings;
use crate::infrastructure::scm::scm_factory::ScmFactory;
use crate::infrastructure::scm::scm_interface::ScmProvider;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Creates a provider instance on resolution
pub type ProviderFactory = Arc<dyn Fn() -> Arc<dyn ScmProvider> + Send + Sync>;

/// Provider id → factory
///
/// Registries are plain values: each manager owns its own and several may
/// coexist in one process.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `git` and `svn` providers
    pub fn with_builtin_providers() -> Self {
        Self::with_settings(&Settings::default())
    }

    /// Registry holding the built-in providers configured from `settings`
    pub fn with_settings(settings: &Settings) -> Self {
        let mut registry = Self::new();
        for id in ScmFactory::BUILTIN_IDS {
            if let Some(provider) = ScmFactory::create_with_settings(id, settings) {
                registry.register_provider(provider);
            }
        }
        registry
    }

    /// Register `factory` under `id`, replacing any previous registration
    pub fn register<F>(&mut self, id: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn ScmProvider> + Send + Sync + 'static,
    {
        let id = id.into();
        if self.factories.contains_key(&id) {
            debug!("Replacing provider registration for '{}'", id);
        } else {
            debug!("Registering provider '{}'", id);
        }
        self.factories.insert(id, Arc::new(factory));
    }

    /// Register a shared provider instance under its own id
    pub fn register_provider(&mut self, provider: Arc<dyn ScmProvider>) {
        let id = provider.id().to_string();
        self.register(id, move || Arc::clone(&provider));
    }

    /// Remove the registration for `id`
    pub fn unregister(&mut self, id: &str) -> bool {
        self.factories.remove(id).is_some()
    }

    /// Provider registered under `id`
    pub fn resolve(&self, id: &str) -> UniscmResult<Arc<dyn ScmProvider>> {
        self.factories
            .get(id)
            .map(|factory| factory())
            .ok_or_else(|| ScmError::no_such_provider(id))
    }

    /// Whether `id` is registered
    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.factories.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Fresh instance of every registered provider, sorted by id
    pub fn providers(&self) -> Vec<Arc<dyn ScmProvider>> {
        self.ids()
            .iter()
            .filter_map(|id| self.factories.get(id).map(|factory| factory()))
            .collect()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("ids", &self.ids())
            .finish()
    }
}
