//! Construction of the built-in providers from settings

use super::git_scm::{GitScm, GIT_PROVIDER_ID};
use super::scm_interface::ScmProvider;
use super::svn_scm::{SvnScm, SVN_PROVIDER_ID};
use crate::infrastructure::filesystem::settings_store::Settings;
use std::sync::Arc;

/// Factory for the built-in providers
pub struct ScmFactory;

impl ScmFactory {
    /// Ids of the built-in providers
    pub const BUILTIN_IDS: [&'static str; 2] = [GIT_PROVIDER_ID, SVN_PROVIDER_ID];

    /// Create a built-in provider with its default executable
    pub fn create_provider(id: &str) -> Option<Arc<dyn ScmProvider>> {
        Self::create_with_settings(id, &Settings::default())
    }

    /// Create a built-in provider honoring the executable and date format
    /// configured in `settings`
    pub fn create_with_settings(id: &str, settings: &Settings) -> Option<Arc<dyn ScmProvider>> {
        match id {
            GIT_PROVIDER_ID => {
                let git = match settings.executable(GIT_PROVIDER_ID) {
                    Some(executable) => GitScm::with_executable(executable),
                    None => GitScm::new(),
                };
                let provider: Arc<dyn ScmProvider> =
                    Arc::new(git.with_log_date_format(settings.changelog_date_format.clone()));
                Some(provider)
            }
            SVN_PROVIDER_ID => {
                let svn = match settings.executable(SVN_PROVIDER_ID) {
                    Some(executable) => SvnScm::with_executable(executable),
                    None => SvnScm::new(),
                };
                let provider: Arc<dyn ScmProvider> = Arc::new(svn);
                Some(provider)
            }
            _ => None,
        }
    }

    /// Ids of the given providers whose tools can be run on this machine
    pub async fn available_provider_ids(providers: &[Arc<dyn ScmProvider>]) -> Vec<String> {
        let mut available = Vec::new();

        for provider in providers {
            if provider.is_available().await {
                available.push(provider.id().to_string());
            }
        }

        available
    }
}
