//! The facade: URL resolution plus one entry point per operation

use super::command_dispatcher::CommandDispatcher;
use super::provider_registry::ProviderRegistry;
use crate::common::error::ScmError;
use crate::common::result::UniscmResult;
use crate::domain::entities::scm_file::ScmFileSet;
use crate::domain::entities::scm_repository::ScmRepository;
use crate::domain::entities::scm_result::*;
use crate::domain::value_objects::command_kind::CommandKind;
use crate::domain::value_objects::command_parameters::CommandParameters;
use crate::domain::value_objects::scm_url::ScmUrl;
use crate::infrastructure::filesystem::settings_store::Settings;
use crate::infrastructure::process::command_executor::ProcessExecutor;
use crate::infrastructure::scm::scm_factory::ScmFactory;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Entry point of the facade: URL → repository → provider → command → result
#[derive(Debug, Clone, Default)]
pub struct ScmManager {
    registry: ProviderRegistry,
    dispatcher: CommandDispatcher,
}

impl ScmManager {
    /// Manager over `registry` running tools through `executor`
    pub fn new(registry: ProviderRegistry, executor: Arc<dyn ProcessExecutor>) -> Self {
        Self {
            registry,
            dispatcher: CommandDispatcher::new(executor),
        }
    }

    /// Manager with the built-in providers and the default executor
    pub fn with_builtin_providers() -> Self {
        Self {
            registry: ProviderRegistry::with_builtin_providers(),
            dispatcher: CommandDispatcher::default(),
        }
    }

    /// Manager with the built-in providers configured from `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            registry: ProviderRegistry::with_settings(settings),
            dispatcher: CommandDispatcher::default()
                .with_environment(settings.environment.clone()),
        }
    }

    /// Replace the dispatcher's default environment
    pub fn with_environment(
        mut self,
        environment: BTreeMap<String, String>,
    ) -> Self {
        self.dispatcher = self.dispatcher.with_environment(environment);
        self
    }

    /// Registered providers
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Registered providers, for adding or replacing registrations
    pub fn registry_mut(&mut self) -> &mut ProviderRegistry {
        &mut self.registry
    }

    /// Resolve `url` into a repository; the provider parses its specific part once
    pub fn make_scm_repository(&self, url: &str) -> UniscmResult<ScmRepository> {
        let scm_url =
            ScmUrl::parse(url).map_err(|e| ScmError::invalid_url(Some(url), e.to_string()))?;
        let provider = self.registry.resolve(scm_url.provider())?;
        let provider_repository =
            provider.make_provider_repository(scm_url.specific_part(), scm_url.delimiter())?;
        debug!("Resolved {} to {}", url, provider_repository);
        Ok(ScmRepository::new(&scm_url, provider_repository))
    }

    /// Problems with `url`; empty when it resolves
    pub fn validate_scm_repository(&self, url: &str) -> Vec<String> {
        let scm_url = match ScmUrl::parse(url) {
            Ok(scm_url) => scm_url,
            Err(e) => return vec![e.to_string()],
        };
        match self.registry.resolve(scm_url.provider()) {
            Ok(provider) => {
                provider.validate_specific_part(scm_url.specific_part(), scm_url.delimiter())
            }
            Err(e) => vec![e.to_string()],
        }
    }

    /// Id of the registered provider whose metadata directory marks `path` as a working copy
    pub fn detect_provider(&self, path: &Path) -> Option<String> {
        self.registry
            .providers()
            .into_iter()
            .find(|provider| {
                provider
                    .metadata_dir()
                    .map(|dir| path.join(dir).exists())
                    .unwrap_or(false)
            })
            .map(|provider| provider.id().to_string())
    }

    /// Ids of registered providers whose tools can be run on this machine
    pub async fn available_providers(&self) -> Vec<String> {
        ScmFactory::available_provider_ids(&self.registry.providers()).await
    }

    /// Run `kind` against `repository` and return the untyped result
    pub async fn execute(
        &self,
        kind: CommandKind,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<CommandResult> {
        let provider = self.registry.resolve(repository.provider_id())?;
        self.dispatcher
            .dispatch(provider.as_ref(), kind, repository, file_set, parameters)
            .await
    }

    async fn typed<T: From<CommandResult>>(
        &self,
        kind: CommandKind,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<T> {
        self.execute(kind, repository, file_set, parameters)
            .await
            .map(T::from)
    }

    /// Schedule files for addition
    pub async fn add(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<AddScmResult> {
        self.typed(CommandKind::Add, repository, file_set, parameters)
            .await
    }

    /// Schedule files for removal
    pub async fn remove(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<RemoveScmResult> {
        self.typed(CommandKind::Remove, repository, file_set, parameters)
            .await
    }

    /// Working copy changes
    pub async fn status(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<StatusScmResult> {
        self.typed(CommandKind::Status, repository, file_set, parameters)
            .await
    }

    /// Differences between versions or against the working copy
    pub async fn diff(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<DiffScmResult> {
        self.typed(CommandKind::Diff, repository, file_set, parameters)
            .await
    }

    /// Create the tag named by `TAG_NAME`
    pub async fn tag(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<TagScmResult> {
        self.typed(CommandKind::Tag, repository, file_set, parameters)
            .await
    }

    /// Create the branch named by `BRANCH_NAME`
    pub async fn branch(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<BranchScmResult> {
        self.typed(CommandKind::Branch, repository, file_set, parameters)
            .await
    }

    /// Create a working copy
    pub async fn check_out(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<CheckOutScmResult> {
        self.typed(CommandKind::CheckOut, repository, file_set, parameters)
            .await
    }

    /// Commit changes with `MESSAGE`
    pub async fn check_in(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<CheckInScmResult> {
        self.typed(CommandKind::CheckIn, repository, file_set, parameters)
            .await
    }

    /// Bring the working copy up to date
    pub async fn update(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<UpdateScmResult> {
        self.typed(CommandKind::Update, repository, file_set, parameters)
            .await
    }

    /// Write an unversioned copy
    pub async fn export(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<ExportScmResult> {
        self.typed(CommandKind::Export, repository, file_set, parameters)
            .await
    }

    /// Versioned files under the listed paths
    pub async fn list(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<ListScmResult> {
        self.typed(CommandKind::List, repository, file_set, parameters)
            .await
    }

    /// Per-line authorship of one file
    pub async fn blame(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<BlameScmResult> {
        self.typed(CommandKind::Blame, repository, file_set, parameters)
            .await
    }

    /// History grouped into change sets
    pub async fn change_log(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<ChangeLogScmResult> {
        self.typed(CommandKind::ChangeLog, repository, file_set, parameters)
            .await
    }

    /// Take locks on files
    pub async fn lock(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<LockScmResult> {
        self.typed(CommandKind::Lock, repository, file_set, parameters)
            .await
    }

    /// Release locks on files
    pub async fn unlock(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<UnlockScmResult> {
        self.typed(CommandKind::Unlock, repository, file_set, parameters)
            .await
    }

    /// Open files for editing
    pub async fn edit(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<EditScmResult> {
        self.typed(CommandKind::Edit, repository, file_set, parameters)
            .await
    }

    /// Revert files opened for editing
    pub async fn unedit(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<UneditScmResult> {
        self.typed(CommandKind::Unedit, repository, file_set, parameters)
            .await
    }

    /// Authenticate against the repository
    pub async fn login(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<LoginScmResult> {
        self.typed(CommandKind::Login, repository, file_set, parameters)
            .await
    }

    /// Create directories in the repository
    pub async fn mkdir(
        &self,
        repository: &ScmRepository,
        file_set: &ScmFileSet,
        parameters: &CommandParameters,
    ) -> UniscmResult<MkdirScmResult> {
        self.typed(CommandKind::Mkdir, repository, file_set, parameters)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_make_scm_repository() {
        let manager = ScmManager::with_builtin_providers();
        let repository = manager
            .make_scm_repository("scm:git|https://example.com/project.git")
            .unwrap();
        assert_eq!(repository.provider_id(), "git");
        assert_eq!(repository.delimiter(), '|');
        assert_eq!(
            repository.provider_repository().host.as_deref(),
            Some("example.com")
        );
    }

    #[test]
    fn test_make_scm_repository_errors() {
        let manager = ScmManager::with_builtin_providers();
        assert!(matches!(
            manager.make_scm_repository("scm").unwrap_err(),
            ScmError::InvalidUrl { .. }
        ));
        assert!(matches!(
            manager.make_scm_repository("scm:cvs:/cvsroot").unwrap_err(),
            ScmError::NoSuchProvider { .. }
        ));
        assert!(matches!(
            manager.make_scm_repository("scm:svn:").unwrap_err(),
            ScmError::InvalidProviderRepository { .. }
        ));
    }

    #[test]
    fn test_detect_provider() {
        let manager = ScmManager::with_builtin_providers();
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(manager.detect_provider(temp_dir.path()), None);

        std::fs::create_dir(temp_dir.path().join(".svn")).unwrap();
        assert_eq!(
            manager.detect_provider(temp_dir.path()).as_deref(),
            Some("svn")
        );

        std::fs::write(temp_dir.path().join(".git"), "gitdir: ../elsewhere\n").unwrap();
        assert_eq!(
            manager.detect_provider(temp_dir.path()).as_deref(),
            Some("git")
        );
    }

    #[test]
    fn test_validate_scm_repository() {
        let manager = ScmManager::with_builtin_providers();
        assert!(manager
            .validate_scm_repository("scm:svn:https://svn.example.com/repo/trunk")
            .is_empty());
        assert_eq!(manager.validate_scm_repository("scm:a-").len(), 1);
        assert_eq!(manager.validate_scm_repository("scm:hg:/repo").len(), 1);
        assert_eq!(manager.validate_scm_repository("scm:svn:/local").len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_operation() {
        let manager = ScmManager::with_builtin_providers();
        let repository = manager
            .make_scm_repository("scm:git:https://example.com/project.git")
            .unwrap();
        let error = manager
            .edit(&repository, &ScmFileSet::whole("/work"), &CommandParameters::new())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ScmError::UnsupportedCommand { command: CommandKind::Edit, .. }
        ));
    }
}
