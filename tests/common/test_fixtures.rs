//! Test fixtures for creating test data
//!
//! Working copies on disk, managers wired to scripted executors and a
//! warning counter for consumer tests.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;
use uniscm::application::services::provider_registry::ProviderRegistry;
use uniscm::application::services::scm_manager::ScmManager;

use super::mock_services::{DemoProvider, ScriptedExecutor};

/// A temporary working copy populated with files
pub struct WorkingCopyFixture {
    pub temp_dir: TempDir,
}

impl WorkingCopyFixture {
    /// Empty working copy
    pub fn empty() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Working copy holding `files` (relative paths, parents created)
    pub fn with_files(files: &[&str]) -> Self {
        let fixture = Self::empty();
        for file in files {
            let path = fixture.path().join(file);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("Failed to create parent directory");
            }
            fs::write(&path, format!("content of {}\n", file)).expect("Failed to write file");
        }
        fixture
    }

    /// Base directory
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// `scm:demo:<path>:trunk`
    pub fn demo_url(&self) -> String {
        format!("scm:demo:{}:trunk", self.path().display())
    }
}

/// Manager with the built-in providers plus `demo`, running tools through `executor`
pub fn demo_manager(executor: &ScriptedExecutor) -> ScmManager {
    let mut registry = ProviderRegistry::with_builtin_providers();
    registry.register("demo", || Arc::new(DemoProvider));
    ScmManager::new(registry, Arc::new(executor.clone()))
}

#[derive(Clone, Default)]
struct WarningCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarningCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Run `f` on this thread and count the warnings it logs
pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let counter = WarningCounter::default();
    let subscriber = Registry::default().with(counter.clone());
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, counter.0.load(Ordering::SeqCst))
}
