//! Mock services for testing
//!
//! [`ScriptedExecutor`] stands in for the external tool, [`DemoProvider`] is a
//! minimal backend registered under the id `demo`.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uniscm::common::error::ScmError;
use uniscm::common::result::UniscmResult;
use uniscm::domain::entities::scm_repository::ProviderRepository;
use uniscm::domain::value_objects::command_kind::CommandKind;
use uniscm::domain::value_objects::scm_file_status::ScmFileStatus;
use uniscm::infrastructure::consumers::{
    MarkerEntryConsumer, MarkerEntryFormat, OutputConsumer, StatusLineConsumer, StatusLineFormat,
};
use uniscm::infrastructure::process::command_executor::{
    Invocation, ProcessExecutor, ProcessOutput,
};
use uniscm::infrastructure::scm::scm_interface::{CommandRequest, ScmCommand, ScmProvider};

type Script = dyn Fn(&Invocation) -> ProcessOutput + Send + Sync;

/// Executor answering every invocation from a script and recording it
#[derive(Clone)]
pub struct ScriptedExecutor {
    script: Arc<Script>,
    calls: Arc<Mutex<Vec<Invocation>>>,
    yields: Arc<Mutex<VecDeque<usize>>>,
}

impl ScriptedExecutor {
    /// Answer with the output `script` computes for each invocation
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&Invocation) -> ProcessOutput + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            calls: Arc::new(Mutex::new(Vec::new())),
            yields: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Yield `schedule[n]` times before answering the n-th invocation; once after that
    pub fn with_yield_schedule(mut self, schedule: Vec<usize>) -> Self {
        self.yields = Arc::new(Mutex::new(schedule.into()));
        self
    }

    /// Answer every invocation with the same output
    pub fn always(exit_code: i32, stdout: &str, stderr: &str) -> Self {
        let output = ProcessOutput::from_text(exit_code, stdout, stderr);
        Self::new(move |_| output.clone())
    }

    /// Invocations received so far
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessExecutor for ScriptedExecutor {
    async fn execute(&self, invocation: &Invocation) -> UniscmResult<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        // Yield so concurrent dispatches really interleave
        let yields = self.yields.lock().unwrap().pop_front().unwrap_or(1);
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        Ok((self.script)(invocation))
    }
}

/// Backend with a `demo` tool that supports status, lock and unlock
///
/// Specific part: `<path>[<delimiter><module>]`.
#[derive(Debug, Default)]
pub struct DemoProvider;

#[async_trait]
impl ScmProvider for DemoProvider {
    fn id(&self) -> &str {
        "demo"
    }

    fn make_provider_repository(
        &self,
        specific_part: &str,
        delimiter: char,
    ) -> UniscmResult<ProviderRepository> {
        let mut parts = specific_part.splitn(2, delimiter);
        let path = parts.next().unwrap_or_default();
        if path.is_empty() {
            return Err(ScmError::invalid_provider_repository(
                "demo",
                "the repository path is missing",
            ));
        }

        let repository = ProviderRepository::new(path);
        Ok(match parts.next() {
            Some(module) if !module.is_empty() => repository.with_module(module),
            _ => repository,
        })
    }

    fn command(&self, kind: CommandKind) -> Option<Box<dyn ScmCommand>> {
        match kind {
            CommandKind::Status | CommandKind::Lock | CommandKind::Unlock => {
                Some(Box::new(DemoCommand { kind }))
            }
            _ => None,
        }
    }
}

struct DemoCommand {
    kind: CommandKind,
}

impl ScmCommand for DemoCommand {
    fn kind(&self) -> CommandKind {
        self.kind
    }

    fn invocation(&self, request: &CommandRequest<'_>) -> UniscmResult<Invocation> {
        Ok(Invocation::new("demo")
            .arg(self.kind.name())
            .args(request.file_set.relative_paths())
            .working_directory(request.file_set.base_directory()))
    }

    fn consumer(&self, request: &CommandRequest<'_>) -> UniscmResult<Box<dyn OutputConsumer>> {
        let base = request.file_set.base_directory();
        Ok(match self.kind {
            CommandKind::Lock => Box::new(MarkerEntryConsumer::new(
                MarkerEntryFormat::working_dir_listing(": locked", ScmFileStatus::CheckedOut),
                base,
            )),
            CommandKind::Unlock => Box::new(MarkerEntryConsumer::new(
                MarkerEntryFormat::working_dir_listing(": unlocked", ScmFileStatus::CheckedIn),
                base,
            )),
            _ => Box::new(StatusLineConsumer::new(StatusLineFormat::single_letter(), base)),
        })
    }
}
