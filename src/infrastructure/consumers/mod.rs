//! Stateful line parsers turning tool output into canonical results
//!
//! Each command invocation owns one consumer. Lines are fed in order, then
//! [`OutputConsumer::finish`] yields the payload. Anomalies are logged with
//! `tracing` and skipped so that one odd line never discards the rest of the
//! output.

pub mod blame;
pub mod change_log;
pub mod line_patterns;
pub mod marker_entry;
pub mod status_line;
pub mod unified_diff;

use crate::common::result::UniscmResult;
use crate::domain::entities::scm_result::CommandPayload;

pub use blame::{BlameConsumer, BlameFormat};
pub use change_log::{GitLogConsumer, SvnLogConsumer, UngroupedChangeLogConsumer};
pub use line_patterns::{FileSetEchoConsumer, NullConsumer, PathListConsumer, RegexLineConsumer};
pub use marker_entry::{MarkerEntryConsumer, MarkerEntryFormat};
pub use status_line::{CodeAction, StatusLineConsumer, StatusLineFormat};
pub use unified_diff::{DiffFormat, UnifiedDiffConsumer};

/// Per-invocation line processor
pub trait OutputConsumer: Send {
    /// Process one line of standard output, without its line terminator
    ///
    /// Only structural contradictions are returned as errors; anything else is
    /// logged and skipped.
    fn consume_line(&mut self, line: &str) -> UniscmResult<()>;

    /// End of stream: hand over what was collected
    fn finish(self: Box<Self>) -> CommandPayload;
}

/// Feed every line to `consumer` and finish it
pub fn consume_all<I, S>(mut consumer: Box<dyn OutputConsumer>, lines: I) -> UniscmResult<CommandPayload>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        consumer.consume_line(line.as_ref())?;
    }
    Ok(consumer.finish())
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::Registry;

    /// Counts WARN events
    #[derive(Clone, Default)]
    pub struct WarningCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarningCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Run `f` and report how many warnings it logged
    pub fn count_warnings<T>(f: impl FnOnce() -> T) -> (T, usize) {
        let counter = WarningCounter::default();
        let subscriber = Registry::default().with(counter.clone());
        let value = tracing::subscriber::with_default(subscriber, f);
        (value, counter.0.load(Ordering::SeqCst))
    }
}
