//! Ordered processor chains.

use std::sync::Arc;

use super::{BatchProcessor, ItemProcessor, ProcessorOutcome, Stage, TRACING_TARGET};
use crate::BatchError;
use crate::context::{BatchContext, ItemScope};
use crate::item::BatchItem;

/// Group of processors registered without an explicit group.
pub const DEFAULT_GROUP: &str = "default";

struct ChainEntry<P: ?Sized> {
    group: String,
    processor: Arc<P>,
}

impl<P: ?Sized> Clone for ChainEntry<P> {
    fn clone(&self) -> Self {
        Self {
            group: self.group.clone(),
            processor: Arc::clone(&self.processor),
        }
    }
}

/// An ordered list of processors for one stage.
///
/// Every entry belongs to a group. A processor returning
/// [`ProcessorOutcome::SkipGroup`] skips the remaining entries of its group,
/// [`ProcessorOutcome::SkipStage`] ends the chain.
pub struct ProcessorChain<P: ?Sized> {
    entries: Vec<ChainEntry<P>>,
}

/// Chain of processors run once per batch.
pub type BatchChain = ProcessorChain<dyn BatchProcessor>;

/// Chain of processors run once per item.
pub type ItemChain = ProcessorChain<dyn ItemProcessor>;

impl<P: ?Sized> ProcessorChain<P> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a shared processor to the given group.
    pub fn with_shared(mut self, group: impl Into<String>, processor: Arc<P>) -> Self {
        self.entries.push(ChainEntry {
            group: group.into(),
            processor,
        });
        self
    }

    /// Appends every entry of another chain.
    pub fn extend(mut self, other: Self) -> Self {
        self.entries.extend(other.entries);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Groups of the chain entries, in order.
    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.group.as_str())
    }
}

impl<P: ?Sized> Default for ProcessorChain<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ?Sized> Clone for ProcessorChain<P> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl BatchChain {
    /// Appends a processor to the default group.
    pub fn with(self, processor: impl BatchProcessor + 'static) -> Self {
        self.with_shared(DEFAULT_GROUP, Arc::new(processor))
    }

    /// Appends a processor to a named group.
    pub fn with_grouped(
        self,
        group: impl Into<String>,
        processor: impl BatchProcessor + 'static,
    ) -> Self {
        self.with_shared(group, Arc::new(processor))
    }

    /// Names of the chain processors, in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.processor.name()).collect()
    }

    /// Runs the chain against a batch context.
    pub async fn execute(&self, stage: Stage, context: &mut BatchContext) -> ChainReport {
        let mut walk = ChainWalk::new(stage);

        for entry in &self.entries {
            if walk.should_skip(&entry.group) {
                continue;
            }

            let name = entry.processor.name();
            tracing::trace!(
                target: TRACING_TARGET,
                stage = %stage,
                group = %entry.group,
                processor = name,
                "Running batch processor"
            );

            let result = entry.processor.process(context).await;
            if walk.record(&entry.group, name, result).is_break() {
                break;
            }
        }

        walk.finish()
    }
}

impl std::fmt::Debug for BatchChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl ItemChain {
    /// Appends a processor to the default group.
    pub fn with(self, processor: impl ItemProcessor + 'static) -> Self {
        self.with_shared(DEFAULT_GROUP, Arc::new(processor))
    }

    /// Appends a processor to a named group.
    pub fn with_grouped(
        self,
        group: impl Into<String>,
        processor: impl ItemProcessor + 'static,
    ) -> Self {
        self.with_shared(group, Arc::new(processor))
    }

    /// Names of the chain processors, in order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.processor.name()).collect()
    }

    /// Runs the chain against one item.
    pub async fn execute(&self, item: &mut BatchItem, scope: &ItemScope<'_>) -> ChainReport {
        let mut walk = ChainWalk::new(Stage::Transform);

        for entry in &self.entries {
            if walk.should_skip(&entry.group) {
                continue;
            }

            let name = entry.processor.name();
            tracing::trace!(
                target: TRACING_TARGET,
                item_index = item.index(),
                group = %entry.group,
                processor = name,
                "Running item processor"
            );

            let result = entry.processor.process(item, scope).await;
            if walk.record(&entry.group, name, result).is_break() {
                break;
            }
        }

        walk.finish()
    }
}

impl std::fmt::Debug for ItemChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// A processor that returned an error.
#[derive(Debug)]
pub struct ProcessorFailure {
    pub processor: String,
    pub error: BatchError,
}

/// Result of running a chain once.
#[derive(Debug, Default)]
pub struct ChainReport {
    executed: usize,
    skipped: usize,
    stopped: bool,
    failures: Vec<ProcessorFailure>,
}

impl ChainReport {
    /// Number of processors that ran.
    #[inline]
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Number of processors skipped by a group skip.
    #[inline]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Whether the chain ended before its last processor.
    #[inline]
    pub fn stopped(&self) -> bool {
        self.stopped
    }

    #[inline]
    pub fn failures(&self) -> &[ProcessorFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<ProcessorFailure> {
        self.failures
    }
}

/// Skip and stop bookkeeping shared by both chain kinds.
struct ChainWalk {
    stage: Stage,
    skipped_group: Option<String>,
    report: ChainReport,
}

impl ChainWalk {
    fn new(stage: Stage) -> Self {
        Self {
            stage,
            skipped_group: None,
            report: ChainReport::default(),
        }
    }

    fn should_skip(&mut self, group: &str) -> bool {
        let skip = self.skipped_group.as_deref() == Some(group);
        if skip {
            self.report.skipped += 1;
        }
        skip
    }

    fn record(
        &mut self,
        group: &str,
        processor: &str,
        result: crate::Result<ProcessorOutcome>,
    ) -> std::ops::ControlFlow<()> {
        use std::ops::ControlFlow;

        self.report.executed += 1;

        match result {
            Ok(ProcessorOutcome::Continue) => ControlFlow::Continue(()),
            Ok(ProcessorOutcome::SkipGroup) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    stage = %self.stage,
                    group,
                    processor,
                    "Processor skipped the rest of its group"
                );
                self.skipped_group = Some(group.to_owned());
                ControlFlow::Continue(())
            }
            Ok(ProcessorOutcome::SkipStage) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    stage = %self.stage,
                    processor,
                    "Processor skipped the rest of the stage"
                );
                self.report.stopped = true;
                ControlFlow::Break(())
            }
            Err(error) => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    stage = %self.stage,
                    processor,
                    error = %error,
                    "Processor failed"
                );
                self.report.failures.push(ProcessorFailure {
                    processor: processor.to_owned(),
                    error,
                });
                if self.stage.tolerates_failures() {
                    ControlFlow::Continue(())
                } else {
                    self.report.stopped = true;
                    ControlFlow::Break(())
                }
            }
        }
    }

    fn finish(self) -> ChainReport {
        self.report
    }
}
