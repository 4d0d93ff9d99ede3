use std::sync::{Arc, Mutex, PoisonError};

use crate::Result;
use crate::context::{BatchContext, ItemScope};
use crate::item::BatchItem;
use crate::processor::{BatchProcessor, ItemProcessor, ProcessorOutcome, Stage};

type BatchFn = dyn Fn(&mut BatchContext) -> Result<ProcessorOutcome> + Send + Sync;
type ItemFn = dyn Fn(&mut BatchItem, &ItemScope<'_>) -> Result<ProcessorOutcome> + Send + Sync;

/// Batch processor backed by a closure.
#[derive(Clone)]
pub struct FnBatchProcessor {
    name: String,
    f: Arc<BatchFn>,
}

impl FnBatchProcessor {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut BatchContext) -> Result<ProcessorOutcome> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }
}

#[async_trait::async_trait]
impl BatchProcessor for FnBatchProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        (self.f)(context)
    }
}

/// Item processor backed by a closure.
#[derive(Clone)]
pub struct FnItemProcessor {
    name: String,
    f: Arc<ItemFn>,
}

impl FnItemProcessor {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&mut BatchItem, &ItemScope<'_>) -> Result<ProcessorOutcome> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }
}

#[async_trait::async_trait]
impl ItemProcessor for FnItemProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        item: &mut BatchItem,
        scope: &ItemScope<'_>,
    ) -> Result<ProcessorOutcome> {
        (self.f)(item, scope)
    }
}

/// Shared log of stage invocations.
#[derive(Debug, Clone, Default)]
pub struct StageRecorder {
    calls: Arc<Mutex<Vec<(Stage, Option<usize>)>>>,
}

impl StageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch processor recording each run of the given stage.
    pub fn batch(&self, stage: Stage) -> RecordingProcessor {
        RecordingProcessor {
            stage,
            recorder: self.clone(),
        }
    }

    /// Item processor recording each item it sees during TRANSFORM.
    pub fn item(&self) -> RecordingItemProcessor {
        RecordingItemProcessor {
            recorder: self.clone(),
        }
    }

    /// Number of recorded runs of the stage.
    pub fn count(&self, stage: Stage) -> usize {
        self.lock().iter().filter(|(s, _)| *s == stage).count()
    }

    /// Recorded stages, in order, with consecutive repeats collapsed.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = self.lock().iter().map(|(stage, _)| *stage).collect();
        stages.dedup();
        stages
    }

    /// Indexes of the items seen during TRANSFORM, in order.
    pub fn item_indexes(&self) -> Vec<usize> {
        self.lock().iter().filter_map(|(_, index)| *index).collect()
    }

    fn record(&self, stage: Stage, item_index: Option<usize>) {
        self.lock().push((stage, item_index));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Stage, Option<usize>)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Batch processor that records its stage.
#[derive(Debug, Clone)]
pub struct RecordingProcessor {
    stage: Stage,
    recorder: StageRecorder,
}

#[async_trait::async_trait]
impl BatchProcessor for RecordingProcessor {
    async fn process(&self, _context: &mut BatchContext) -> Result<ProcessorOutcome> {
        self.recorder.record(self.stage, None);
        Ok(ProcessorOutcome::Continue)
    }
}

/// Item processor that records each item.
#[derive(Debug, Clone)]
pub struct RecordingItemProcessor {
    recorder: StageRecorder,
}

#[async_trait::async_trait]
impl ItemProcessor for RecordingItemProcessor {
    async fn process(
        &self,
        item: &mut BatchItem,
        _scope: &ItemScope<'_>,
    ) -> Result<ProcessorOutcome> {
        self.recorder.record(Stage::Transform, Some(item.index()));
        Ok(ProcessorOutcome::Continue)
    }
}
