//! The stage state machine.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use super::{PipelineConfig, PipelineState, TRACING_TARGET};
use crate::context::{BatchContext, ItemScope};
use crate::diagnostic::{DefaultErrorCompleter, ErrorCompleter, ErrorObject};
use crate::item::BatchItem;
use crate::processor::{ProcessorFailure, Stage, StageProcessors};

/// Retry reason set when a batch is cancelled mid-flight.
pub const CANCELLED_RETRY_REASON: &str = "batch processing was cancelled";

/// Drives one batch context through the fixed stage order.
///
/// ```text
/// Initializing -> TransformingItems -> SavingData -> Finalizing -> ReportingErrors -> Done
/// ```
///
/// A batch-level error or a retry reason after INITIALIZE skips straight to
/// REPORT-ERRORS; after SAVE it skips FINALIZE. REPORT-ERRORS always runs.
/// Processor failures never escape: they become diagnostic errors on the
/// batch or on the item being processed.
#[derive(Debug, Clone)]
pub struct StageSequencer {
    processors: Arc<StageProcessors>,
    transform_concurrency: usize,
}

impl StageSequencer {
    /// Creates a sequencer over the given stage chains.
    pub fn new(processors: impl Into<Arc<StageProcessors>>, config: &PipelineConfig) -> Self {
        Self {
            processors: processors.into(),
            transform_concurrency: config.transform_concurrency.max(1),
        }
    }

    #[inline]
    pub fn processors(&self) -> &StageProcessors {
        &self.processors
    }

    /// Runs every applicable stage, returning the visited states.
    pub async fn run(&self, context: &mut BatchContext) -> Vec<PipelineState> {
        self.run_with_cancellation(context, &CancellationToken::new())
            .await
    }

    /// Runs every applicable stage until done or cancelled.
    ///
    /// Cancellation is checked before every stage but REPORT-ERRORS and before
    /// each item. A cancelled batch is treated like a retry.
    pub async fn run_with_cancellation(
        &self,
        context: &mut BatchContext,
        cancel: &CancellationToken,
    ) -> Vec<PipelineState> {
        let mut states = Vec::with_capacity(6);

        if self.proceed(Stage::Initialize, context, cancel) {
            states.push(PipelineState::Initializing);
            self.run_batch_stage(Stage::Initialize, context).await;

            if self.proceed(Stage::Transform, context, cancel) {
                states.push(PipelineState::TransformingItems);
                self.run_transform(context, cancel).await;

                if self.proceed(Stage::Save, context, cancel) {
                    states.push(PipelineState::SavingData);
                    self.run_batch_stage(Stage::Save, context).await;

                    if self.proceed(Stage::Finalize, context, cancel) {
                        states.push(PipelineState::Finalizing);
                        self.run_batch_stage(Stage::Finalize, context).await;
                    }
                }
            }
        }

        states.push(PipelineState::ReportingErrors);
        self.run_batch_stage(Stage::ReportErrors, context).await;
        states.push(PipelineState::Done);

        tracing::debug!(
            target: TRACING_TARGET,
            operation_id = %context.operation_id(),
            states = states.len(),
            errors = context.errors().len(),
            retry = context.is_retry_again(),
            "Batch reached done"
        );

        states
    }

    /// Decides whether the next stage runs, recording cancellation as a retry.
    fn proceed(&self, next: Stage, context: &mut BatchContext, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            if !context.is_retry_again() {
                context.set_retry_reason(CANCELLED_RETRY_REASON);
            }
            tracing::info!(
                target: TRACING_TARGET,
                operation_id = %context.operation_id(),
                next = %next,
                "Batch cancelled, skipping to error reporting"
            );
            return false;
        }

        if context.should_short_circuit() {
            tracing::info!(
                target: TRACING_TARGET,
                operation_id = %context.operation_id(),
                next = %next,
                errors = context.errors().len(),
                retry_reason = context.retry_reason(),
                "Short-circuiting to error reporting"
            );
            return false;
        }

        true
    }

    async fn run_batch_stage(&self, stage: Stage, context: &mut BatchContext) {
        let Some(chain) = self.processors.batch_chain(stage) else {
            return;
        };

        tracing::debug!(
            target: TRACING_TARGET,
            operation_id = %context.operation_id(),
            stage = %stage,
            processors = chain.len(),
            "Running stage"
        );

        let report = chain.execute(stage, context).await;
        for failure in report.into_failures() {
            Self::record_batch_failure(stage, context, failure);
        }
    }

    fn record_batch_failure(stage: Stage, context: &mut BatchContext, failure: ProcessorFailure) {
        tracing::error!(
            target: TRACING_TARGET,
            operation_id = %context.operation_id(),
            stage = %stage,
            processor = %failure.processor,
            error = %failure.error,
            "Batch processor failed"
        );

        let mut error = ErrorObject::from_error(&failure.error);
        if stage == Stage::ReportErrors {
            // Reporting already ran its completers; complete the late error here.
            DefaultErrorCompleter.complete(&mut error, context.request_type(), None);
            context.set_has_unexpected_errors(true);
        }
        context.add_error(error);
    }

    async fn run_transform(&self, context: &mut BatchContext, cancel: &CancellationToken) {
        let Some(mut items) = context.take_items() else {
            tracing::debug!(
                target: TRACING_TARGET,
                operation_id = %context.operation_id(),
                "No items to transform"
            );
            return;
        };

        tracing::debug!(
            target: TRACING_TARGET,
            operation_id = %context.operation_id(),
            items = items.len(),
            concurrency = self.transform_concurrency,
            "Running stage"
        );

        {
            let scope = context.item_scope();

            if self.transform_concurrency <= 1 {
                for item in items.iter_mut() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    self.transform_item(item, &scope).await;
                }
            } else {
                // Boxed as `dyn Future + Send` so callers can `tokio::spawn` the
                // handler; rustc cannot otherwise prove `Send` through these closures.
                let transform: std::pin::Pin<Box<dyn Future<Output = ()> + Send + '_>> =
                    Box::pin(
                        futures::stream::iter(items.iter_mut())
                            .take_while(|_| futures::future::ready(!cancel.is_cancelled()))
                            .map(|item| self.transform_item(item, &scope))
                            .buffered(self.transform_concurrency)
                            .for_each(|()| futures::future::ready(())),
                    );
                transform.await;
            }
        }

        context.set_items(items);
    }

    async fn transform_item(&self, item: &mut BatchItem, scope: &ItemScope<'_>) {
        let report = self.processors.item_chain().execute(item, scope).await;

        for failure in report.into_failures() {
            tracing::warn!(
                target: TRACING_TARGET,
                operation_id = %scope.operation_id(),
                item_index = item.index(),
                processor = %failure.processor,
                error = %failure.error,
                "Item processor failed"
            );
            item.add_error(ErrorObject::from_error(&failure.error));
        }
    }
}
