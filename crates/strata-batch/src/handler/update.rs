//! Batch update handler.

use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::{BatchResponse, TRACING_TARGET, Timing};
use crate::Result;
use crate::context::{BatchContext, BatchRequest};
use crate::pipeline::{CANCELLED_RETRY_REASON, PipelineConfig, StageSequencer};
use crate::processor::StageProcessors;

/// Retry reason given to batches submitted after shutdown.
pub const SHUTDOWN_RETRY_REASON: &str = "batch handler is shutting down";

/// Entry point of the pipeline: one request in, one response out.
///
/// The handler builds a fresh context per request, drives it through the
/// sequencer and snapshots the result. It never fails: every problem is
/// reported through the response. Concurrent batches are bounded by
/// [`PipelineConfig::max_concurrent_batches`].
#[derive(Debug, Clone)]
pub struct BatchUpdateHandler {
    sequencer: StageSequencer,
    semaphore: Arc<Semaphore>,
    config: PipelineConfig,
}

impl BatchUpdateHandler {
    /// Creates a handler over the given stage chains.
    pub fn new(processors: StageProcessors, config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        tracing::debug!(
            target: TRACING_TARGET,
            transform_concurrency = config.transform_concurrency,
            max_concurrent_batches = config.max_concurrent_batches,
            "Creating batch update handler"
        );

        Ok(Self {
            sequencer: StageSequencer::new(processors, &config),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_batches)),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of batches that can start right away.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Processes one batch.
    pub async fn handle(&self, request: BatchRequest) -> BatchResponse {
        self.handle_with_cancellation(request, CancellationToken::new())
            .await
    }

    /// Processes one batch, answering with a retry if cancelled.
    #[tracing::instrument(
        skip_all,
        target = TRACING_TARGET,
        fields(
            operation_id = %request.operation_id(),
            chunk = %request.chunk().key(),
        )
    )]
    pub async fn handle_with_cancellation(
        &self,
        request: BatchRequest,
        cancel: CancellationToken,
    ) -> BatchResponse {
        let started_at = Timestamp::now();
        let mut context = BatchContext::new(request);

        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CANCELLED_RETRY_REASON),
            permit = self.semaphore.acquire() => permit.map_err(|_| SHUTDOWN_RETRY_REASON),
        };

        match permit {
            Ok(_permit) => {
                tracing::debug!(target: TRACING_TARGET, "Batch admitted");
                self.sequencer
                    .run_with_cancellation(&mut context, &cancel)
                    .await;
            }
            Err(reason) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    reason,
                    "Batch not admitted, asking for retry"
                );
                context.set_retry_reason(reason);
            }
        }

        let response = BatchResponse::from_context(context, Timing::since(started_at));

        tracing::info!(
            target: TRACING_TARGET,
            read = response.summary.read_count(),
            written = response.summary.write_count(),
            errors = response.summary.error_count(),
            retry = response.is_retry_again,
            unexpected = response.has_unexpected_errors,
            duration_ms = response.timing.duration().as_millis(),
            "Batch handled"
        );

        response
    }

    /// Stops admitting batches; batches already running finish normally.
    pub fn shutdown(&self) {
        tracing::info!(target: TRACING_TARGET, "Shutting down batch update handler");
        self.semaphore.close();
    }

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.semaphore.is_closed()
    }
}
