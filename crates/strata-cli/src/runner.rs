//! The `run` command.

use std::sync::Arc;

use anyhow::Context;
use strata_batch::context::{BatchRequest, ChunkDescriptor};
use strata_batch::diagnostic::{ErrorCompleterRegistry, MetadataRegistry};
use strata_batch::handler::{BatchResponse, BatchUpdateHandler};
use strata_batch::processor::StageProcessors;
use strata_batch::provider::{FsChunkStore, InMemoryUnitOfWork};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::TRACING_TARGET_RUN;
use crate::config::RunConfig;

/// The batch completed, possibly with item errors.
pub const EXIT_SUCCESS: i32 = 0;
/// The batch failed unexpectedly or the command itself failed.
pub const EXIT_FAILURE: i32 = 1;
/// The batch asked to be resubmitted.
pub const EXIT_RETRY: i32 = 2;

/// Runs one chunk and writes the response, returning the exit code.
pub async fn run(config: RunConfig) -> anyhow::Result<i32> {
    config.log();

    let response = process_chunk(&config, shutdown_token()).await?;
    write_response(&config, &response).await?;

    let code = exit_code(&response);
    tracing::info!(
        target: TRACING_TARGET_RUN,
        operation_id = %response.operation_id,
        code,
        "run finished"
    );

    Ok(code)
}

/// Runs the chunk through the standard pipeline.
pub async fn process_chunk(
    config: &RunConfig,
    cancel: CancellationToken,
) -> anyhow::Result<BatchResponse> {
    let (root, key) = config.chunk_location()?;

    let unit_of_work = Arc::new(InMemoryUnitOfWork::new());
    let processors = StageProcessors::standard(
        unit_of_work,
        Arc::new(MetadataRegistry::new()),
        ErrorCompleterRegistry::standard(),
        &config.pipeline,
    );
    let handler = BatchUpdateHandler::new(processors, config.pipeline.clone())
        .context("invalid pipeline configuration")?;

    let request = BatchRequest::builder()
        .with_version(config.api_version.clone())
        .with_request_type(config.request_type.clone())
        .with_operation_id(config.operation_id())
        .with_supported_entity_classes(config.entity_classes.clone())
        .with_chunk(ChunkDescriptor::new(key, config.format))
        .with_chunk_store(FsChunkStore::new(root))
        .build()
        .context("invalid batch request")?;

    Ok(handler.handle_with_cancellation(request, cancel).await)
}

/// Cancellation token triggered by Ctrl+C.
fn shutdown_token() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!(
                    target: TRACING_TARGET_RUN,
                    "Received Ctrl+C signal, cancelling batch"
                );
                trigger.cancel();
            }
            Err(e) => {
                tracing::error!(
                    target: TRACING_TARGET_RUN,
                    error = %e,
                    "Failed to install Ctrl+C handler"
                );
            }
        }
    });

    cancel
}

async fn write_response(config: &RunConfig, response: &BatchResponse) -> anyhow::Result<()> {
    let mut json = serde_json::to_vec_pretty(response).context("failed to encode response")?;
    json.push(b'\n');

    match &config.output {
        Some(path) => tokio::fs::write(path, &json)
            .await
            .with_context(|| format!("failed to write response to '{}'", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&json).await.context("failed to write response")?;
            stdout.flush().await.context("failed to write response")
        }
    }
}

/// Maps a response to the process exit code.
pub fn exit_code(response: &BatchResponse) -> i32 {
    if response.is_retry_again {
        EXIT_RETRY
    } else if response.has_unexpected_errors {
        EXIT_FAILURE
    } else {
        EXIT_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use strata_batch::context::{ChunkFormat, RequestType};
    use strata_batch::pipeline::PipelineConfig;

    use super::*;

    fn config(chunk: PathBuf, format: ChunkFormat) -> RunConfig {
        RunConfig {
            chunk,
            format,
            request_type: RequestType::new(["rest", "json_api"]),
            entity_classes: vec!["user".to_owned()],
            operation_id: None,
            api_version: "latest".to_owned(),
            output: None,
            pipeline: PipelineConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_process_chunk_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.jsonl");
        tokio::fs::write(&path, "{\"type\":\"user\"}\n{\"type\":\"order\"}\n")
            .await
            .unwrap();

        let response = process_chunk(&config(path, ChunkFormat::JsonLines), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.summary.read_count(), 2);
        assert_eq!(response.summary.create_count(), 1);
        assert_eq!(response.item_errors.len(), 1);
        assert_eq!(exit_code(&response), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn test_missing_chunk_exits_with_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let response = process_chunk(&config(path, ChunkFormat::Json), CancellationToken::new())
            .await
            .unwrap();

        assert!(response.has_unexpected_errors);
        assert_eq!(exit_code(&response), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn test_cancelled_run_exits_with_retry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.json");
        tokio::fs::write(&path, "[]").await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let response = process_chunk(&config(path, ChunkFormat::Json), cancel)
            .await
            .unwrap();

        assert_eq!(exit_code(&response), EXIT_RETRY);
    }

    #[tokio::test]
    async fn test_write_response_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let chunk = dir.path().join("users.json");
        tokio::fs::write(&chunk, "[{\"type\":\"user\"}]").await.unwrap();
        let mut config = config(chunk, ChunkFormat::Json);
        config.output = Some(dir.path().join("response.json"));

        let response = process_chunk(&config, CancellationToken::new()).await.unwrap();
        write_response(&config, &response).await.unwrap();

        let written = tokio::fs::read(dir.path().join("response.json")).await.unwrap();
        let decoded: BatchResponse = serde_json::from_slice(&written).unwrap();
        assert_eq!(decoded, response);
    }
}
