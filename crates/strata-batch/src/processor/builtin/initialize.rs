//! INITIALIZE processors.

use std::sync::Arc;

use bytes::Bytes;

use super::TRACING_TARGET;
use crate::Result;
use crate::context::{BatchContext, ChunkFormat};
use crate::diagnostic::{ErrorObject, ErrorSource};
use crate::item::{BatchItem, Record};
use crate::processor::{BatchProcessor, ProcessorOutcome};

/// Reads the chunk, decodes its records and reports them as response data.
///
/// A chunk that cannot be decoded or holds too many records is a batch-level
/// error; a chunk store failure is returned as an unexpected failure.
#[derive(Debug, Clone, Copy)]
pub struct LoadChunkData {
    max_items: usize,
}

impl LoadChunkData {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }
}

#[async_trait::async_trait]
impl BatchProcessor for LoadChunkData {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let store = Arc::clone(context.chunk_store());
        let chunk = context.chunk().clone();
        let content = store.read(&chunk).await?;

        let records = match decode_records(&content, chunk.format()) {
            Ok(records) => records,
            Err(error) => {
                tracing::info!(
                    target: TRACING_TARGET,
                    chunk = chunk.key(),
                    format = %chunk.format(),
                    "Chunk could not be decoded"
                );
                context.add_error(error.with_source(ErrorSource::from_parameter("chunk")));
                return Ok(ProcessorOutcome::SkipStage);
            }
        };

        if records.len() > self.max_items {
            context.add_error(
                ErrorObject::validation("MaxBatchItems")
                    .with_detail(format!(
                        "the chunk holds {} records, at most {} are accepted",
                        records.len(),
                        self.max_items
                    ))
                    .with_source(ErrorSource::from_parameter("chunk")),
            );
            return Ok(ProcessorOutcome::SkipStage);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            chunk = chunk.key(),
            records = records.len(),
            "Decoded chunk"
        );

        context
            .summary_mut()
            .increment_read_count(records.len() as u64);
        context.set_data(records);

        Ok(ProcessorOutcome::Continue)
    }
}

/// Decodes the records of a chunk, reporting malformed content as a validation error.
fn decode_records(content: &Bytes, format: ChunkFormat) -> std::result::Result<Vec<Record>, ErrorObject> {
    let malformed = |detail: String| ErrorObject::validation("MalformedChunk").with_detail(detail);

    match format {
        ChunkFormat::Json => {
            serde_json::from_slice(content).map_err(|err| malformed(err.to_string()))
        }
        ChunkFormat::JsonLines => {
            let text = std::str::from_utf8(content)
                .map_err(|err| malformed(format!("chunk is not valid UTF-8: {err}")))?;

            text.lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .map(|(number, line)| {
                    serde_json::from_str::<Record>(line)
                        .map_err(|err| malformed(format!("line {}: {err}", number + 1)))
                })
                .collect()
        }
    }
}

/// Creates one batch item per decoded record.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateBatchItems;

#[async_trait::async_trait]
impl BatchProcessor for CreateBatchItems {
    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome> {
        let items: Vec<_> = context
            .data()
            .iter()
            .enumerate()
            .map(|(index, record)| BatchItem::new(index, record.clone()))
            .collect();

        context.set_items(items);
        Ok(ProcessorOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{BatchRequest, ChunkDescriptor};
    use crate::provider::MemoryChunkStore;

    fn context(content: &'static str, format: ChunkFormat) -> BatchContext {
        let request = BatchRequest::builder()
            .with_chunk(ChunkDescriptor::new("chunk", format))
            .with_chunk_store(MemoryChunkStore::new().with_chunk("chunk", content))
            .build()
            .unwrap();
        BatchContext::new(request)
    }

    #[tokio::test]
    async fn test_loads_json_lines_and_counts_reads() {
        let mut ctx = context("{\"key\":\"val1\"}\n\n{\"key\":\"val2\"}\n", ChunkFormat::JsonLines);

        let outcome = LoadChunkData::new(10).process(&mut ctx).await.unwrap();
        CreateBatchItems.process(&mut ctx).await.unwrap();

        assert_eq!(outcome, ProcessorOutcome::Continue);
        assert_eq!(ctx.data().len(), 2);
        assert_eq!(ctx.summary().read_count(), 2);
        let indexes: Vec<_> = ctx.items().unwrap().iter().map(BatchItem::index).collect();
        assert_eq!(indexes, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_malformed_chunk_is_a_batch_error() {
        let mut ctx = context("[{\"key\":", ChunkFormat::Json);

        let outcome = LoadChunkData::new(10).process(&mut ctx).await.unwrap();

        assert_eq!(outcome, ProcessorOutcome::SkipStage);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.summary().read_count(), 0);
        assert!(ctx.data().is_empty());
    }

    #[tokio::test]
    async fn test_json_lines_errors_name_the_line() {
        let mut ctx = context("{\"a\":1}\nnot json\n", ChunkFormat::JsonLines);

        LoadChunkData::new(10).process(&mut ctx).await.unwrap();

        let detail = ctx.errors()[0].detail().unwrap();
        assert!(detail.starts_with("line 2:"), "{detail}");
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_rejected() {
        let mut ctx = context("[{}, {}, {}]", ChunkFormat::Json);

        LoadChunkData::new(2).process(&mut ctx).await.unwrap();

        assert_eq!(ctx.errors().len(), 1);
        assert!(ctx.data().is_empty());
    }

    #[tokio::test]
    async fn test_missing_chunk_fails_the_processor() {
        let request = BatchRequest::builder()
            .with_chunk(ChunkDescriptor::new("missing", ChunkFormat::Json))
            .with_chunk_store(MemoryChunkStore::new())
            .build()
            .unwrap();
        let mut ctx = BatchContext::new(request);

        assert!(LoadChunkData::new(10).process(&mut ctx).await.is_err());
    }
}
