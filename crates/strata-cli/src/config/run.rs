//! Configuration of the `run` command.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use strata_batch::context::{ChunkFormat, OperationId, RequestType};
use strata_batch::pipeline::PipelineConfig;
use uuid::Uuid;

use crate::TRACING_TARGET_CONFIG;

/// Chunk, request and output settings of one run.
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct RunConfig {
    /// Path of the chunk file.
    #[arg(long, env = "STRATA_CHUNK")]
    pub chunk: PathBuf,

    /// Encoding of the chunk file (`json` or `json_lines`).
    #[arg(long, env = "STRATA_CHUNK_FORMAT", default_value_t = ChunkFormat::JsonLines)]
    pub format: ChunkFormat,

    /// Comma-separated request type aspects, e.g. `rest,json_api`.
    #[arg(long, env = "STRATA_REQUEST_TYPE", default_value = "rest,json_api")]
    pub request_type: RequestType,

    /// Entity class the batch may touch; repeat for several. None means all.
    #[arg(long = "entity-class")]
    #[serde(default)]
    pub entity_classes: Vec<String>,

    /// Operation identifier; generated when omitted.
    #[arg(long, env = "STRATA_OPERATION_ID")]
    pub operation_id: Option<Uuid>,

    /// API version the records were written against.
    #[arg(long = "api-version", env = "STRATA_API_VERSION", default_value = "latest")]
    pub api_version: String,

    /// Where to write the response; stdout when omitted.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Pipeline settings.
    #[command(flatten)]
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    /// Directory the chunk is read from and the chunk key inside it.
    pub fn chunk_location(&self) -> anyhow::Result<(PathBuf, String)> {
        let key = self
            .chunk
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("invalid chunk path '{}'", self.chunk.display()))?
            .to_owned();

        let root = match self.chunk.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };

        Ok((root, key))
    }

    pub fn operation_id(&self) -> OperationId {
        self.operation_id.map(OperationId::from).unwrap_or_default()
    }

    /// Logs the effective configuration.
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            chunk = %self.chunk.display(),
            format = %self.format,
            request_type = %self.request_type,
            entity_classes = ?self.entity_classes,
            transform_concurrency = self.pipeline.transform_concurrency,
            max_batch_items = self.pipeline.max_batch_items,
            "run configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(chunk: &str) -> RunConfig {
        RunConfig {
            chunk: PathBuf::from(chunk),
            format: ChunkFormat::JsonLines,
            request_type: RequestType::new(["rest", "json_api"]),
            entity_classes: Vec::new(),
            operation_id: None,
            api_version: "latest".to_owned(),
            output: None,
            pipeline: PipelineConfig::default(),
        }
    }

    #[test]
    fn test_chunk_location_splits_directory_and_key() {
        let (root, key) = config("data/users.jsonl").chunk_location().unwrap();
        assert_eq!(root, PathBuf::from("data"));
        assert_eq!(key, "users.jsonl");

        let (root, key) = config("users.jsonl").chunk_location().unwrap();
        assert_eq!(root, PathBuf::from("."));
        assert_eq!(key, "users.jsonl");
    }

    #[test]
    fn test_operation_id_is_kept_when_given() {
        let id = Uuid::now_v7();
        let mut config = config("users.jsonl");
        config.operation_id = Some(id);

        assert_eq!(config.operation_id().as_uuid(), &id);
    }
}
