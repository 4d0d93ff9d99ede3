//! Chunk stores.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use super::TRACING_TARGET;
use crate::context::ChunkDescriptor;
use crate::{BatchError, Result};

/// Source of chunk content.
///
/// The pipeline only needs the raw bytes of a chunk; how chunks are stored is
/// up to the implementation.
#[async_trait::async_trait]
pub trait ChunkStore: Send + Sync {
    /// Reads the full content of the chunk.
    async fn read(&self, chunk: &ChunkDescriptor) -> Result<Bytes>;
}

/// Chunk store holding chunks in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryChunkStore {
    chunks: HashMap<String, Bytes>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a chunk under the given key.
    pub fn with_chunk(mut self, key: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.chunks.insert(key.into(), content.into());
        self
    }
}

#[async_trait::async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn read(&self, chunk: &ChunkDescriptor) -> Result<Bytes> {
        self.chunks
            .get(chunk.key())
            .cloned()
            .ok_or_else(|| BatchError::chunk_store(format!("chunk '{}' not found", chunk.key())))
    }
}

/// Chunk store reading chunks from files below a root directory.
///
/// Chunk keys are relative paths; keys that would leave the root are rejected.
#[derive(Debug, Clone)]
pub struct FsChunkStore {
    root: PathBuf,
}

impl FsChunkStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative.components().any(|component| {
            !matches!(component, std::path::Component::Normal(_) | std::path::Component::CurDir)
        });

        if escapes {
            return Err(BatchError::chunk_store(format!(
                "chunk key '{key}' must be a relative path inside the store"
            )));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl ChunkStore for FsChunkStore {
    async fn read(&self, chunk: &ChunkDescriptor) -> Result<Bytes> {
        let path = self.resolve(chunk.key())?;

        tracing::trace!(
            target: TRACING_TARGET,
            path = %path.display(),
            "Reading chunk from filesystem"
        );

        let content = tokio::fs::read(&path).await.map_err(|err| {
            BatchError::chunk_store_with_source(
                format!("failed to read chunk '{}'", chunk.key()),
                err,
            )
        })?;

        Ok(Bytes::from(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ChunkFormat;

    #[tokio::test]
    async fn test_memory_store_reads_known_chunks() {
        let store = MemoryChunkStore::new().with_chunk("a", "[]");

        let content = store
            .read(&ChunkDescriptor::new("a", ChunkFormat::Json))
            .await
            .unwrap();
        assert_eq!(content, Bytes::from_static(b"[]"));

        let missing = store
            .read(&ChunkDescriptor::new("b", ChunkFormat::Json))
            .await;
        assert!(matches!(missing, Err(BatchError::ChunkStore { .. })));
    }

    #[tokio::test]
    async fn test_fs_store_reads_files_below_root() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("chunk.jsonl"), b"{\"a\":1}\n")
            .await
            .unwrap();

        let store = FsChunkStore::new(dir.path());
        let content = store
            .read(&ChunkDescriptor::new("chunk.jsonl", ChunkFormat::JsonLines))
            .await
            .unwrap();

        assert_eq!(content, Bytes::from_static(b"{\"a\":1}\n"));
    }

    #[tokio::test]
    async fn test_fs_store_rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsChunkStore::new(dir.path());

        let result = store
            .read(&ChunkDescriptor::new("../secret", ChunkFormat::Json))
            .await;
        assert!(matches!(result, Err(BatchError::ChunkStore { .. })));
    }
}
