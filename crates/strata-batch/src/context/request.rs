//! Inbound batch requests.

use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use derive_builder::Builder;
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::provider::ChunkStore;

/// Identifier correlating a batch with its asynchronous job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into, Serialize, Deserialize
)]
#[serde(transparent)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Creates a new time-ordered operation identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[inline]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

/// Protocol aspects of a request, e.g. `rest` and `json_api`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestType {
    aspects: BTreeSet<String>,
}

impl RequestType {
    pub fn new<I, S>(aspects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            aspects: aspects.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, aspect: &str) -> bool {
        self.aspects.contains(aspect)
    }

    pub fn aspects(&self) -> impl Iterator<Item = &str> {
        self.aspects.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aspects: Vec<_> = self.aspects().collect();
        f.write_str(&aspects.join(","))
    }
}

impl FromStr for RequestType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(
            s.split(',')
                .map(str::trim)
                .filter(|aspect| !aspect.is_empty()),
        ))
    }
}

/// Encoding of the records inside a chunk.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, AsRefStr, EnumString
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChunkFormat {
    /// A single JSON array of objects.
    Json,
    /// One JSON object per line.
    #[default]
    JsonLines,
}

/// Reference to a chunk held by a [`ChunkStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkDescriptor {
    key: String,
    #[serde(default)]
    format: ChunkFormat,
}

impl ChunkDescriptor {
    pub fn new(key: impl Into<String>, format: ChunkFormat) -> Self {
        Self {
            key: key.into(),
            format,
        }
    }

    /// Key of the chunk inside its store.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn format(&self) -> ChunkFormat {
        self.format
    }
}

/// A request to process one chunk.
#[derive(Clone, Builder)]
#[builder(
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct BatchRequest {
    /// API version the records were written against.
    #[builder(default = "String::from(\"latest\")")]
    version: String,
    /// Protocol aspects used to resolve error completers.
    #[builder(default)]
    request_type: RequestType,
    /// Identifier of the asynchronous job this batch belongs to.
    #[builder(default)]
    operation_id: OperationId,
    /// Entity classes the batch may touch; empty means unrestricted.
    #[builder(default)]
    supported_entity_classes: Vec<String>,
    /// Chunk to process.
    chunk: ChunkDescriptor,
    /// Store the chunk is read from.
    #[builder(setter(custom))]
    chunk_store: Arc<dyn ChunkStore>,
}

impl BatchRequestBuilder {
    /// Sets the store the chunk is read from.
    pub fn with_chunk_store(mut self, chunk_store: impl ChunkStore + 'static) -> Self {
        self.chunk_store = Some(Arc::new(chunk_store));
        self
    }

    /// Sets a shared store the chunk is read from.
    pub fn with_shared_chunk_store(mut self, chunk_store: Arc<dyn ChunkStore>) -> Self {
        self.chunk_store = Some(chunk_store);
        self
    }

    fn validate(&self) -> Result<(), String> {
        if let Some(version) = &self.version
            && version.trim().is_empty()
        {
            return Err("version must not be empty".into());
        }
        if let Some(chunk) = &self.chunk
            && chunk.key().is_empty()
        {
            return Err("chunk key must not be empty".into());
        }
        Ok(())
    }
}

impl BatchRequest {
    /// Returns a builder for creating a request.
    pub fn builder() -> BatchRequestBuilder {
        BatchRequestBuilder::default()
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }

    #[inline]
    pub fn request_type(&self) -> &RequestType {
        &self.request_type
    }

    #[inline]
    pub fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    #[inline]
    pub fn supported_entity_classes(&self) -> &[String] {
        &self.supported_entity_classes
    }

    #[inline]
    pub fn chunk(&self) -> &ChunkDescriptor {
        &self.chunk
    }

    #[inline]
    pub fn chunk_store(&self) -> &Arc<dyn ChunkStore> {
        &self.chunk_store
    }

    pub(crate) fn into_parts(self) -> RequestParts {
        RequestParts {
            version: self.version,
            request_type: self.request_type,
            operation_id: self.operation_id,
            supported_entity_classes: self.supported_entity_classes,
            chunk: self.chunk,
            chunk_store: self.chunk_store,
        }
    }
}

impl fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRequest")
            .field("version", &self.version)
            .field("request_type", &self.request_type)
            .field("operation_id", &self.operation_id)
            .field("supported_entity_classes", &self.supported_entity_classes)
            .field("chunk", &self.chunk)
            .finish_non_exhaustive()
    }
}

pub(crate) struct RequestParts {
    pub version: String,
    pub request_type: RequestType,
    pub operation_id: OperationId,
    pub supported_entity_classes: Vec<String>,
    pub chunk: ChunkDescriptor,
    pub chunk_store: Arc<dyn ChunkStore>,
}
