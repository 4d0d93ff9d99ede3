//! Batch pipeline error types.

use std::borrow::Cow;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result type alias for batch pipeline operations.
pub type Result<T, E = BatchError> = std::result::Result<T, E>;

/// Infrastructure failures raised by processors and collaborators.
///
/// These never escape the handler: the sequencer turns them into diagnostic
/// [`ErrorObject`]s attached to the batch or to the item being processed.
///
/// [`ErrorObject`]: crate::diagnostic::ErrorObject
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The chunk store could not provide the chunk content.
    #[error("chunk store error: {message}")]
    ChunkStore {
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxedError>,
    },

    /// The persistence layer rejected an operation.
    #[error("persistence error: {message}")]
    Persistence {
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxedError>,
    },

    /// A processor failed for a reason of its own.
    #[error("processing failed: {message}")]
    Processing {
        message: Cow<'static, str>,
        #[source]
        source: Option<BoxedError>,
    },

    /// The pipeline or request configuration is invalid.
    #[error("invalid configuration: {0}")]
    Configuration(Cow<'static, str>),
}

impl BatchError {
    /// Creates a chunk store error with a message.
    pub fn chunk_store(message: impl Into<Cow<'static, str>>) -> Self {
        Self::ChunkStore {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a chunk store error with a message and source.
    pub fn chunk_store_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ChunkStore {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a persistence error with a message.
    pub fn persistence(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Persistence {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a persistence error with a message and source.
    pub fn persistence_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persistence {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a processing error with a message.
    pub fn processing(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Processing {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a processing error with a message and source.
    pub fn processing_with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Configuration(message.into())
    }

    /// Returns a stable snake_case name for the error variant.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Self::ChunkStore { .. } => "chunk_store",
            Self::Persistence { .. } => "persistence",
            Self::Processing { .. } => "processing",
            Self::Configuration(_) => "configuration",
        }
    }
}
