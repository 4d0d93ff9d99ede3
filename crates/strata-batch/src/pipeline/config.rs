//! Pipeline configuration.

#[cfg(feature = "config")]
use clap::Args;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{BatchError, Result};

/// Default number of items transformed at the same time.
pub const DEFAULT_TRANSFORM_CONCURRENCY: usize = 1;

/// Default maximum number of batches processed at the same time.
pub const DEFAULT_MAX_CONCURRENT_BATCHES: usize = 10;

/// Default maximum number of records accepted in one chunk.
pub const DEFAULT_MAX_BATCH_ITEMS: usize = 10_000;

/// Configuration of the batch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[builder(
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate")
)]
pub struct PipelineConfig {
    /// Number of items transformed concurrently; `1` keeps TRANSFORM sequential.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "transform-concurrency",
            env = "STRATA_TRANSFORM_CONCURRENCY",
            default_value_t = DEFAULT_TRANSFORM_CONCURRENCY
        )
    )]
    #[serde(default = "default_transform_concurrency")]
    #[builder(default = "DEFAULT_TRANSFORM_CONCURRENCY")]
    pub transform_concurrency: usize,

    /// Maximum number of batches a handler processes simultaneously.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-concurrent-batches",
            env = "STRATA_MAX_CONCURRENT_BATCHES",
            default_value_t = DEFAULT_MAX_CONCURRENT_BATCHES
        )
    )]
    #[serde(default = "default_max_concurrent_batches")]
    #[builder(default = "DEFAULT_MAX_CONCURRENT_BATCHES")]
    pub max_concurrent_batches: usize,

    /// Maximum number of records accepted in one chunk.
    #[cfg_attr(
        feature = "config",
        arg(
            long = "max-batch-items",
            env = "STRATA_MAX_BATCH_ITEMS",
            default_value_t = DEFAULT_MAX_BATCH_ITEMS
        )
    )]
    #[serde(default = "default_max_batch_items")]
    #[builder(default = "DEFAULT_MAX_BATCH_ITEMS")]
    pub max_batch_items: usize,
}

fn default_transform_concurrency() -> usize {
    DEFAULT_TRANSFORM_CONCURRENCY
}

fn default_max_concurrent_batches() -> usize {
    DEFAULT_MAX_CONCURRENT_BATCHES
}

fn default_max_batch_items() -> usize {
    DEFAULT_MAX_BATCH_ITEMS
}

impl PipelineConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.transform_concurrency == Some(0) {
            return Err("transform_concurrency must be at least 1".into());
        }
        if self.max_concurrent_batches == Some(0) {
            return Err("max_concurrent_batches must be at least 1".into());
        }
        if self.max_batch_items == Some(0) {
            return Err("max_batch_items must be at least 1".into());
        }
        Ok(())
    }
}

impl PipelineConfig {
    /// Returns a builder for creating a configuration.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Checks values that may have bypassed the builder, e.g. from the command line.
    pub fn validate(&self) -> Result<()> {
        if self.transform_concurrency == 0 {
            return Err(BatchError::configuration(
                "transform_concurrency must be at least 1",
            ));
        }
        if self.max_concurrent_batches == 0 {
            return Err(BatchError::configuration(
                "max_concurrent_batches must be at least 1",
            ));
        }
        if self.max_batch_items == 0 {
            return Err(BatchError::configuration(
                "max_batch_items must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            transform_concurrency: DEFAULT_TRANSFORM_CONCURRENCY,
            max_concurrent_batches: DEFAULT_MAX_CONCURRENT_BATCHES,
            max_batch_items: DEFAULT_MAX_BATCH_ITEMS,
        }
    }
}
