#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod context;
pub mod diagnostic;
mod error;
pub mod handler;
pub mod item;
pub mod pipeline;
pub mod processor;
pub mod provider;
mod summary;

#[cfg(any(test, feature = "test-utils"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-utils")))]
pub mod mock;

#[doc(hidden)]
pub mod prelude;

pub use error::{BatchError, BoxedError, Result};
pub use summary::BatchSummary;

/// Tracing target for batch pipeline operations.
pub const TRACING_TARGET: &str = "strata_batch";
