//! Processor traits.

use super::ProcessorOutcome;
use crate::Result;
use crate::context::{BatchContext, ItemScope};
use crate::item::BatchItem;

/// A processing unit run once per batch against the whole context.
///
/// Batch processors may add batch-level errors or set a retry reason; doing
/// so makes the sequencer skip the remaining stages up to error reporting.
/// Returning `Err` is treated as an unexpected batch-level error.
#[async_trait::async_trait]
pub trait BatchProcessor: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    async fn process(&self, context: &mut BatchContext) -> Result<ProcessorOutcome>;
}

/// A processing unit run once per item during TRANSFORM.
///
/// Item processors only see their own item and a read-only view of the batch.
/// Errors they add stay on the item; returning `Err` records an unexpected
/// error on the item and stops its chain without touching sibling items.
#[async_trait::async_trait]
pub trait ItemProcessor: Send + Sync {
    /// Name used in logs and failure reports.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    async fn process(&self, item: &mut BatchItem, scope: &ItemScope<'_>)
    -> Result<ProcessorOutcome>;
}

/// Strips the module path of a type name, keeping generic parameters out.
fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name("strata_batch::processor::SaveItems"), "SaveItems");
        assert_eq!(short_type_name("a::b::Wrapper<c::d::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }
}
