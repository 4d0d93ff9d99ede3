use super::{BatchChain, ItemChain, Stage};

/// The processor chains of every stage, injected into the sequencer.
#[derive(Debug, Clone, Default)]
pub struct StageProcessors {
    initialize: BatchChain,
    transform: ItemChain,
    save: BatchChain,
    finalize: BatchChain,
    report_errors: BatchChain,
}

impl StageProcessors {
    /// Creates a set of empty chains.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initialize(mut self, chain: BatchChain) -> Self {
        self.initialize = chain;
        self
    }

    pub fn with_transform(mut self, chain: ItemChain) -> Self {
        self.transform = chain;
        self
    }

    pub fn with_save(mut self, chain: BatchChain) -> Self {
        self.save = chain;
        self
    }

    pub fn with_finalize(mut self, chain: BatchChain) -> Self {
        self.finalize = chain;
        self
    }

    pub fn with_report_errors(mut self, chain: BatchChain) -> Self {
        self.report_errors = chain;
        self
    }

    /// Returns the chain of a batch-level stage, `None` for TRANSFORM.
    pub fn batch_chain(&self, stage: Stage) -> Option<&BatchChain> {
        match stage {
            Stage::Initialize => Some(&self.initialize),
            Stage::Transform => None,
            Stage::Save => Some(&self.save),
            Stage::Finalize => Some(&self.finalize),
            Stage::ReportErrors => Some(&self.report_errors),
        }
    }

    #[inline]
    pub fn item_chain(&self) -> &ItemChain {
        &self.transform
    }
}
