//! Aggregate counters for one batch.

use serde::{Deserialize, Serialize};

/// Read, write, create, update and error counters for one batch.
///
/// Counters only move forward. Processors increment them for the events they
/// own; callers only get read access through the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    read_count: u64,
    write_count: u64,
    error_count: u64,
    create_count: u64,
    update_count: u64,
}

impl BatchSummary {
    /// Creates a summary with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records decoded from the chunk.
    #[inline]
    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    /// Number of records written to the persistence layer.
    #[inline]
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// Number of surfaced errors.
    #[inline]
    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Number of written records that created a new entity.
    #[inline]
    pub fn create_count(&self) -> u64 {
        self.create_count
    }

    /// Number of written records that updated an existing entity.
    #[inline]
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn increment_read_count(&mut self, by: u64) {
        self.read_count = self.read_count.saturating_add(by);
    }

    pub fn increment_write_count(&mut self, by: u64) {
        self.write_count = self.write_count.saturating_add(by);
    }

    pub fn increment_error_count(&mut self, by: u64) {
        self.error_count = self.error_count.saturating_add(by);
    }

    pub fn increment_create_count(&mut self, by: u64) {
        self.create_count = self.create_count.saturating_add(by);
    }

    pub fn increment_update_count(&mut self, by: u64) {
        self.update_count = self.update_count.saturating_add(by);
    }
}
