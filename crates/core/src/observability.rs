//! Injected observability collaborator.
//!
//! Services receive an `Arc<dyn LedgerMetrics>` at construction. There is no
//! process-wide metrics state; embedders decide where counters and timings go.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::ledger::types::SourceType;

/// Counters and timers emitted by the engine.
pub trait LedgerMetrics: Send + Sync {
    /// A journal entry was posted.
    fn record_posting(&self, source_type: Option<SourceType>, line_count: usize);

    /// A poster found an existing entry and skipped.
    fn record_duplicate_skipped(&self, source_type: SourceType);

    /// A discrepancy scan finished with `count` registers out of sync.
    fn record_discrepancies(&self, count: usize);

    /// An auto-fix sweep repaired `count` registers.
    fn record_auto_fix(&self, count: usize);

    /// An operation completed in `elapsed`.
    fn record_timing(&self, operation: &'static str, elapsed: Duration);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl LedgerMetrics for NoopMetrics {
    fn record_posting(&self, _source_type: Option<SourceType>, _line_count: usize) {}

    fn record_duplicate_skipped(&self, _source_type: SourceType) {}

    fn record_discrepancies(&self, _count: usize) {}

    fn record_auto_fix(&self, _count: usize) {}

    fn record_timing(&self, _operation: &'static str, _elapsed: Duration) {}
}

/// Emits every measurement as a structured `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetrics;

impl LedgerMetrics for TracingMetrics {
    fn record_posting(&self, source_type: Option<SourceType>, line_count: usize) {
        info!(
            metric = "ledger.posting",
            source_type = source_type.map_or("NONE", SourceType::as_str),
            line_count,
            "journal entry posted"
        );
    }

    fn record_duplicate_skipped(&self, source_type: SourceType) {
        info!(
            metric = "ledger.duplicate_skipped",
            source_type = source_type.as_str(),
            "posting skipped, entry already exists"
        );
    }

    fn record_discrepancies(&self, count: usize) {
        info!(metric = "cashbank.discrepancies", count, "discrepancy scan finished");
    }

    fn record_auto_fix(&self, count: usize) {
        info!(metric = "cashbank.auto_fixed", count, "auto-fix sweep finished");
    }

    fn record_timing(&self, operation: &'static str, elapsed: Duration) {
        debug!(
            metric = "ledger.timing",
            operation,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "operation timed"
        );
    }
}

/// Returns a shared no-op collaborator.
#[must_use]
pub fn noop() -> Arc<dyn LedgerMetrics> {
    Arc::new(NoopMetrics)
}
