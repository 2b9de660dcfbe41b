//! Period and fiscal-year closing.
//!
//! - Side-effect-free previews with blockers and warnings
//! - Closing entries that roll net income into retained earnings
//! - Reversal-based reopening and permanent locks

pub mod error;
pub mod lines;
pub mod period;
pub mod preview;
pub mod service;

#[cfg(test)]
mod lines_props;

pub use error::{ClosingError, ClosingResult};
pub use lines::closing_lines;
pub use period::{AccountingPeriod, PeriodKind, date_ranges_overlap};
pub use preview::{
    ClosingAccount, ClosingBlocker, ClosingPreview, ClosingWarning, LastClosingInfo,
};
pub use service::PeriodCloser;
