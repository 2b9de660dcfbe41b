//! Event posters: sales, purchases, and payments into the general ledger.

pub mod accounts;
pub mod error;
pub mod service;
pub mod templates;
pub mod transition;

pub use accounts::{AccountResolver, AccountRole, LegAccount, SettingsLookup};
pub use error::{PostingError, PostingResult};
pub use service::EventPoster;
pub use templates::{JournalTemplate, Leg, PaymentTemplate, PurchaseTemplate, SaleTemplate};
pub use transition::TransitionAction;
