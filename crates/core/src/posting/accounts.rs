//! Account role resolution for event posters.
//!
//! A poster never names an account directly. It asks for a logical role
//! (e.g. "sales receivable"), which resolves through the settings lookup
//! first and then through the role's fallback codes. A role that resolves to
//! nothing is a hard failure for the whole posting.

use std::sync::Arc;

use tracing::{debug, warn};

use neraca_shared::config::AccountSettings;
use neraca_shared::types::AccountId;

use super::error::{PostingError, PostingResult};
use crate::ledger::types::Account;
use crate::store::UnitOfWork;

/// Logical account roles used by the posters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    /// Cash received from sales.
    SalesCash,
    /// Bank receiving sales proceeds.
    SalesBank,
    /// Accounts receivable.
    SalesReceivable,
    /// Sales revenue.
    SalesRevenue,
    /// Output VAT (PPN Keluaran) payable.
    SalesOutputTax,
    /// Inventory bought on purchase bills.
    PurchaseInventory,
    /// Input VAT (PPN Masukan) receivable.
    PurchaseInputTax,
    /// Accounts payable.
    PurchasePayable,
    /// Cash paying purchases.
    PurchaseCash,
    /// Bank paying purchases.
    PurchaseBank,
    /// PPh 21 withheld.
    WithholdingPph21,
    /// PPh 23 withheld.
    WithholdingPph23,
}

const CASH_CODES: &[&str] = &["1101", "1100", "1001"];
const BANK_CODES: &[&str] = &["1102", "1103", "1104", "1105"];

impl AccountRole {
    /// Key of this role in the account settings.
    #[must_use]
    pub const fn setting_key(self) -> &'static str {
        match self {
            Self::SalesCash => "sales_cash",
            Self::SalesBank => "sales_bank",
            Self::SalesReceivable => "sales_receivable",
            Self::SalesRevenue => "sales_revenue",
            Self::SalesOutputTax => "sales_output_tax",
            Self::PurchaseInventory => "purchase_inventory",
            Self::PurchaseInputTax => "purchase_input_tax",
            Self::PurchasePayable => "purchase_payable",
            Self::PurchaseCash => "purchase_cash",
            Self::PurchaseBank => "purchase_bank",
            Self::WithholdingPph21 => "withholding_pph21",
            Self::WithholdingPph23 => "withholding_pph23",
        }
    }

    /// Account codes tried in order when no usable account is configured.
    #[must_use]
    pub const fn fallback_codes(self) -> &'static [&'static str] {
        match self {
            Self::SalesCash | Self::PurchaseCash => CASH_CODES,
            Self::SalesBank | Self::PurchaseBank => BANK_CODES,
            Self::SalesReceivable => &["1201", "1200", "1210"],
            Self::SalesRevenue => &["4101", "4100", "4001"],
            Self::SalesOutputTax => &["2103", "2105", "2102"],
            Self::PurchaseInventory => &["1301", "1300"],
            Self::PurchaseInputTax => &["1240", "1105"],
            Self::PurchasePayable => &["2101", "2001", "2100"],
            Self::WithholdingPph21 => &["2111"],
            Self::WithholdingPph23 => &["2112"],
        }
    }
}

impl std::fmt::Display for AccountRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.setting_key())
    }
}

/// Settings-driven role lookup.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsLookup: Send + Sync {
    /// Returns the configured account for a role, if any.
    fn account_for_role(&self, role: AccountRole) -> Option<AccountId>;
}

impl SettingsLookup for AccountSettings {
    fn account_for_role(&self, role: AccountRole) -> Option<AccountId> {
        self.get(role.setting_key()).map(AccountId::from)
    }
}

/// Where a journal leg should post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegAccount {
    /// Resolve a role.
    Role(AccountRole),
    /// Prefer a specific account (a register's linked account), else the role.
    Linked {
        /// Preferred account.
        account: Option<AccountId>,
        /// Role used when the preferred account is absent or unusable.
        fallback: AccountRole,
    },
}

/// Resolves legs to concrete accounts.
#[derive(Clone)]
pub struct AccountResolver {
    settings: Arc<dyn SettingsLookup>,
}

impl std::fmt::Debug for AccountResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountResolver").finish_non_exhaustive()
    }
}

fn usable(account: &Account) -> bool {
    account.is_active && !account.is_header
}

impl AccountResolver {
    /// Creates a resolver over a settings lookup.
    #[must_use]
    pub fn new(settings: Arc<dyn SettingsLookup>) -> Self {
        Self { settings }
    }

    /// Resolves a leg to a postable account.
    ///
    /// # Errors
    ///
    /// Returns `AccountRoleUnresolved` or a storage error.
    pub async fn resolve<U: UnitOfWork>(
        &self,
        uow: &mut U,
        leg: LegAccount,
    ) -> PostingResult<AccountId> {
        match leg {
            LegAccount::Role(role) => self.resolve_role(uow, role).await,
            LegAccount::Linked { account, fallback } => {
                if let Some(id) = account {
                    match uow.account(id).await? {
                        Some(account) if usable(&account) => return Ok(id),
                        _ => warn!(account_id = %id, %fallback, "linked account unusable, using role"),
                    }
                }
                self.resolve_role(uow, fallback).await
            }
        }
    }

    /// Resolves a role through settings, then fallback codes.
    ///
    /// # Errors
    ///
    /// Returns `AccountRoleUnresolved` or a storage error.
    pub async fn resolve_role<U: UnitOfWork>(
        &self,
        uow: &mut U,
        role: AccountRole,
    ) -> PostingResult<AccountId> {
        if let Some(id) = self.settings.account_for_role(role) {
            match uow.account(id).await? {
                Some(account) if usable(&account) => return Ok(id),
                _ => warn!(account_id = %id, %role, "configured account unusable, trying fallback codes"),
            }
        }

        for code in role.fallback_codes() {
            if let Some(account) = uow.account_by_code(code).await? {
                if usable(&account) {
                    debug!(%role, code, "role resolved by fallback code");
                    return Ok(account.id);
                }
            }
        }

        Err(PostingError::AccountRoleUnresolved(role))
    }
}
