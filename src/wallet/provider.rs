// src/wallet/provider.rs
//! Signing collaborator interface.

use crate::contracts::DiplomaLedger;
use crate::error::LedgerError;
use crate::models::address::Address;
use async_trait::async_trait;
use std::sync::Arc;

/// A wallet able to authenticate the caller and sign registry transactions.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts the user already authorized for this session; empty if none.
    async fn authorized_accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// Asks the user to authorize account access. May prompt.
    async fn request_accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// The account transactions will be signed with.
    async fn active_address(&self) -> Result<Address, LedgerError>;

    /// Returns a ledger handle whose mutations are signed as `caller`.
    async fn bind_registry(&self, caller: &Address) -> Result<Arc<dyn DiplomaLedger>, LedgerError>;
}
