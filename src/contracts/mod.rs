// src/contracts/mod.rs
//! Ledger collaborator interface.
//!
//! [`DiplomaLedger`] is the seam between the registry services and whatever
//! stores diplomas. The production implementation talks to the
//! `DiplomaRegistry` contract through [`diploma_registry::EvmDiplomaRegistry`].

pub mod diploma_registry;

use crate::error::LedgerError;
use crate::models::address::Address;
use crate::models::diploma::DiplomaRecord;
use async_trait::async_trait;
use ethers::types::TxHash;
use serde::Serialize;

/// A mutation accepted by the ledger whose outcome is not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubmittedTx {
    pub tx_hash: TxHash,
}

/// A mutation the ledger has finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfirmedTx {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Read and mutate operations of the diploma ledger, bound to one caller.
///
/// Mutating entry points are split in two: `submit_*` returns once the ledger
/// accepted the request, [`DiplomaLedger::confirm`] waits until it is final.
/// The ledger is expected to re-check admin rights on every mutation.
#[async_trait]
pub trait DiplomaLedger: Send + Sync {
    /// Address recorded as admin by the contract.
    async fn admin(&self) -> Result<Address, LedgerError>;

    /// All diplomas recorded against `student`, in ledger order.
    async fn diplomas(&self, student: &Address) -> Result<Vec<DiplomaRecord>, LedgerError>;

    async fn submit_add(&self, student: &Address, record: &DiplomaRecord) -> Result<SubmittedTx, LedgerError>;

    async fn submit_update(
        &self,
        student: &Address,
        index: usize,
        record: &DiplomaRecord,
    ) -> Result<SubmittedTx, LedgerError>;

    async fn submit_delete(&self, student: &Address, index: usize) -> Result<SubmittedTx, LedgerError>;

    /// Waits for the ledger to finalize a submitted mutation.
    async fn confirm(&self, tx: &SubmittedTx) -> Result<ConfirmedTx, LedgerError>;
}
