// src/error.rs
//! Error taxonomy for the diploma registry.
//!
//! Every failure a caller can observe is one of the [`DiplomaError`] kinds.
//! Ledger-side failures are normalised into [`LedgerError`] at the contract
//! boundary before they reach the command processor.

use thiserror::Error;

/// Failure reported by the ledger collaborator or the signing provider.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The user declined to sign the transaction in their wallet.
    #[error("transaction signature was rejected by the user")]
    Rejected,

    /// The contract reverted or the node refused the transaction.
    #[error("{}", .reason.as_deref().unwrap_or("the ledger rejected the transaction"))]
    Reverted { reason: Option<String> },

    /// The node could not be reached or returned something unreadable.
    #[error("ledger unavailable: {0}")]
    Transport(String),
}

impl LedgerError {
    /// Builds a revert with the ledger's human-readable reason, dropping blank reasons.
    pub fn reverted(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() { None } else { Some(reason) };
        LedgerError::Reverted { reason }
    }
}

/// Errors surfaced by the identity, authorization, record and export layers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiplomaError {
    /// No signing collaborator is present. Fatal for the session.
    #[error("no wallet found: install or connect an Ethereum wallet (e.g. MetaMask) and retry")]
    NoWallet,

    /// Address failed the format check.
    #[error("invalid Ethereum address: {0}")]
    InvalidAddress(String),

    /// A required field is missing or malformed.
    #[error("invalid diploma input: {0}")]
    Validation(String),

    /// The caller's role does not allow the command.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Submission failed, signature declined or ledger revert.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Identity or admin address not resolved yet.
    #[error("session not ready: {0}")]
    NotReady(String),

    /// QR encoding or document rendering failed during export.
    #[error("export failed: {0}")]
    Render(String),
}

impl DiplomaError {
    /// Whether the session can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DiplomaError::NoWallet)
    }

    /// `NotReady` should be retried once the session resolves rather than shown as a failure.
    pub fn is_deferred(&self) -> bool {
        matches!(self, DiplomaError::NotReady(_))
    }
}

pub type Result<T, E = DiplomaError> = std::result::Result<T, E>;
