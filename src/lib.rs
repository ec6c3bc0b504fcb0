// src/lib.rs
//! # Diploma Registry
//!
//! Keeps a per-student list of diplomas on an EVM ledger and exports single
//! diplomas with a tamper-evident certificate.
//!
//! ## Layers
//! 1. **Blockchain**: `EvmClient` (JSON-RPC provider plus signing key)
//! 2. **Contracts**: the `DiplomaLedger` seam and its `DiplomaRegistry` binding
//! 3. **Wallet**: signing collaborators that authenticate the caller
//! 4. **Services**: session, authorization, record store, command processor,
//!    certificates, export and the HTTP API
//! 5. **Models**: addresses, diploma records and certificate artifacts

pub mod blockchain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod testing;

pub use error::{DiplomaError, LedgerError};
