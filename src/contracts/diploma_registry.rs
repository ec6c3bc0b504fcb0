// src/contracts/diploma_registry.rs
//! DiplomaRegistry smart contract interface.
//!
//! Provides the EVM implementation of [`DiplomaLedger`]: reading a holder's
//! diplomas, and submitting/confirming add, update and delete transactions
//! signed by the middleware's wallet.

use crate::contracts::{ConfirmedTx, DiplomaLedger, SubmittedTx};
use crate::error::LedgerError;
use crate::models::address::Address;
use crate::models::diploma::DiplomaRecord;
use async_trait::async_trait;
use ethers::abi::{parse_abi, Tokenize};
use ethers::contract::{Contract, ContractError};
use ethers::providers::{Middleware, MiddlewareError, PendingTransaction};
use ethers::types::{H160, U256, U64};
use log::{debug, info};
use std::sync::Arc;

/// Human-readable ABI of the deployed `DiplomaRegistry` contract.
const DIPLOMA_REGISTRY_ABI: &[&str] = &[
    "function admin() view returns (address)",
    "function getDiplomas(address student) view returns ((string,string,string,uint256)[])",
    "function addDiploma(address student, string studentName, string diplomaTitle, string institution, uint256 year)",
    "function updateDiploma(address student, uint256 index, string studentName, string diplomaTitle, string institution, uint256 year)",
    "function deleteDiploma(address student, uint256 index)",
];

/// JSON-RPC error code wallets use when the user refuses to sign (EIP-1193).
const USER_REJECTED_CODE: i64 = 4001;

/// Prefix nodes put in front of the revert reason in error messages.
const NODE_REVERT_PREFIX: &str = "execution reverted:";

/// Tuple layout of the contract's `Diploma` struct.
type DiplomaTuple = (String, String, String, U256);

/// DiplomaRegistry smart contract wrapper.
///
/// # Type Parameters
/// * `M` - Middleware used for calls; must carry a signer for mutations
pub struct EvmDiplomaRegistry<M> {
    /// Underlying contract instance
    contract: Contract<M>,
    /// Client shared with the contract, used to watch pending transactions
    client: Arc<M>,
}

impl<M> EvmDiplomaRegistry<M>
where
    M: Middleware + 'static,
{
    /// Creates a new registry handle.
    ///
    /// # Arguments
    /// * `client` - Signing middleware bound to the caller's account
    /// * `contract_address` - Address of the deployed DiplomaRegistry contract
    ///
    /// # Errors
    /// Returns [`LedgerError::Transport`] if the embedded ABI fails to parse.
    pub fn new(client: Arc<M>, contract_address: Address) -> Result<Self, LedgerError> {
        let abi = parse_abi(DIPLOMA_REGISTRY_ABI)
            .map_err(|e| LedgerError::Transport(format!("invalid DiplomaRegistry ABI: {}", e)))?;
        let contract = Contract::new(contract_address.as_h160(), abi, client.clone());
        Ok(Self { contract, client })
    }

    /// Sends a state-changing call and returns as soon as the node accepted it.
    async fn submit<T>(&self, method: &str, args: T) -> Result<SubmittedTx, LedgerError>
    where
        T: Tokenize + Send,
    {
        let call = self
            .contract
            .method::<_, ()>(method, args)
            .map_err(|e| LedgerError::Transport(format!("cannot encode {}: {}", method, e)))?;

        let pending = call.send().await.map_err(normalize_contract_error)?;
        let tx_hash = pending.tx_hash();
        info!("{} submitted as 0x{:x}", method, tx_hash);
        Ok(SubmittedTx { tx_hash })
    }
}

#[async_trait]
impl<M> DiplomaLedger for EvmDiplomaRegistry<M>
where
    M: Middleware + 'static,
{
    async fn admin(&self) -> Result<Address, LedgerError> {
        let admin: H160 = self
            .contract
            .method::<_, H160>("admin", ())
            .map_err(|e| LedgerError::Transport(e.to_string()))?
            .call()
            .await
            .map_err(normalize_contract_error)?;
        Ok(Address::from(admin))
    }

    async fn diplomas(&self, student: &Address) -> Result<Vec<DiplomaRecord>, LedgerError> {
        let rows: Vec<DiplomaTuple> = self
            .contract
            .method::<_, Vec<DiplomaTuple>>("getDiplomas", student.as_h160())
            .map_err(|e| LedgerError::Transport(e.to_string()))?
            .call()
            .await
            .map_err(normalize_contract_error)?;

        debug!("getDiplomas({}) returned {} rows", student, rows.len());
        rows.into_iter().map(record_from_tuple).collect()
    }

    async fn submit_add(&self, student: &Address, record: &DiplomaRecord) -> Result<SubmittedTx, LedgerError> {
        self.submit(
            "addDiploma",
            (
                student.as_h160(),
                record.student_name.clone(),
                record.diploma_title.clone(),
                record.institution.clone(),
                U256::from(record.year),
            ),
        )
        .await
    }

    async fn submit_update(
        &self,
        student: &Address,
        index: usize,
        record: &DiplomaRecord,
    ) -> Result<SubmittedTx, LedgerError> {
        self.submit(
            "updateDiploma",
            (
                student.as_h160(),
                U256::from(index),
                record.student_name.clone(),
                record.diploma_title.clone(),
                record.institution.clone(),
                U256::from(record.year),
            ),
        )
        .await
    }

    async fn submit_delete(&self, student: &Address, index: usize) -> Result<SubmittedTx, LedgerError> {
        self.submit("deleteDiploma", (student.as_h160(), U256::from(index))).await
    }

    async fn confirm(&self, tx: &SubmittedTx) -> Result<ConfirmedTx, LedgerError> {
        let receipt = PendingTransaction::new(tx.tx_hash, self.client.provider())
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?
            .ok_or_else(|| LedgerError::Transport(format!("transaction 0x{:x} was dropped", tx.tx_hash)))?;

        if receipt.status == Some(U64::zero()) {
            return Err(LedgerError::Reverted { reason: None });
        }

        let block_number = receipt.block_number.map(|n| n.as_u64());
        info!("0x{:x} confirmed in block {:?}", tx.tx_hash, block_number);
        Ok(ConfirmedTx { tx_hash: tx.tx_hash, block_number })
    }
}

fn record_from_tuple((student_name, diploma_title, institution, year): DiplomaTuple) -> Result<DiplomaRecord, LedgerError> {
    if year > U256::from(u32::MAX) {
        return Err(LedgerError::Transport(format!("year {} out of range", year)));
    }
    Ok(DiplomaRecord::new(student_name, diploma_title, institution, year.as_u32()))
}

/// Maps contract failures onto the ledger error kinds, keeping the revert
/// reason or node message when one is available.
fn normalize_contract_error<M: Middleware>(err: ContractError<M>) -> LedgerError {
    if let Some(reason) = err.decode_revert::<String>() {
        return LedgerError::reverted(reason);
    }
    if let Some(response) = err.as_middleware_error().and_then(|e| e.as_error_response()) {
        if response.code == USER_REJECTED_CODE {
            return LedgerError::Rejected;
        }
        let message = response.message.trim();
        return LedgerError::reverted(message.strip_prefix(NODE_REVERT_PREFIX).unwrap_or(message).trim());
    }
    if err.is_revert() {
        return LedgerError::Reverted { reason: None };
    }
    LedgerError::Transport(err.to_string())
}
