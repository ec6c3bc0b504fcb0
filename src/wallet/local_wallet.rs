// src/wallet/local_wallet.rs
//! Wallet backed by a locally held private key.
//!
//! A local key is always authorized, so account requests never prompt.

use crate::blockchain::evm_client::EvmClient;
use crate::contracts::diploma_registry::EvmDiplomaRegistry;
use crate::contracts::DiplomaLedger;
use crate::error::LedgerError;
use crate::models::address::Address;
use crate::wallet::provider::WalletProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// Signing collaborator using the key loaded into an [`EvmClient`].
#[derive(Clone)]
pub struct LocalWalletProvider {
    client: EvmClient,
    /// Address of the deployed DiplomaRegistry contract
    registry_address: Address,
}

impl LocalWalletProvider {
    pub fn new(client: EvmClient, registry_address: Address) -> Self {
        Self { client, registry_address }
    }
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn authorized_accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(vec![self.client.address()])
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(vec![self.client.address()])
    }

    async fn active_address(&self) -> Result<Address, LedgerError> {
        Ok(self.client.address())
    }

    async fn bind_registry(&self, caller: &Address) -> Result<Arc<dyn DiplomaLedger>, LedgerError> {
        if *caller != self.client.address() {
            return Err(LedgerError::Transport(format!(
                "local key signs as {}, not {}",
                self.client.address(),
                caller
            )));
        }
        let registry = EvmDiplomaRegistry::new(self.client.client(), self.registry_address)?;
        Ok(Arc::new(registry))
    }
}
