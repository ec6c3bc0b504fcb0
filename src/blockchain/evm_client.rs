// src/blockchain/evm_client.rs
//! EVM JSON-RPC client.
//!
//! Wraps an HTTP provider and a local signing key into the
//! `SignerMiddleware` every contract handle in this crate is built on.

use crate::models::address::Address;
use anyhow::{Context, Result};
use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
};
use log::info;
use std::sync::Arc;

/// Provider plus signer, shared by every contract handle.
pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// EVM client for managing the signing wallet and its RPC connection.
#[derive(Clone)]
pub struct EvmClient {
    client: Arc<SignerClient>,
}

impl EvmClient {
    /// Connects to an RPC endpoint and attaches the signing key.
    ///
    /// # Arguments
    /// * `rpc_url` - JSON-RPC endpoint URL
    /// * `private_key` - Hex-encoded private key (with or without 0x prefix)
    ///
    /// # Errors
    /// Returns error if:
    /// - The RPC URL is malformed
    /// - The private key is invalid
    /// - The chain ID cannot be retrieved
    pub async fn connect(rpc_url: &str, private_key: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("invalid RPC url {}", rpc_url))?;

        let wallet: LocalWallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse()
            .context("PRIVATE_KEY is not a valid secp256k1 key")?;

        let chain_id = provider
            .get_chainid()
            .await
            .context("failed to fetch chain id")?
            .as_u64();

        let client = SignerMiddleware::new(provider, wallet.with_chain_id(chain_id));
        let connected = Self { client: Arc::new(client) };
        info!("connected to chain {} as {}", chain_id, connected.address());
        Ok(connected)
    }

    /// Address of the signing wallet.
    pub fn address(&self) -> Address {
        Address::from(self.client.address())
    }

    pub fn client(&self) -> Arc<SignerClient> {
        self.client.clone()
    }
}
