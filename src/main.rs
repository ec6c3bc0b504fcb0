// src/main.rs

//! # Diploma Registry - Main Entry Point
//!
//! Loads configuration, connects the signing wallet to the EVM node, resolves
//! the session and starts the API server.
//!
//! ## Environment Variables
//! - `DIPLOMA_REGISTRY_ADDRESS`: Deployed DiplomaRegistry contract address
//! - `PRIVATE_KEY`: (Optional) Signing wallet private key
//! - `RPC_URL`: (Optional) JSON-RPC endpoint (default: http://127.0.0.1:8545)
//! - `VERIFY_BASE_URL`, `BIND_ADDR`, `QR_PIXEL_SIZE`, `QR_MARGIN`: see `config`

use anyhow::Context;
use diploma_registry::blockchain::evm_client::EvmClient;
use diploma_registry::config::AppConfig;
use diploma_registry::models::address::Address;
use diploma_registry::services::api_server::ApiServer;
use diploma_registry::services::certificate::CertificateGenerator;
use diploma_registry::services::export::ExportRenderer;
use diploma_registry::services::identity::IdentityResolver;
use diploma_registry::services::registry_service::DiplomaRegistryService;
use diploma_registry::wallet::local_wallet::LocalWalletProvider;
use diploma_registry::wallet::provider::WalletProvider;
use dotenv::dotenv;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Connect the signing wallet (when a key is configured)
/// 3. Resolve the session
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load().context("invalid configuration")?;
    let registry_address = Address::parse(&config.diploma_registry_address)
        .context("DIPLOMA_REGISTRY_ADDRESS is not a valid address")?;

    let wallet = match config.private_key.as_deref() {
        Some(key) => {
            let client = EvmClient::connect(&config.rpc_url, key).await?;
            let provider: Arc<dyn WalletProvider> = Arc::new(LocalWalletProvider::new(client, registry_address));
            Some(provider)
        }
        None => {
            warn!("PRIVATE_KEY is not set; starting without a wallet");
            None
        }
    };

    let exporter = ExportRenderer::new(CertificateGenerator::new(config.verify_base_url.clone()), config.qr_options());
    let service = Arc::new(DiplomaRegistryService::new(IdentityResolver::new(wallet), exporter));

    // A failed session still serves /session so the front end can show why.
    match service.connect().await {
        Ok(status) => info!("session ready: {:?}", status),
        Err(e) if e.is_recoverable() => warn!("session not ready: {}", e),
        Err(e) => error!("{}", e),
    }

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("BIND_ADDR '{}' is not a socket address", config.bind_addr))?;
    ApiServer::new(service).run(addr).await
}
