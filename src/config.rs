// src/config.rs
//! Runtime configuration.
//!
//! Values come from the process environment (after `.env` is loaded), with
//! defaults for everything except the registry contract address.
//!
//! | Variable                   | Default                               |
//! |----------------------------|---------------------------------------|
//! | `RPC_URL`                  | `http://127.0.0.1:8545`               |
//! | `PRIVATE_KEY`              | none (no wallet)                      |
//! | `DIPLOMA_REGISTRY_ADDRESS` | required                              |
//! | `VERIFY_BASE_URL`          | `https://verify.diploma-registry.app` |
//! | `BIND_ADDR`                | `127.0.0.1:3000`                      |
//! | `QR_PIXEL_SIZE`            | `8`                                   |
//! | `QR_MARGIN`                | `2`                                   |

use crate::services::export::QrRenderOptions;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub rpc_url: String,
    /// Hex key of the signing wallet. Without it the service runs but every
    /// session fails with a missing-wallet error.
    pub private_key: Option<String>,
    pub diploma_registry_address: String,
    pub verify_base_url: String,
    pub bind_addr: String,
    pub qr_pixel_size: u32,
    pub qr_margin: u32,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::default())
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("rpc_url", "http://127.0.0.1:8545")?
            .set_default("verify_base_url", "https://verify.diploma-registry.app")?
            .set_default("bind_addr", "127.0.0.1:3000")?
            .set_default("qr_pixel_size", 8)?
            .set_default("qr_margin", 2)?
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    pub fn qr_options(&self) -> QrRenderOptions {
        QrRenderOptions {
            pixel_size: self.qr_pixel_size,
            margin: self.qr_margin,
            ..QrRenderOptions::default()
        }
    }
}
