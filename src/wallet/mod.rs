//! Signing collaborators.

pub mod local_wallet;
pub mod provider;
