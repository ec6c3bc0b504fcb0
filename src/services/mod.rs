//! Registry services: identity, authorization, records, commands and export.

pub mod api_server;
pub mod authorization;
pub mod certificate;
pub mod command_processor;
pub mod export;
pub mod identity;
pub mod record_store;
pub mod registry_service;
pub mod session;
