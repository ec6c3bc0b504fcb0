pub mod evm_client;
