// src/utils/crypto.rs
//! Cryptographic utilities optimized for blockchain compatibility.
//!
//! Uses Keccak-256 (Ethereum's standard hash function) for all operations.

use crate::models::diploma::DiplomaRecord;
use ethers::utils::{hex, keccak256};

/// Separator placed between fingerprint input fields so that shifting text
/// from one field into its neighbour changes the digest.
const FIELD_SEPARATOR: &str = "|";

/// Computes a Keccak-256 hash of the input data (Ethereum-compatible).
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    keccak256(data)
}

/// Computes the hex-encoded certificate fingerprint.
///
/// The digest covers, in this order: student name, diploma title,
/// institution, year and certificate id.
///
/// # Returns
/// 64 lowercase hex characters (256-bit digest), no `0x` prefix.
pub fn certificate_fingerprint(record: &DiplomaRecord, certificate_id: &str) -> String {
    let year = record.year.to_string();
    let input = [
        record.student_name.as_str(),
        record.diploma_title.as_str(),
        record.institution.as_str(),
        year.as_str(),
        certificate_id,
    ]
    .join(FIELD_SEPARATOR);

    hex::encode(hash_data(input.as_bytes()))
}
