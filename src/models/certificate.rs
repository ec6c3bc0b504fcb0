// src/models/certificate.rs
//! Verification artifact bound to one diploma export.

use crate::models::diploma::DiplomaRecord;
use crate::utils::crypto::certificate_fingerprint;
use serde::{Deserialize, Serialize};

/// Tamper-evidence data generated for a single export of a diploma.
///
/// Artifacts are transient: a fresh one is produced on every export and
/// nothing here is written back to the ledger.
///
/// # Fields
/// - `certificate_id`: random UUID v4, unique per export
/// - `fingerprint`: hex Keccak-256 over the record fields and `certificate_id`
/// - `verification_url`: lookup locator ending in `certificate_id`
/// - `verification_payload`: the exact text encoded into the QR image
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateArtifact {
    pub certificate_id: String,
    pub fingerprint: String,
    pub verification_url: String,
    pub verification_payload: String,
}

impl CertificateArtifact {
    /// Recomputes the fingerprint from `record` and this artifact's id.
    ///
    /// Verification needs the retained `certificate_id`; the record alone is
    /// not enough to reproduce the fingerprint.
    pub fn matches(&self, record: &DiplomaRecord) -> bool {
        certificate_fingerprint(record, &self.certificate_id) == self.fingerprint
    }

    /// Leading fingerprint digits for display next to the full id.
    pub fn short_fingerprint(&self) -> String {
        let head: String = self.fingerprint.chars().take(16).collect();
        format!("{}…", head)
    }
}
