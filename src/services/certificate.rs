// src/services/certificate.rs
//! Certificate fingerprint and verification payload generator.
//!
//! Each export gets a fresh random certificate id. The fingerprint hashes the
//! record fields together with that id, so two exports of the same diploma
//! never share a fingerprint; checking a certificate later requires its id.

use crate::models::certificate::CertificateArtifact;
use crate::models::diploma::DiplomaRecord;
use crate::utils::crypto::certificate_fingerprint;
use log::debug;
use uuid::Uuid;

/// Builds [`CertificateArtifact`]s whose locators point at `verify_base_url`.
#[derive(Debug, Clone)]
pub struct CertificateGenerator {
    verify_base_url: String,
}

impl CertificateGenerator {
    /// # Arguments
    /// * `verify_base_url` - Origin of the verification service, e.g. `https://verify.example.org`
    pub fn new(verify_base_url: impl Into<String>) -> Self {
        let base: String = verify_base_url.into();
        Self { verify_base_url: base.trim_end_matches('/').to_string() }
    }

    /// Generates an artifact with a new UUID v4 certificate id.
    pub fn generate(&self, record: &DiplomaRecord) -> CertificateArtifact {
        self.generate_with_id(record, Uuid::new_v4().to_string())
    }

    /// Generates an artifact for a known certificate id.
    pub fn generate_with_id(&self, record: &DiplomaRecord, certificate_id: String) -> CertificateArtifact {
        let fingerprint = certificate_fingerprint(record, &certificate_id);
        let verification_url = self.verification_url(&certificate_id);
        let verification_payload = format!(
            "DIPLOMA CERTIFICATE\nID: {}\nFingerprint: {}\nVerify: {}",
            certificate_id, fingerprint, verification_url
        );
        debug!("certificate {} generated for {}", certificate_id, record.student_name);

        CertificateArtifact {
            certificate_id,
            fingerprint,
            verification_url,
            verification_payload,
        }
    }

    pub fn verification_url(&self, certificate_id: &str) -> String {
        format!("{}/verify/{}", self.verify_base_url, certificate_id)
    }
}
