// src/services/export.rs
//! Export binding between a diploma, its certificate artifact and the
//! rendering collaborators.
//!
//! Page layout and QR image generation belong to the [`QrEncoder`] and
//! [`DocumentRenderer`] collaborators. This module decides what goes on the
//! document: every diploma field, the issue date, the certificate id, the
//! shortened fingerprint and a QR image of the verification payload.
//!
//! The HTTP API only serves [`ExportRenderer::bind`]; the client renders the
//! page itself. [`ExportRenderer::render`] and [`ExportRenderer::export`]
//! are the entry points for a renderer embedded in-process, which supplies
//! its own [`QrEncoder`] and [`DocumentRenderer`].

use crate::error::DiplomaError;
use crate::models::certificate::CertificateArtifact;
use crate::models::diploma::DiplomaRecord;
use crate::services::certificate::CertificateGenerator;
use chrono::NaiveDate;
use log::info;
use serde::{Deserialize, Serialize};

/// Two-tone QR rendering options handed to the encoder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QrRenderOptions {
    pub pixel_size: u32,
    pub margin: u32,
    pub dark: String,
    pub light: String,
}

impl Default for QrRenderOptions {
    fn default() -> Self {
        Self {
            pixel_size: 8,
            margin: 2,
            dark: "#000000".into(),
            light: "#ffffff".into(),
        }
    }
}

/// Encoded QR image, e.g. a PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Turns verification payload text into an image.
pub trait QrEncoder: Send + Sync {
    fn encode(&self, payload: &str, options: &QrRenderOptions) -> anyhow::Result<QrImage>;
}

/// Lays out an [`ExportDocument`] and returns the finished artifact bytes.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, document: &ExportDocument) -> anyhow::Result<Vec<u8>>;
}

/// One labelled line of text on the exported document.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DocumentLine {
    pub label: &'static str,
    pub value: String,
}

/// Everything an export shows, before any rendering happens.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportBinding {
    pub file_name: String,
    pub issue_date: NaiveDate,
    pub record: DiplomaRecord,
    pub certificate: CertificateArtifact,
}

impl ExportBinding {
    /// Text lines in display order.
    pub fn lines(&self) -> Vec<DocumentLine> {
        let line = |label, value: String| DocumentLine { label, value };
        vec![
            line("Student", self.record.student_name.clone()),
            line("Diploma", self.record.diploma_title.clone()),
            line("Institution", self.record.institution.clone()),
            line("Year", self.record.year.to_string()),
            line("Issued", self.issue_date.format("%Y-%m-%d").to_string()),
            line("Certificate ID", self.certificate.certificate_id.clone()),
            line("Fingerprint", self.certificate.short_fingerprint()),
        ]
    }
}

/// Input to the document renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub file_name: String,
    pub heading: &'static str,
    pub lines: Vec<DocumentLine>,
    pub qr: QrImage,
}

/// A rendered export together with the binding it was produced from.
#[derive(Debug, Clone)]
pub struct ExportedArtifact {
    pub binding: ExportBinding,
    pub bytes: Vec<u8>,
}

/// Produces certificate-backed exports of diploma records.
pub struct ExportRenderer {
    generator: CertificateGenerator,
    qr_options: QrRenderOptions,
}

impl ExportRenderer {
    pub fn new(generator: CertificateGenerator, qr_options: QrRenderOptions) -> Self {
        Self { generator, qr_options }
    }

    pub fn qr_options(&self) -> &QrRenderOptions {
        &self.qr_options
    }

    /// Generates a fresh certificate for `record` and binds it to the export.
    ///
    /// Called once per export; two bindings of the same record carry
    /// different certificate ids and fingerprints.
    ///
    /// # Errors
    /// [`DiplomaError::Validation`] if the record is incomplete.
    pub fn bind(&self, record: &DiplomaRecord, issue_date: NaiveDate) -> Result<ExportBinding, DiplomaError> {
        record.validate()?;
        let certificate = self.generator.generate(record);
        Ok(ExportBinding {
            file_name: export_file_name(record),
            issue_date,
            record: record.clone(),
            certificate,
        })
    }

    /// Renders a bound export through the collaborators.
    ///
    /// # Errors
    /// [`DiplomaError::Render`] when either collaborator fails.
    pub fn render(
        &self,
        binding: ExportBinding,
        qr: &dyn QrEncoder,
        renderer: &dyn DocumentRenderer,
    ) -> Result<ExportedArtifact, DiplomaError> {
        let image = qr
            .encode(&binding.certificate.verification_payload, &self.qr_options)
            .map_err(|e| DiplomaError::Render(format!("QR encoding failed: {}", e)))?;

        let document = ExportDocument {
            file_name: binding.file_name.clone(),
            heading: "Diploma Certificate",
            lines: binding.lines(),
            qr: image,
        };
        let bytes = renderer
            .render(&document)
            .map_err(|e| DiplomaError::Render(format!("document rendering failed: {}", e)))?;

        info!(
            "exported {} with certificate {}",
            binding.file_name, binding.certificate.certificate_id
        );
        Ok(ExportedArtifact { binding, bytes })
    }

    /// Binds and renders in one step.
    pub fn export(
        &self,
        record: &DiplomaRecord,
        issue_date: NaiveDate,
        qr: &dyn QrEncoder,
        renderer: &dyn DocumentRenderer,
    ) -> Result<ExportedArtifact, DiplomaError> {
        let binding = self.bind(record, issue_date)?;
        self.render(binding, qr, renderer)
    }
}

/// `Diploma_<name>_<year>.pdf`, with whitespace runs in the name collapsed to `_`.
pub fn export_file_name(record: &DiplomaRecord) -> String {
    let name = record.student_name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("Diploma_{}_{}.pdf", name, record.year)
}
