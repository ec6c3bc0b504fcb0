// src/models/diploma.rs
//! Diploma record data model.
//!
//! A [`DiplomaRecord`] is the ledger's view of one diploma. A [`DiplomaDraft`]
//! is the raw form input an issuer types before it is validated into a record.

use crate::error::DiplomaError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A diploma recorded against a holder address.
///
/// Records have no durable key on the ledger: a holder's diplomas are an
/// ordered sequence and each record is addressed by its position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct DiplomaRecord {
    /// Full name of the student, e.g. "Alice Martin"
    pub student_name: String,

    /// Diploma title, e.g. "B.Sc. Computer Science"
    pub diploma_title: String,

    /// Awarding institution
    pub institution: String,

    /// Graduation year
    pub year: u32,
}

impl DiplomaRecord {
    pub fn new(
        student_name: impl Into<String>,
        diploma_title: impl Into<String>,
        institution: impl Into<String>,
        year: u32,
    ) -> Self {
        Self {
            student_name: student_name.into(),
            diploma_title: diploma_title.into(),
            institution: institution.into(),
            year,
        }
    }

    /// Checks that every text field carries content.
    ///
    /// # Errors
    /// [`DiplomaError::Validation`] naming the first empty field.
    pub fn validate(&self) -> Result<(), DiplomaError> {
        let fields = [
            ("student name", &self.student_name),
            ("diploma title", &self.diploma_title),
            ("institution", &self.institution),
        ];
        for (label, value) in fields {
            if value.trim().is_empty() {
                return Err(DiplomaError::Validation(format!("{} is required", label)));
            }
        }
        Ok(())
    }

    /// Text the search box matches against.
    fn search_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.student_name, self.diploma_title, self.institution, self.year
        )
        .to_lowercase()
    }
}

impl fmt::Display for DiplomaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {} ({}, {})",
            self.student_name, self.diploma_title, self.institution, self.year
        )
    }
}

/// Raw form input for creating or editing a diploma.
///
/// All fields are kept as typed text; [`DiplomaDraft::to_record`] trims and
/// validates them.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DiplomaDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub year: String,
}

impl DiplomaDraft {
    /// Converts the form into a record.
    ///
    /// # Errors
    /// [`DiplomaError::Validation`] if any field is blank or the year is not
    /// a non-negative integer.
    pub fn to_record(&self) -> Result<DiplomaRecord, DiplomaError> {
        let name = self.name.trim();
        let title = self.title.trim();
        let institution = self.institution.trim();
        let year = self.year.trim();

        if name.is_empty() || title.is_empty() || institution.is_empty() || year.is_empty() {
            return Err(DiplomaError::Validation("all fields are required".into()));
        }

        let year = year
            .parse::<u32>()
            .map_err(|_| DiplomaError::Validation(format!("year '{}' is not a number", year)))?;

        let record = DiplomaRecord::new(name, title, institution, year);
        record.validate()?;
        Ok(record)
    }
}

impl From<&DiplomaRecord> for DiplomaDraft {
    /// Pre-fills the form when entering edit mode.
    fn from(record: &DiplomaRecord) -> Self {
        Self {
            name: record.student_name.clone(),
            title: record.diploma_title.clone(),
            institution: record.institution.clone(),
            year: record.year.to_string(),
        }
    }
}

/// A record together with its position in the holder's full sequence.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IndexedRecord {
    pub index: usize,
    #[serde(flatten)]
    pub record: DiplomaRecord,
}

/// Case-insensitive search over a holder's diplomas.
///
/// Reported indices are positions in the unfiltered slice, so they remain
/// valid for edit and delete commands.
pub fn filter_records(records: &[DiplomaRecord], query: &str) -> Vec<IndexedRecord> {
    let needle = query.trim().to_lowercase();
    records
        .iter()
        .enumerate()
        .filter(|(_, record)| needle.is_empty() || record.search_text().contains(&needle))
        .map(|(index, record)| IndexedRecord { index, record: record.clone() })
        .collect()
}
