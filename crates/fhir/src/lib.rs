//! FHIR wire/boundary support for laybridge.
//!
//! This crate provides **wire models** for the coded-concept JSON that the
//! lookup tool exports (copy-to-clipboard or downstream submission):
//! - `Coding` / `CodeableConcept` — the `{coding: [{system, code, display}], text}` shape
//! - `CodedConcept` — the export type, distinguishing a server-supplied concept
//!   (passed through verbatim) from one derived client-side
//!
//! This crate focuses on:
//! - FHIR semantic alignment (without FHIR REST transport)
//! - serialisation to the exact JSON shape consumers expect
//!
//! It deliberately contains no lookup or selection logic; that lives in
//! `laybridge-core`.

use serde::{Deserialize, Serialize};

pub mod concept;

pub use concept::{CodeableConcept, CodedConcept, Coding};

/// Canonical system URI for SNOMED CT codings.
pub const SNOMED_CT_SYSTEM: &str = "http://snomed.info/sct";

/// Canonical system URI for LOINC codings.
pub const LOINC_SYSTEM: &str = "http://loinc.org";

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// A LOINC code/display pair as surfaced in lookup results.
///
/// Kept flat: the backend supplies these either nested under a `loinc` object
/// or as flattened fields, and the normalizer folds both into this one shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoincEntry {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}
