//! Coded-concept wire models.
//!
//! The export surface of the lookup tool is a single JSON object shaped like a
//! FHIR CodeableConcept. Two sources can produce it: the backend may supply a
//! ready-made concept on a lookup result (authoritative, passed through byte
//! for byte), or the client derives one from the current selection state. The
//! [`CodedConcept`] enum keeps those two cases distinct while serialising to
//! the same JSON surface.

use crate::{FhirResult, SNOMED_CT_SYSTEM};
use laybridge_types::SnomedCode;
use serde::{Deserialize, Serialize};

/// A single coding within a codeable concept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coding {
    /// Code system URI, e.g. `http://snomed.info/sct`.
    pub system: String,

    /// The code within that system.
    pub code: String,

    /// Human-readable display for the code, when one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A FHIR-shaped codeable concept: one or more codings plus free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeableConcept {
    pub coding: Vec<Coding>,

    /// The lay text the concept was derived from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Build a single-coding SNOMED CT concept.
    ///
    /// `display` may be absent when only a bare code is known (for example a
    /// persisted code whose display text could not be recovered).
    pub fn snomed(code: &SnomedCode, display: Option<String>, text: impl Into<String>) -> Self {
        Self {
            coding: vec![Coding {
                system: SNOMED_CT_SYSTEM.to_owned(),
                code: code.as_str().to_owned(),
                display,
            }],
            text: Some(text.into()),
        }
    }
}

/// The exportable concept, tagged by provenance.
///
/// `Supplied` wraps whatever JSON object the backend attached to the result;
/// it is never reshaped, because the server is authoritative when it provides
/// one. `Derived` is built client-side from the preview or saved code.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CodedConcept {
    Supplied(serde_json::Value),
    Derived(CodeableConcept),
}

impl CodedConcept {
    /// Render as pretty-printed JSON, the copy-to-clipboard surface.
    pub fn to_pretty_json(&self) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render as a JSON value, for programmatic consumers.
    pub fn to_json_value(&self) -> FhirResult<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snomed_concept_has_expected_shape() {
        let code = SnomedCode::new("44054006").expect("valid code");
        let concept = CodeableConcept::snomed(&code, Some("Diabetes".into()), "sugar disease");

        let value = serde_json::to_value(&concept).expect("serialise concept");
        assert_eq!(
            value,
            json!({
                "coding": [{
                    "system": "http://snomed.info/sct",
                    "code": "44054006",
                    "display": "Diabetes",
                }],
                "text": "sugar disease",
            })
        );
    }

    #[test]
    fn display_is_omitted_when_unknown() {
        let code = SnomedCode::new("271737000").expect("valid code");
        let concept = CodeableConcept::snomed(&code, None, "anemia");

        let value = serde_json::to_value(&concept).expect("serialise concept");
        assert!(value["coding"][0].get("display").is_none());
    }

    #[test]
    fn supplied_concept_serialises_verbatim() {
        let raw = json!({
            "coding": [{"system": "http://snomed.info/sct", "code": "38341003"}],
            "text": "high blood pressure",
            "extra_server_field": 17,
        });
        let concept = CodedConcept::Supplied(raw.clone());

        let value = concept.to_json_value().expect("serialise concept");
        assert_eq!(value, raw);
    }
}
