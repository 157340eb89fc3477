//! Codeable-concept derivation.
//!
//! Builds the exportable FHIR-shaped concept from whichever source of truth
//! is authoritative at the moment. Precedence, first match wins:
//!
//! 1. a concept the backend supplied on the result (passed through verbatim)
//! 2. the user's preview selection (an unsaved draft outranks the persisted
//!    code for display purposes)
//! 3. the persisted saved code, with a best-effort display recovered from the
//!    practitioner view
//!
//! With none of those, there is no concept to export.

use crate::normalize::CanonicalResult;
use crate::session::PreviewSelection;
use fhir::{CodeableConcept, CodedConcept};

/// Best-effort display for a bare saved code: the leading segment of the
/// practitioner view, up to the first " (". The backend renders practitioner
/// views as "Display (lay term)", so this usually recovers the display text.
fn display_from_practitioner_view(result: &CanonicalResult) -> Option<String> {
    let view = result.practitioner_view.as_deref()?;
    let leading = view.split(" (").next().unwrap_or_default();
    if leading.is_empty() {
        None
    } else {
        Some(leading.to_owned())
    }
}

/// Derive the exportable concept from the current state.
///
/// `fallback_text` (normally the query the user typed) fills the concept's
/// `text` when the result carries no echoed term.
pub fn build_codeable_concept(
    result: &CanonicalResult,
    preview: Option<&PreviewSelection>,
    fallback_text: &str,
) -> Option<CodedConcept> {
    if let Some(raw) = &result.raw_codeable_concept {
        return Some(CodedConcept::Supplied(raw.clone()));
    }

    let text = if result.text.is_empty() {
        fallback_text
    } else {
        result.text.as_str()
    };

    if let Some(preview) = preview.filter(|p| !p.display.is_empty()) {
        return Some(CodedConcept::Derived(CodeableConcept::snomed(
            &preview.code,
            Some(preview.display.clone()),
            text,
        )));
    }

    if let Some(saved) = &result.saved_code {
        return Some(CodedConcept::Derived(CodeableConcept::snomed(
            saved,
            display_from_practitioner_view(result),
            text,
        )));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use laybridge_types::SnomedCode;
    use serde_json::json;

    fn preview(code: &str, display: &str) -> PreviewSelection {
        PreviewSelection {
            code: SnomedCode::new(code).expect("valid code"),
            display: display.to_owned(),
        }
    }

    #[test]
    fn server_supplied_concept_wins_over_conflicting_preview() {
        let supplied = json!({
            "coding": [{"system": "http://snomed.info/sct", "code": "38341003", "display": "HTN"}],
            "text": "high blood pressure",
        });
        let result = normalize(&json!({"codeable_concept": supplied}), "hbp");

        let concept = build_codeable_concept(&result, Some(&preview("44054006", "Diabetes")), "hbp")
            .expect("concept");
        assert_eq!(concept, CodedConcept::Supplied(supplied));
    }

    #[test]
    fn preview_builds_a_snomed_concept_with_result_text() {
        let result = normalize(&json!({"term": "sugar disease"}), "fallback");

        let concept = build_codeable_concept(&result, Some(&preview("44054006", "Diabetes")), "fallback")
            .expect("concept");
        let value = concept.to_json_value().expect("json");
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
    fn preview_outranks_saved_code() {
        let result = normalize(
            &json!({"term": "sugar disease", "snomed": "73211009"}),
            "fallback",
        );

        let concept = build_codeable_concept(&result, Some(&preview("44054006", "Diabetes")), "fallback")
            .expect("concept");
        let value = concept.to_json_value().expect("json");
        assert_eq!(value["coding"][0]["code"], json!("44054006"));
    }

    #[test]
    fn saved_code_recovers_display_from_practitioner_view() {
        let result = normalize(
            &json!({
                "term": "heart attack",
                "snomed": "22298006",
                "practitioner_view": "Myocardial infarction (heart attack)",
            }),
            "heart attack",
        );

        let concept = build_codeable_concept(&result, None, "heart attack").expect("concept");
        let value = concept.to_json_value().expect("json");
        assert_eq!(value["coding"][0]["code"], json!("22298006"));
        assert_eq!(value["coding"][0]["display"], json!("Myocardial infarction"));
        assert_eq!(value["text"], json!("heart attack"));
    }

    #[test]
    fn saved_code_without_practitioner_view_omits_display() {
        let result = normalize(&json!({"term": "x", "snomed": "22298006"}), "x");

        let concept = build_codeable_concept(&result, None, "x").expect("concept");
        let value = concept.to_json_value().expect("json");
        assert!(value["coding"][0].get("display").is_none());
    }

    #[test]
    fn preview_with_empty_display_falls_through_to_saved_code() {
        let result = normalize(
            &json!({
                "term": "heart attack",
                "snomed": "22298006",
                "practitioner_view": "Myocardial infarction (heart attack)",
            }),
            "heart attack",
        );

        let concept = build_codeable_concept(&result, Some(&preview("401303003", "")), "heart attack")
            .expect("concept");
        let value = concept.to_json_value().expect("json");
        assert_eq!(value["coding"][0]["code"], json!("22298006"));
    }

    #[test]
    fn nothing_to_build_yields_none() {
        let result = normalize(&json!({}), "chest pain");
        assert!(build_codeable_concept(&result, None, "chest pain").is_none());
    }

    #[test]
    fn fallback_text_is_used_when_result_text_is_empty() {
        let mut result = normalize(&json!({}), "");
        result.text = String::new();

        let concept = build_codeable_concept(&result, Some(&preview("44054006", "Diabetes")), "sugar")
            .expect("concept");
        let value = concept.to_json_value().expect("json");
        assert_eq!(value["text"], json!("sugar"));
    }
}
