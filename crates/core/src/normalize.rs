//! Lookup-response normalisation.
//!
//! The backend's lookup answer is duck-typed: it may be a bare result object
//! or wrap a list of results, practitioner options may be an array or an
//! object holding a `snomed` array, LOINC fields may be nested or flattened,
//! and the technical sections can hang off either the envelope or the result
//! object. All of that variance is resolved exactly once here, into a
//! [`CanonicalResult`] the rest of the system can rely on. Normalisation
//! never fails; missing or malformed fields default to absent.

use crate::options::{first_string, merge_options, SnomedOption};
use fhir::LoincEntry;
use laybridge_types::SnomedCode;
use serde_json::Value;

/// Verbatim passthrough of the technical candidate sections.
///
/// These feed a debug panel and are intentionally not deduplicated or
/// reshaped; score fields and any extra keys survive untouched.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TechnicalBlock {
    pub snomed: Vec<Value>,
    pub loinc: Vec<Value>,
}

impl TechnicalBlock {
    pub fn is_empty(&self) -> bool {
        self.snomed.is_empty() && self.loinc.is_empty()
    }

    /// Render both sections as one JSON object, the debug-panel copy surface.
    pub fn to_json_value(&self) -> Value {
        serde_json::json!({ "snomed": self.snomed, "loinc": self.loinc })
    }
}

/// The normalised shape of one lookup answer.
///
/// Replaced wholesale on every new lookup or successful save; never mutated
/// in place.
#[derive(Clone, Debug, PartialEq)]
pub struct CanonicalResult {
    /// The lay term that was searched or echoed back.
    pub text: String,

    /// Plain-language explanation for the patient.
    pub patient_view: Option<String>,

    /// Clinical-register explanation for the practitioner.
    pub practitioner_view: Option<String>,

    /// LOINC mapping, when the term resolves to a lab observable.
    pub loinc: Option<LoincEntry>,

    /// Deduplicated SNOMED candidates, insertion-ordered by first appearance
    /// across the practitioner and technical sections.
    pub snomed_options: Vec<SnomedOption>,

    /// Technical candidate sections, passed through for display.
    pub technical: TechnicalBlock,

    /// The SNOMED code the backend currently has on file for this term.
    ///
    /// May name a code that is absent from `snomed_options`; see
    /// [`crate::Session::load`] for how that is reconciled.
    pub saved_code: Option<SnomedCode>,

    /// A ready-made codeable concept supplied by the backend, authoritative
    /// over anything computed client-side.
    pub raw_codeable_concept: Option<Value>,
}

impl CanonicalResult {
    /// Find a candidate option by code.
    pub fn option_by_code(&self, code: &str) -> Option<&SnomedOption> {
        self.snomed_options.iter().find(|o| o.code == *code)
    }

    /// True when the term resolved to a lab-only (LOINC) item with no SNOMED
    /// candidates to pick from.
    pub fn is_loinc_only(&self) -> bool {
        self.loinc.is_some() && self.snomed_options.is_empty()
    }
}

/// The two envelope shapes a lookup response can arrive in.
#[derive(Clone, Copy)]
enum ResultObject<'a> {
    /// `{results: [ ... ]}` with at least one element; the first is the one.
    ListWrapped(&'a Value),
    /// The response itself is the result object.
    Bare(&'a Value),
}

impl<'a> ResultObject<'a> {
    fn classify(raw: &'a Value) -> Self {
        match raw.get("results").and_then(Value::as_array) {
            Some(results) if !results.is_empty() => ResultObject::ListWrapped(&results[0]),
            _ => ResultObject::Bare(raw),
        }
    }

    fn value(self) -> &'a Value {
        match self {
            ResultObject::ListWrapped(v) | ResultObject::Bare(v) => v,
        }
    }
}

/// The shapes the practitioner options field can take.
#[derive(Clone, Copy)]
enum PractitionerOptions<'a> {
    /// `practitioner_options: {snomed: [...]}` — preferred when present.
    Nested(&'a [Value]),
    /// `practitioner_options: [...]`.
    Flat(&'a [Value]),
    Missing,
}

impl<'a> PractitionerOptions<'a> {
    fn classify(result: &'a Value) -> Self {
        let Some(field) = result.get("practitioner_options") else {
            return PractitionerOptions::Missing;
        };
        if let Some(nested) = field.get("snomed").and_then(Value::as_array) {
            return PractitionerOptions::Nested(nested);
        }
        match field.as_array() {
            Some(flat) => PractitionerOptions::Flat(flat),
            None => PractitionerOptions::Missing,
        }
    }

    fn entries(self) -> &'a [Value] {
        match self {
            PractitionerOptions::Nested(v) | PractitionerOptions::Flat(v) => v,
            PractitionerOptions::Missing => &[],
        }
    }
}

/// A technical section array, with the envelope taking precedence over the
/// result object. The two sections are resolved independently; a response can
/// carry `technical.snomed` on the envelope and `technical.loinc` on the
/// result.
fn technical_section<'a>(raw: &'a Value, result: &'a Value, system: &str) -> &'a [Value] {
    for source in [raw, result] {
        if let Some(entries) = source
            .get("technical")
            .and_then(|t| t.get(system))
            .and_then(Value::as_array)
        {
            return entries;
        }
    }
    &[]
}

fn loinc_entry(result: &Value) -> Option<LoincEntry> {
    let nested = result.get("loinc").filter(|v| v.is_object());
    let code = nested
        .and_then(|l| first_string(l, &["code"]))
        .or_else(|| first_string(result, &["loinc_code"]))?;
    let display = nested
        .and_then(|l| first_string(l, &["display"]))
        .or_else(|| first_string(result, &["loinc_display"]));
    Some(LoincEntry { code, display })
}

/// Normalise one raw lookup response.
///
/// `fallback_text` (normally the query the user typed) is used when the
/// response does not echo a term back.
pub fn normalize(raw: &Value, fallback_text: &str) -> CanonicalResult {
    let result = ResultObject::classify(raw).value();

    let primary = PractitionerOptions::classify(result).entries();
    let tech_snomed = technical_section(raw, result, "snomed");
    let tech_loinc = technical_section(raw, result, "loinc");

    let snomed_options = merge_options(primary, tech_snomed);

    let saved_code = first_string(result, &["snomed"]).and_then(|c| SnomedCode::new(c).ok());

    let raw_codeable_concept = result
        .get("codeable_concept")
        .filter(|v| !v.is_null())
        .cloned();

    CanonicalResult {
        text: first_string(result, &["text", "query", "term"])
            .unwrap_or_else(|| fallback_text.to_owned()),
        patient_view: first_string(result, &["patient_view"]),
        practitioner_view: first_string(result, &["practitioner_view"]),
        loinc: loinc_entry(result),
        snomed_options,
        technical: TechnicalBlock {
            snomed: tech_snomed.to_vec(),
            loinc: tech_loinc.to_vec(),
        },
        saved_code,
        raw_codeable_concept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_result_object_defaults_everything() {
        let raw = json!({"results": [{}]});
        let result = normalize(&raw, "chest pain");

        assert_eq!(result.text, "chest pain");
        assert!(result.patient_view.is_none());
        assert!(result.practitioner_view.is_none());
        assert!(result.loinc.is_none());
        assert!(result.snomed_options.is_empty());
        assert!(result.technical.is_empty());
        assert!(result.saved_code.is_none());
        assert!(result.raw_codeable_concept.is_none());
    }

    #[test]
    fn bare_result_object_is_accepted() {
        let raw = json!({
            "term": "high blood pressure",
            "patient_view": "Your blood pressure is higher than normal.",
            "snomed": "38341003",
        });
        let result = normalize(&raw, "hbp");

        assert_eq!(result.text, "high blood pressure");
        assert_eq!(
            result.patient_view.as_deref(),
            Some("Your blood pressure is higher than normal.")
        );
        assert_eq!(result.saved_code.as_ref().map(SnomedCode::as_str), Some("38341003"));
    }

    #[test]
    fn empty_results_list_falls_back_to_envelope() {
        let raw = json!({"results": [], "query": "watery eyes"});
        let result = normalize(&raw, "fallback");
        assert_eq!(result.text, "watery eyes");
    }

    #[test]
    fn first_result_wins_in_list_wrapped_responses() {
        let raw = json!({
            "results": [
                {"term": "migraine", "snomed": "37796009"},
                {"term": "headache", "snomed": "25064002"},
            ],
        });
        let result = normalize(&raw, "head hurts");

        assert_eq!(result.text, "migraine");
        assert_eq!(result.saved_code.as_ref().map(SnomedCode::as_str), Some("37796009"));
    }

    #[test]
    fn nested_practitioner_options_are_preferred_over_flat() {
        let raw = json!({
            "results": [{
                "practitioner_options": {
                    "snomed": [{"code": "22298006", "display": "Myocardial infarction"}],
                },
            }],
        });
        let result = normalize(&raw, "heart attack");

        assert_eq!(result.snomed_options.len(), 1);
        assert_eq!(result.snomed_options[0].code.as_str(), "22298006");
    }

    #[test]
    fn flat_practitioner_options_array_is_accepted() {
        let raw = json!({
            "results": [{
                "practitioner_options": [{"code": "40930008", "display": "Hypothyroidism"}],
            }],
        });
        let result = normalize(&raw, "underactive thyroid");
        assert_eq!(result.snomed_options[0].code.as_str(), "40930008");
    }

    #[test]
    fn null_practitioner_options_mean_no_primary_candidates() {
        // The backend sends null for lab-only terms.
        let raw = json!({
            "results": [{
                "practitioner_options": null,
                "loinc": {"code": "2160-0", "display": "Creatinine [Mass/volume] in Serum"},
            }],
        });
        let result = normalize(&raw, "serum creatinine");

        assert!(result.snomed_options.is_empty());
        assert!(result.is_loinc_only());
    }

    #[test]
    fn technical_snomed_candidates_merge_behind_practitioner_options() {
        let raw = json!({
            "technical": {
                "snomed": [
                    {"code": "22298006", "display": "MI (technical dup)", "score": 88},
                    {"code": "401303003", "display": "Acute STEMI", "score": 72},
                ],
            },
            "results": [{
                "practitioner_options": {"snomed": [{"code": "22298006", "display": "MI"}]},
            }],
        });
        let result = normalize(&raw, "heart attack");

        let codes: Vec<&str> = result.snomed_options.iter().map(|o| o.code.as_str()).collect();
        assert_eq!(codes, ["22298006", "401303003"]);
        assert_eq!(result.snomed_options[0].display, "MI");
    }

    #[test]
    fn envelope_technical_takes_precedence_over_result_technical() {
        let raw = json!({
            "technical": {"snomed": [{"code": "1", "display": "envelope"}]},
            "results": [{
                "technical": {
                    "snomed": [{"code": "2", "display": "result"}],
                    "loinc": [{"code": "718-7", "display": "Hemoglobin"}],
                },
            }],
        });
        let result = normalize(&raw, "x");

        assert_eq!(result.technical.snomed, vec![json!({"code": "1", "display": "envelope"})]);
        // loinc is absent on the envelope, so the result object's section is used
        assert_eq!(result.technical.loinc, vec![json!({"code": "718-7", "display": "Hemoglobin"})]);
    }

    #[test]
    fn technical_passthrough_keeps_scores_verbatim() {
        let raw = json!({
            "technical": {"snomed": [{"code": "3", "display": "d", "score": 61}]},
        });
        let result = normalize(&raw, "x");
        assert_eq!(result.technical.snomed[0]["score"], json!(61));
    }

    #[test]
    fn flat_loinc_fields_are_read_when_no_nested_object() {
        let raw = json!({
            "results": [{"loinc_code": "4548-4", "loinc_display": "Hemoglobin A1c"}],
        });
        let result = normalize(&raw, "a1c");

        let loinc = result.loinc.expect("loinc entry");
        assert_eq!(loinc.code, "4548-4");
        assert_eq!(loinc.display.as_deref(), Some("Hemoglobin A1c"));
    }

    #[test]
    fn numeric_saved_code_is_stringified() {
        let raw = json!({"results": [{"snomed": 38341003}]});
        let result = normalize(&raw, "x");
        assert_eq!(result.saved_code.as_ref().map(SnomedCode::as_str), Some("38341003"));
    }

    #[test]
    fn codeable_concept_passes_through_and_null_is_absent() {
        let concept = json!({
            "coding": [{"system": "http://snomed.info/sct", "code": "44054006", "display": "DM2"}],
            "text": "sugar disease",
        });
        let raw = json!({"results": [{"codeable_concept": concept}]});
        assert_eq!(normalize(&raw, "x").raw_codeable_concept, Some(concept));

        let raw = json!({"results": [{"codeable_concept": null}]});
        assert!(normalize(&raw, "x").raw_codeable_concept.is_none());
    }

    #[test]
    fn never_panics_on_hostile_shapes() {
        for raw in [
            json!(null),
            json!("just a string"),
            json!(42),
            json!([1, 2, 3]),
            json!({"results": "not an array"}),
            json!({"results": [null]}),
            json!({"practitioner_options": {"snomed": "not an array"}}),
            json!({"technical": {"snomed": {"not": "an array"}}}),
            json!({"loinc": "not an object"}),
        ] {
            let result = normalize(&raw, "fallback");
            assert_eq!(result.text, "fallback");
        }
    }
}
