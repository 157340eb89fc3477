//! SNOMED candidate option normalisation and merging.
//!
//! The backend surfaces candidate codes in two sections of a lookup response:
//! the curated practitioner options and the fuzzier technical candidates. Both
//! arrive as loosely-shaped JSON objects whose field names vary by backend
//! version (`code`/`snomed`/`id`, `display`/`text`/`term`). This module folds
//! each raw entry into a [`SnomedOption`] and merges the two sections into one
//! stable, deduplicated list.

use laybridge_types::SnomedCode;
use serde_json::Value;
use std::collections::HashSet;

/// A candidate SNOMED CT coded term.
///
/// Identity is the code: two options with the same code are the same option,
/// and the display text of the first-encountered instance wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnomedOption {
    pub code: SnomedCode,
    pub display: String,
}

/// Read the first usable string out of `obj` at any of `keys`.
///
/// JSON strings pass through, numbers are stringified (backends have been seen
/// sending codes as bare integers). Empty strings count as absent so later
/// keys still get a chance, mirroring how the response fields actually degrade.
pub(crate) fn first_string(obj: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        match obj.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Fold one raw option object into a [`SnomedOption`].
///
/// Returns `None` when no non-empty code can be extracted; malformed entries
/// degrade to nothing rather than erroring.
pub(crate) fn normalize_option(raw: &Value) -> Option<SnomedOption> {
    let code = first_string(raw, &["code", "snomed", "id"])?;
    let code = SnomedCode::new(code).ok()?;
    let display = first_string(raw, &["display", "text", "term"]).unwrap_or_default();
    Some(SnomedOption { code, display })
}

/// Merge primary (practitioner) and secondary (technical) raw option lists.
///
/// All normalised primary entries are taken in order, then secondary entries
/// whose code has not yet been seen are appended in their order. Later
/// entries with an already-seen code are discarded silently, conflicting
/// display text included. Pure and total: malformed input yields fewer or no
/// options, never a failure.
pub fn merge_options(primary: &[Value], secondary: &[Value]) -> Vec<SnomedOption> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::new();

    for raw in primary.iter().chain(secondary.iter()) {
        let Some(option) = normalize_option(raw) else {
            continue;
        };
        if seen.insert(option.code.as_str().to_owned()) {
            merged.push(option);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes(options: &[SnomedOption]) -> Vec<&str> {
        options.iter().map(|o| o.code.as_str()).collect()
    }

    #[test]
    fn secondary_duplicates_are_dropped_and_first_display_wins() {
        let primary = vec![json!({"code": "22298006", "display": "MI"})];
        let secondary = vec![
            json!({"code": "22298006", "display": "Myocardial infarction (dup)"}),
            json!({"code": "401303003", "display": "Acute STEMI"}),
        ];

        let merged = merge_options(&primary, &secondary);

        assert_eq!(codes(&merged), ["22298006", "401303003"]);
        assert_eq!(merged[0].display, "MI");
        assert_eq!(merged[1].display, "Acute STEMI");
    }

    #[test]
    fn primary_order_is_preserved_before_novel_secondary_entries() {
        let primary = vec![
            json!({"code": "73211009", "display": "Diabetes mellitus"}),
            json!({"code": "44054006", "display": "Type 2 diabetes"}),
        ];
        let secondary = vec![
            json!({"code": "46635009", "display": "Type 1 diabetes"}),
            json!({"code": "73211009", "display": "DM"}),
        ];

        let merged = merge_options(&primary, &secondary);
        assert_eq!(codes(&merged), ["73211009", "44054006", "46635009"]);
    }

    #[test]
    fn duplicate_within_primary_keeps_first() {
        let primary = vec![
            json!({"code": "38341003", "display": "Hypertension"}),
            json!({"code": "38341003", "display": "HTN"}),
        ];

        let merged = merge_options(&primary, &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].display, "Hypertension");
    }

    #[test]
    fn alternate_field_names_are_read() {
        let primary = vec![
            json!({"snomed": "271737000", "term": "Anemia"}),
            json!({"id": "386661006", "text": "Fever"}),
        ];

        let merged = merge_options(&primary, &[]);
        assert_eq!(codes(&merged), ["271737000", "386661006"]);
        assert_eq!(merged[0].display, "Anemia");
        assert_eq!(merged[1].display, "Fever");
    }

    #[test]
    fn numeric_codes_are_stringified() {
        let primary = vec![json!({"code": 22298006, "display": "MI"})];

        let merged = merge_options(&primary, &[]);
        assert_eq!(merged[0].code.as_str(), "22298006");
    }

    #[test]
    fn entries_without_a_code_are_dropped() {
        let primary = vec![
            json!({"display": "no code here"}),
            json!({"code": "", "display": "empty code"}),
            json!({"code": "   ", "display": "blank code"}),
            json!("not even an object"),
            json!({"code": "162573006", "display": "Suspected diabetes"}),
        ];

        let merged = merge_options(&primary, &[]);
        assert_eq!(codes(&merged), ["162573006"]);
    }

    #[test]
    fn missing_display_defaults_to_empty() {
        let primary = vec![json!({"code": "271737000"})];

        let merged = merge_options(&primary, &[]);
        assert_eq!(merged[0].display, "");
    }
}
