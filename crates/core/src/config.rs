//! Lookup tuning parameters.
//!
//! These are resolved once at startup and passed into the client, rather than
//! read from the environment during request handling. The defaults match the
//! backend's own: five ranked results above a 70 cutoff, with a wider and
//! looser net (eight above 60) for the technical candidate sections.

/// Query parameters sent with every lookup request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LookupParams {
    /// Terminology domain: `auto`, `snomed` or `loinc`.
    pub domain: String,

    /// Whether to request the technical candidate sections. Practitioner
    /// options fall back to technical SNOMED candidates, so this is on by
    /// default.
    pub include_technical: bool,

    /// Maximum number of ranked results.
    pub top_k: u32,

    /// Minimum match score (0-100) for ranked results.
    pub score_cutoff: u32,

    /// Maximum number of technical candidates per system.
    pub tech_top_k: u32,

    /// Minimum match score (0-100) for technical candidates.
    pub tech_score_cutoff: u32,
}

impl Default for LookupParams {
    fn default() -> Self {
        Self {
            domain: "auto".to_owned(),
            include_technical: true,
            top_k: 5,
            score_cutoff: 70,
            tech_top_k: 8,
            tech_score_cutoff: 60,
        }
    }
}

impl LookupParams {
    /// Render as query pairs for the `/lookup` request, excluding `q` itself.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("domain", self.domain.clone()),
            ("include_technical", self.include_technical.to_string()),
            ("top_k", self.top_k.to_string()),
            ("score_cutoff", self.score_cutoff.to_string()),
            ("tech_top_k", self.tech_top_k.to_string()),
            ("tech_score_cutoff", self.tech_score_cutoff.to_string()),
        ]
    }
}
