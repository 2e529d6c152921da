//! Data models for the screening pipeline: research results, dimension
//! scores, and assessment outputs.
//!
//! All timestamps are `chrono::DateTime<Utc>` with serde enabled, so anything
//! serialized for session persistence carries ISO-8601 strings, never a
//! native date representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Three-level confidence/evidence tier, shared by research confidence,
/// dimension evidence levels, and overall assessment confidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    #[default]
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "High",
            ConfidenceTier::Medium => "Medium",
            ConfidenceTier::Low => "Low",
        }
    }
}

/// Source citation backing a research claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub relevance_note: Option<String>,
}

impl Citation {
    /// Identity key used for deduplication. URL when present; for URL-less
    /// citations, the title+snippet composite (two citations with the same
    /// title but different snippets are distinct sources).
    pub fn identity(&self) -> String {
        if self.url.is_empty() {
            format!("{}\u{1f}{}", self.title, self.snippet)
        } else {
            self.url.clone()
        }
    }
}

/// Timeline entry for career history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerEntry {
    pub company: String,
    pub role: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub achievements: Vec<String>,
}

impl CareerEntry {
    /// Identity key for timeline deduplication.
    pub fn identity(&self) -> (String, String, Option<String>, Option<String>) {
        (
            self.company.clone(),
            self.role.clone(),
            self.start_date.clone(),
            self.end_date.clone(),
        )
    }
}

/// Structured research output for one candidate.
///
/// Created once by the research stage; replaced at most once by a merge with
/// supplemental search results; read-only from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveResearchResult {
    pub candidate_name: String,
    pub current_title: String,
    pub current_company: String,

    /// Narrative
    pub summary: String,
    pub narrative_markdown: String,

    /// Evidence
    pub citations: Vec<Citation>,
    pub career_timeline: Vec<CareerEntry>,
    pub achievements: Vec<String>,
    pub notable_companies: Vec<String>,
    pub sector_expertise: Vec<String>,
    pub stage_exposure: Vec<String>,
    pub gaps: Vec<String>,

    /// Derived
    pub confidence: ConfidenceTier,
    pub researched_at: DateTime<Utc>,
    pub capability_id: String,
}

/// Evidence-aware score for one evaluation dimension of a role rubric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    /// 1-5 scale. `None` means insufficient evidence — never 0, never NaN,
    /// and never counted as a number during aggregation.
    pub score: Option<u8>,
    pub evidence_level: ConfidenceTier,
    pub confidence: ConfidenceTier,
    pub reasoning: String,
    #[serde(default)]
    pub evidence_quotes: Vec<String>,
    #[serde(default)]
    pub citation_urls: Vec<String>,
}

/// Evaluation of a single must-have requirement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MustHaveCheck {
    pub requirement: String,
    pub met: bool,
    #[serde(default)]
    pub evidence: Option<String>,
}

/// Structured assessment output. Created once, terminal.
///
/// `overall_score` is always recomputed from `dimension_scores` by
/// [`crate::screening::scoring::overall_score`] — the capability's own
/// aggregate is never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentResult {
    /// 0-100 scale; `None` means no dimension was scorable.
    pub overall_score: Option<f64>,
    pub overall_confidence: ConfidenceTier,
    pub dimension_scores: Vec<DimensionScore>,
    pub must_haves: Vec<MustHaveCheck>,
    pub red_flags: Vec<String>,
    pub green_flags: Vec<String>,
    pub summary: String,
    pub counterfactuals: Vec<String>,
    /// Exact rubric text the assessment ran against, stamped for auditability.
    pub role_spec_used: Option<String>,
    pub assessed_at: DateTime<Utc>,
    pub capability_id: String,
}

/// Candidate identity as it enters the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateContext {
    pub candidate_id: String,
    pub candidate_name: String,
    pub current_title: String,
    pub current_company: String,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub role_context: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_tier_serializes_as_capitalized_string() {
        assert_eq!(
            serde_json::to_string(&ConfidenceTier::High).unwrap(),
            r#""High""#
        );
        let tier: ConfidenceTier = serde_json::from_str(r#""Low""#).unwrap();
        assert_eq!(tier, ConfidenceTier::Low);
    }

    #[test]
    fn test_confidence_tier_default_is_medium() {
        assert_eq!(ConfidenceTier::default(), ConfidenceTier::Medium);
    }

    #[test]
    fn test_citation_identity_prefers_url() {
        let c = Citation {
            url: "https://example.com/a".to_string(),
            title: "A".to_string(),
            snippet: "s".to_string(),
            relevance_note: None,
        };
        assert_eq!(c.identity(), "https://example.com/a");
    }

    #[test]
    fn test_citation_identity_falls_back_to_title_and_snippet() {
        let a = Citation {
            url: String::new(),
            title: "Same Title".to_string(),
            snippet: "first snippet".to_string(),
            relevance_note: None,
        };
        let b = Citation {
            url: String::new(),
            title: "Same Title".to_string(),
            snippet: "different snippet".to_string(),
            relevance_note: None,
        };
        // Same title, different snippets — distinct sources.
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn test_dimension_score_null_deserializes_to_none() {
        let json = r#"{
            "dimension": "Leadership",
            "score": null,
            "evidence_level": "Medium",
            "confidence": "Low",
            "reasoning": "No public evidence of team scope."
        }"#;
        let score: DimensionScore = serde_json::from_str(json).unwrap();
        assert!(score.score.is_none());
        assert!(score.evidence_quotes.is_empty());
    }

    #[test]
    fn test_research_result_timestamps_serialize_as_strings() {
        let research = ExecutiveResearchResult {
            candidate_name: "Jane Doe".to_string(),
            current_title: "CTO".to_string(),
            current_company: "Acme".to_string(),
            summary: "Summary".to_string(),
            narrative_markdown: String::new(),
            citations: vec![],
            career_timeline: vec![],
            achievements: vec![],
            notable_companies: vec![],
            sector_expertise: vec![],
            stage_exposure: vec![],
            gaps: vec![],
            confidence: ConfidenceTier::Medium,
            researched_at: Utc::now(),
            capability_id: "test".to_string(),
        };
        let value = serde_json::to_value(&research).unwrap();
        assert!(
            value["researched_at"].is_string(),
            "timestamp must serialize as an ISO-8601 string, got {:?}",
            value["researched_at"]
        );
    }
}
