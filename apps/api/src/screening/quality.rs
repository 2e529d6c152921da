//! Research sufficiency checks — confidence estimation, gap detection, and
//! the quality gate that decides whether incremental search runs.
//!
//! Everything here is a pure function of the citation list and narrative
//! text, safe to recompute on any input at any point in the pipeline.

use std::collections::HashSet;

use crate::screening::models::{Citation, ConfidenceTier, ExecutiveResearchResult};

/// Citation count at or above which (with enough content) research is High confidence.
const HIGH_CITATION_COUNT: usize = 5;
/// Narrative length at or above which (with enough citations) research is High confidence.
const HIGH_CONTENT_LEN: usize = 2000;
/// Below this many distinct citations, research is Low confidence and gapped.
const LOW_CITATION_FLOOR: usize = 3;
/// Below this narrative length, research is Low confidence and gapped.
const LOW_CONTENT_FLOOR: usize = 500;

/// Narrative sections expected in any thorough executive research write-up.
const REQUIRED_SECTIONS: &[&str] = &["career", "leadership", "experience"];

/// Counts distinct non-empty citation URLs. Citations without a URL are
/// unverifiable and never counted.
pub fn distinct_citation_count(citations: &[Citation]) -> usize {
    citations
        .iter()
        .filter(|c| !c.url.is_empty())
        .map(|c| c.url.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Estimates research confidence from citation count and narrative length.
/// Hard cutoffs, no blended scoring.
pub fn estimate_confidence(citations: &[Citation], narrative: &str) -> ConfidenceTier {
    let distinct = distinct_citation_count(citations);
    let content_len = narrative.len();

    if distinct >= HIGH_CITATION_COUNT && content_len >= HIGH_CONTENT_LEN {
        return ConfidenceTier::High;
    }
    if distinct < LOW_CITATION_FLOOR || content_len < LOW_CONTENT_FLOOR {
        return ConfidenceTier::Low;
    }
    ConfidenceTier::Medium
}

/// Identifies gaps in research evidence. The list is rebuilt from scratch on
/// every call — gaps are never carried over from a previous state.
pub fn identify_gaps(citations: &[Citation], narrative: &str) -> Vec<String> {
    let mut gaps = Vec::new();

    let distinct = distinct_citation_count(citations);
    if distinct < LOW_CITATION_FLOOR {
        gaps.push(format!(
            "Only {distinct} cited sources found (need >={LOW_CITATION_FLOOR} for quality threshold)"
        ));
    }

    if narrative.len() < LOW_CONTENT_FLOOR {
        gaps.push(format!(
            "Research content is minimal (< {LOW_CONTENT_FLOOR} chars)"
        ));
    }

    let narrative_lower = narrative.to_lowercase();
    let missing: Vec<&str> = REQUIRED_SECTIONS
        .iter()
        .copied()
        .filter(|section| !narrative_lower.contains(section))
        .collect();
    if !missing.is_empty() {
        gaps.push(format!(
            "Potentially missing sections: {}",
            missing.join(", ")
        ));
    }

    gaps
}

/// The quality gate: research is sufficient when the summary is non-empty and
/// there are at least `min_citations` distinct cited URLs. A single boolean
/// decision — there is no partial pass.
pub fn passes_quality_gate(research: &ExecutiveResearchResult, min_citations: usize) -> bool {
    let summary_present = !research.summary.trim().is_empty();
    summary_present && distinct_citation_count(&research.citations) >= min_citations
}
