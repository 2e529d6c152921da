//! Merge engine — folds supplemental search findings into baseline research.
//!
//! `merge` is copy-on-write: the baseline is borrowed immutably and a new
//! result is returned. Re-merging the same supplemental into the same
//! baseline is idempotent for citations and every list field.

use std::collections::HashSet;

use chrono::Utc;

use crate::screening::models::{Citation, ExecutiveResearchResult};
use crate::screening::quality::estimate_confidence;

/// Label prefixing the supplemental summary block in a merged summary.
const SUPPLEMENTAL_LABEL: &str = "Supplemental Research:";

/// Merges supplemental research into a baseline result.
///
/// Summary and narrative are concatenated (skipping empty parts), evidence
/// lists are unioned preserving first-seen order, and confidence plus the
/// research timestamp are recomputed on the merged content — never copied
/// from either input.
pub fn merge(
    baseline: &ExecutiveResearchResult,
    supplemental: &ExecutiveResearchResult,
) -> ExecutiveResearchResult {
    let mut merged = baseline.clone();

    // Narrative summary, with the supplemental block labeled for readability.
    let supplemental_summary = supplemental.summary.trim();
    if !supplemental_summary.is_empty() {
        if merged.summary.trim().is_empty() {
            merged.summary = supplemental_summary.to_string();
        } else {
            merged.summary = format!(
                "{}\n\n{SUPPLEMENTAL_LABEL}\n{supplemental_summary}",
                merged.summary.trim()
            );
        }
    }

    // Raw narrative: blank-line concatenation, skipping empty parts.
    let supplemental_narrative = supplemental.narrative_markdown.trim();
    if !supplemental_narrative.is_empty() {
        if merged.narrative_markdown.trim().is_empty() {
            merged.narrative_markdown = supplemental_narrative.to_string();
        } else {
            merged.narrative_markdown = format!(
                "{}\n\n{supplemental_narrative}",
                merged.narrative_markdown.trim_end()
            );
        }
    }

    merged.citations = merge_citations(merged.citations, &supplemental.citations);

    merged.achievements = merge_unique_strings(&merged.achievements, &supplemental.achievements);
    merged.notable_companies =
        merge_unique_strings(&merged.notable_companies, &supplemental.notable_companies);
    merged.sector_expertise =
        merge_unique_strings(&merged.sector_expertise, &supplemental.sector_expertise);
    merged.stage_exposure =
        merge_unique_strings(&merged.stage_exposure, &supplemental.stage_exposure);
    merged.gaps = merge_unique_strings(&merged.gaps, &supplemental.gaps);

    // Career timeline: append entries not already present by identity key.
    let mut seen_roles: HashSet<_> = merged
        .career_timeline
        .iter()
        .map(|entry| entry.identity())
        .collect();
    for entry in &supplemental.career_timeline {
        if seen_roles.insert(entry.identity()) {
            merged.career_timeline.push(entry.clone());
        }
    }

    // Derived fields reflect the merged content, not either input.
    merged.confidence = estimate_confidence(&merged.citations, &merged.narrative_markdown);
    merged.researched_at = Utc::now();

    merged
}

/// Appends each incoming citation whose identity key (URL, or title+snippet
/// when URL-less) is not already present. Baseline order is preserved; new
/// citations keep their incoming order.
pub fn merge_citations(baseline: Vec<Citation>, incoming: &[Citation]) -> Vec<Citation> {
    let mut merged = baseline;
    let mut seen: HashSet<String> = merged.iter().map(|c| c.identity()).collect();
    for citation in incoming {
        if seen.insert(citation.identity()) {
            merged.push(citation.clone());
        }
    }
    merged
}

/// Union of trimmed non-empty strings, preserving first-seen order.
/// No case folding — "SaaS" and "saas" are distinct entries.
pub fn merge_unique_strings(first: &[String], second: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for value in first.iter().chain(second.iter()) {
        let trimmed = value.trim();
        if !trimmed.is_empty() && !merged.iter().any(|existing| existing == trimmed) {
            merged.push(trimmed.to_string());
        }
    }
    merged
}
