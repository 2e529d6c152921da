//! Pipeline stages — deep research, incremental search, and assessment.
//!
//! Each stage wraps one or two capability calls and normalizes the output.
//! A capability failure here is final for the candidate: the capability layer
//! has already spent its own retry budget, so stages add no retries of their
//! own and surface a typed error naming the candidate and the failing call.

use chrono::Utc;
use tracing::info;

use crate::screening::capabilities::{
    AssessmentCapability, IncrementalSearchCapability, ParserCapability, ResearchCapability,
};
use crate::screening::merge::{merge, merge_citations};
use crate::screening::models::{AssessmentResult, CandidateContext, ExecutiveResearchResult};
use crate::screening::pipeline::ScreeningError;
use crate::screening::quality::{estimate_confidence, identify_gaps};
use crate::screening::scoring::overall_score;

/// Max length of a summary derived by truncating the narrative.
const SUMMARY_MAX_LEN: usize = 2000;
/// Role-spec excerpt length handed to incremental search.
const ROLE_SPEC_EXCERPT_LEN: usize = 2000;

/// Runs the two-call research stage: a narrative research capability followed
/// by a parsing capability that normalizes it into a structured result.
///
/// The split exists because the research capability cannot be forced to emit
/// a validated schema. After parsing: direct citations from the research call
/// are folded into the parser-confirmed list, a fallback summary is derived
/// from the narrative when the parser left it blank, confidence and gaps are
/// recomputed, and provenance is stamped last.
pub async fn run_research(
    research: &dyn ResearchCapability,
    parser: &dyn ParserCapability,
    context: &CandidateContext,
) -> Result<ExecutiveResearchResult, ScreeningError> {
    let narrative = research.research(context).await.map_err(|e| {
        ScreeningError::Capability {
            stage: "deep_research",
            candidate: context.candidate_name.clone(),
            message: e.to_string(),
        }
    })?;

    let mut parsed = parser
        .parse(context, &narrative.narrative, &narrative.citations)
        .await
        .map_err(|e| ScreeningError::Capability {
            stage: "research_parser",
            candidate: context.candidate_name.clone(),
            message: e.to_string(),
        })?;

    // Parser-confirmed citations first, then any direct ones it missed.
    parsed.citations = merge_citations(parsed.citations, &narrative.citations);
    parsed.narrative_markdown = narrative.narrative;

    if parsed.summary.trim().is_empty() {
        parsed.summary = fallback_summary(&parsed.narrative_markdown, SUMMARY_MAX_LEN);
    }

    parsed.confidence = estimate_confidence(&parsed.citations, &parsed.narrative_markdown);
    parsed.gaps = identify_gaps(&parsed.citations, &parsed.narrative_markdown);
    parsed.researched_at = Utc::now();
    parsed.capability_id = research.id().to_string();

    Ok(parsed)
}

/// Runs bounded supplemental search and merges any findings into the
/// baseline. An empty return degrades gracefully to the unchanged baseline;
/// only a capability error is a failure.
pub async fn run_incremental_search(
    capability: &dyn IncrementalSearchCapability,
    context: &CandidateContext,
    baseline: ExecutiveResearchResult,
    role_spec_excerpt: Option<&str>,
) -> Result<ExecutiveResearchResult, ScreeningError> {
    let supplemental = capability
        .search(context, &baseline.gaps, role_spec_excerpt)
        .await
        .map_err(|e| ScreeningError::Capability {
            stage: "incremental_search",
            candidate: context.candidate_name.clone(),
            message: e.to_string(),
        })?;

    match supplemental {
        Some(supplemental) => Ok(merge(&baseline, &supplemental)),
        None => {
            info!(
                "Incremental search found nothing new for {}; proceeding with baseline research",
                context.candidate_name
            );
            Ok(baseline)
        }
    }
}

/// Runs the assessment capability, then overwrites its self-reported
/// aggregate with the deterministic scoring algorithm and stamps the exact
/// rubric text for auditability.
pub async fn run_assessment(
    capability: &dyn AssessmentCapability,
    research: &ExecutiveResearchResult,
    role_spec_markdown: &str,
    custom_instructions: Option<&str>,
) -> Result<AssessmentResult, ScreeningError> {
    let mut assessment = capability
        .assess(research, role_spec_markdown, custom_instructions)
        .await
        .map_err(|e| ScreeningError::Capability {
            stage: "assessment",
            candidate: research.candidate_name.clone(),
            message: format!(
                "against rubric '{}': {e}",
                rubric_label(role_spec_markdown)
            ),
        })?;

    assessment.overall_score = overall_score(&assessment.dimension_scores);
    assessment.role_spec_used = Some(role_spec_markdown.to_string());

    Ok(assessment)
}

/// Derives a summary by truncating the narrative, preferring to cut at the
/// last sentence boundary within the final 30% of the window; otherwise the
/// cut is hard and an ellipsis is appended.
pub fn fallback_summary(narrative: &str, max_len: usize) -> String {
    if narrative.is_empty() {
        return String::new();
    }
    if narrative.len() <= max_len {
        return narrative.trim().to_string();
    }

    let truncated = truncate_at_char_boundary(narrative, max_len);
    let boundary_floor = max_len * 7 / 10;
    match truncated.rfind('.') {
        Some(pos) if pos > boundary_floor => truncated[..=pos].trim().to_string(),
        _ => format!("{}...", truncated.trim()),
    }
}

/// First `ROLE_SPEC_EXCERPT_LEN` bytes of the rubric, for focusing
/// supplemental search without shipping the whole document.
pub fn role_spec_excerpt(role_spec_markdown: &str) -> &str {
    truncate_at_char_boundary(role_spec_markdown, ROLE_SPEC_EXCERPT_LEN)
}

/// First non-empty line of the rubric, used to label assessment errors.
fn rubric_label(role_spec_markdown: &str) -> &str {
    role_spec_markdown
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unspecified rubric")
}

fn truncate_at_char_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut cut = max_len;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    &text[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::capabilities::{CapabilityError, ResearchNarrative};
    use crate::screening::models::{Citation, ConfidenceTier};
    use async_trait::async_trait;
    use chrono::Utc;

    fn context() -> CandidateContext {
        CandidateContext {
            candidate_id: "recP1".to_string(),
            candidate_name: "Jane Doe".to_string(),
            current_title: "CFO".to_string(),
            current_company: "Acme".to_string(),
            linkedin_url: None,
            role_context: None,
        }
    }

    fn citation(url: &str) -> Citation {
        Citation {
            url: url.to_string(),
            title: url.to_string(),
            snippet: String::new(),
            relevance_note: None,
        }
    }

    struct FixedResearch {
        narrative: String,
        citations: Vec<Citation>,
    }

    #[async_trait]
    impl ResearchCapability for FixedResearch {
        async fn research(
            &self,
            _context: &CandidateContext,
        ) -> Result<ResearchNarrative, CapabilityError> {
            Ok(ResearchNarrative {
                narrative: self.narrative.clone(),
                citations: self.citations.clone(),
            })
        }

        fn id(&self) -> &str {
            "fixed-research"
        }
    }

    /// Parser returning a canned structured result, ignoring its inputs.
    struct FixedParser {
        summary: String,
        citations: Vec<Citation>,
    }

    #[async_trait]
    impl ParserCapability for FixedParser {
        async fn parse(
            &self,
            context: &CandidateContext,
            _narrative: &str,
            _citations: &[Citation],
        ) -> Result<ExecutiveResearchResult, CapabilityError> {
            Ok(ExecutiveResearchResult {
                candidate_name: context.candidate_name.clone(),
                current_title: context.current_title.clone(),
                current_company: context.current_company.clone(),
                summary: self.summary.clone(),
                narrative_markdown: String::new(),
                citations: self.citations.clone(),
                career_timeline: vec![],
                achievements: vec![],
                notable_companies: vec![],
                sector_expertise: vec![],
                stage_exposure: vec![],
                gaps: vec!["stale gap from a previous pass".to_string()],
                confidence: ConfidenceTier::High,
                researched_at: Utc::now(),
                capability_id: "fixed-parser".to_string(),
            })
        }
    }

    struct FailingParser;

    #[async_trait]
    impl ParserCapability for FailingParser {
        async fn parse(
            &self,
            _context: &CandidateContext,
            _narrative: &str,
            _citations: &[Citation],
        ) -> Result<ExecutiveResearchResult, CapabilityError> {
            Err(CapabilityError::Schema("bad payload".to_string()))
        }
    }

    #[tokio::test]
    async fn test_research_stage_merges_parser_and_direct_citations() {
        let research_capability = FixedResearch {
            narrative: "Career, leadership, experience narrative. ".repeat(20),
            citations: vec![citation("https://b"), citation("https://c")],
        };
        let parser = FixedParser {
            summary: "Parsed summary.".to_string(),
            citations: vec![citation("https://a"), citation("https://b")],
        };

        let result = run_research(&research_capability, &parser, &context())
            .await
            .unwrap();
        // Parser-confirmed first, then the unseen direct citation.
        let urls: Vec<&str> = result.citations.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
        assert_eq!(result.capability_id, "fixed-research");
        assert!(!result.narrative_markdown.is_empty());
    }

    #[tokio::test]
    async fn test_research_stage_derives_fallback_summary() {
        let research_capability = FixedResearch {
            narrative: "Career and leadership experience at Acme. ".repeat(10),
            citations: vec![citation("https://a")],
        };
        let parser = FixedParser {
            summary: "   ".to_string(),
            citations: vec![],
        };

        let result = run_research(&research_capability, &parser, &context())
            .await
            .unwrap();
        assert!(!result.summary.trim().is_empty());
        assert!(result.summary.starts_with("Career and leadership"));
    }

    #[tokio::test]
    async fn test_research_stage_recomputes_gaps_and_confidence() {
        // Parser claimed High confidence and a stale gap list; one citation
        // and a short narrative must yield Low confidence and fresh gaps.
        let research_capability = FixedResearch {
            narrative: "Brief note.".to_string(),
            citations: vec![citation("https://a")],
        };
        let parser = FixedParser {
            summary: "Parsed summary.".to_string(),
            citations: vec![],
        };

        let result = run_research(&research_capability, &parser, &context())
            .await
            .unwrap();
        assert_eq!(result.confidence, ConfidenceTier::Low);
        assert!(!result.gaps.iter().any(|g| g.contains("stale gap")));
        assert!(result.gaps.iter().any(|g| g.contains("cited sources")));
    }

    #[tokio::test]
    async fn test_research_stage_names_failing_call() {
        let research_capability = FixedResearch {
            narrative: "n".to_string(),
            citations: vec![],
        };
        let error = run_research(&research_capability, &FailingParser, &context())
            .await
            .unwrap_err();
        let message = error.to_string();
        assert!(message.contains("research_parser"));
        assert!(message.contains("Jane Doe"));
    }

    #[test]
    fn test_fallback_summary_short_narrative_passes_through() {
        assert_eq!(fallback_summary("  A short note.  ", 2000), "A short note.");
    }

    #[test]
    fn test_fallback_summary_empty_narrative() {
        assert_eq!(fallback_summary("", 2000), "");
    }

    #[test]
    fn test_fallback_summary_cuts_at_late_sentence_boundary() {
        // Period lands inside the final 30% of a 100-char window.
        let narrative = format!("{} end.{}", "a".repeat(90), "b".repeat(100));
        let summary = fallback_summary(&narrative, 100);
        assert!(summary.ends_with("end."));
        assert!(!summary.ends_with("..."));
    }

    #[test]
    fn test_fallback_summary_appends_ellipsis_without_boundary() {
        let narrative = "a".repeat(300);
        let summary = fallback_summary(&narrative, 100);
        assert_eq!(summary.len(), 103);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_fallback_summary_ignores_early_sentence_boundary() {
        // Period in the first 70% of the window is too early to cut at.
        let narrative = format!("Short. {}", "x".repeat(300));
        let summary = fallback_summary(&narrative, 100);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_fallback_summary_respects_char_boundaries() {
        // Multi-byte characters around the cut point must not panic.
        let narrative = "é".repeat(200);
        let summary = fallback_summary(&narrative, 101);
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_role_spec_excerpt_bounds_long_specs() {
        let spec = "r".repeat(5000);
        assert_eq!(role_spec_excerpt(&spec).len(), 2000);
        assert_eq!(role_spec_excerpt("short spec"), "short spec");
    }

    #[test]
    fn test_rubric_label_takes_first_nonempty_line() {
        assert_eq!(rubric_label("\n\n# CFO - Series B\ndetails"), "# CFO - Series B");
        assert_eq!(rubric_label("   "), "unspecified rubric");
    }
}
