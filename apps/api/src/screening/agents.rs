//! LLM-backed implementations of the screening capabilities.
//!
//! The research capability emits free-text markdown (it cannot be forced
//! into a validated schema), so a separate parser capability normalizes its
//! output. Incremental search and assessment return JSON directly through
//! `call_json`. All four share the single [`LlmClient`]; its retry budget is
//! the only retry anywhere in the system.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

use crate::llm_client::{LlmClient, LlmError, MODEL};
use crate::screening::capabilities::{
    AssessmentCapability, CapabilityError, IncrementalSearchCapability, ParserCapability,
    ResearchCapability, ResearchNarrative,
};
use crate::screening::models::{
    AssessmentResult, CandidateContext, CareerEntry, Citation, ConfidenceTier, DimensionScore,
    ExecutiveResearchResult, MustHaveCheck,
};
use crate::screening::prompts::{
    ASSESSMENT_PROMPT_TEMPLATE, ASSESSMENT_SYSTEM, INCREMENTAL_PROMPT_TEMPLATE,
    INCREMENTAL_SYSTEM, PARSER_PROMPT_TEMPLATE, PARSER_SYSTEM, RESEARCH_PROMPT_TEMPLATE,
    RESEARCH_SYSTEM,
};

// ────────────────────────────────────────────────────────────────────────────
// LLM payload shapes
// ────────────────────────────────────────────────────────────────────────────

/// Parser/incremental-search output shape. Derived fields (confidence, gaps,
/// timestamp, capability id) are absent on purpose — the pipeline computes
/// them; a capability's opinion on them is never trusted.
#[derive(Debug, Deserialize)]
struct ParsedResearchPayload {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    career_timeline: Vec<CareerEntry>,
    #[serde(default)]
    achievements: Vec<String>,
    #[serde(default)]
    notable_companies: Vec<String>,
    #[serde(default)]
    sector_expertise: Vec<String>,
    #[serde(default)]
    stage_exposure: Vec<String>,
    #[serde(default)]
    citations: Vec<Citation>,
}

impl ParsedResearchPayload {
    fn into_research(self, context: &CandidateContext, capability_id: &str) -> ExecutiveResearchResult {
        ExecutiveResearchResult {
            candidate_name: context.candidate_name.clone(),
            current_title: context.current_title.clone(),
            current_company: context.current_company.clone(),
            summary: self.summary,
            narrative_markdown: String::new(),
            citations: self.citations,
            career_timeline: self.career_timeline,
            achievements: self.achievements,
            notable_companies: self.notable_companies,
            sector_expertise: self.sector_expertise,
            stage_exposure: self.stage_exposure,
            gaps: vec![],
            confidence: ConfidenceTier::default(),
            researched_at: Utc::now(),
            capability_id: capability_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AssessmentPayload {
    #[serde(default)]
    overall_score: Option<f64>,
    overall_confidence: ConfidenceTier,
    dimension_scores: Vec<DimensionScore>,
    #[serde(default)]
    must_haves: Vec<MustHaveCheck>,
    #[serde(default)]
    red_flags: Vec<String>,
    #[serde(default)]
    green_flags: Vec<String>,
    summary: String,
    #[serde(default)]
    counterfactuals: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Research
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmResearchCapability {
    llm: LlmClient,
}

impl LlmResearchCapability {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ResearchCapability for LlmResearchCapability {
    async fn research(
        &self,
        context: &CandidateContext,
    ) -> Result<ResearchNarrative, CapabilityError> {
        let prompt = build_research_prompt(context);
        let response = self.llm.call(&prompt, RESEARCH_SYSTEM).await?;
        let narrative = response
            .text()
            .ok_or(LlmError::EmptyContent)?
            .to_string();
        // Best-effort direct citations; the parser confirms and extends these.
        let citations = extract_markdown_citations(&narrative);
        Ok(ResearchNarrative {
            narrative,
            citations,
        })
    }

    fn id(&self) -> &str {
        MODEL
    }
}

/// Pulls `[title](url)` markdown links out of a narrative as best-effort
/// citations, deduplicated by URL in order of first appearance.
fn extract_markdown_citations(narrative: &str) -> Vec<Citation> {
    let mut citations = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cursor = 0usize;

    while let Some(offset) = narrative[cursor..].find('[') {
        let start = cursor + offset;
        let Some(mid_offset) = narrative[start..].find("](") else {
            break;
        };
        let mid = start + mid_offset;
        let Some(end_offset) = narrative[mid..].find(')') else {
            break;
        };
        let end = mid + end_offset;

        let title = &narrative[start + 1..mid];
        let url = &narrative[mid + 2..end];
        cursor = end + 1;

        if url.starts_with("http") && !title.contains('[') && seen.insert(url) {
            citations.push(Citation {
                url: url.to_string(),
                title: title.to_string(),
                snippet: String::new(),
                relevance_note: None,
            });
        }
    }

    citations
}

fn build_research_prompt(context: &CandidateContext) -> String {
    let linkedin_section = match context.linkedin_url.as_deref() {
        Some(url) if !url.is_empty() => format!("\nLinkedIn: {url}"),
        _ => "\nLinkedIn: Not provided".to_string(),
    };
    let role_section = match context.role_context.as_deref() {
        Some(role) if !role.trim().is_empty() => {
            format!("\n\nROLE CONTEXT (focus the research accordingly):\n{}", role.trim())
        }
        _ => String::new(),
    };

    RESEARCH_PROMPT_TEMPLATE
        .replace("{candidate_name}", &context.candidate_name)
        .replace("{current_title}", &context.current_title)
        .replace("{current_company}", &context.current_company)
        .replace("{linkedin_section}", &linkedin_section)
        .replace("{role_section}", &role_section)
}

// ────────────────────────────────────────────────────────────────────────────
// Parser
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmParserCapability {
    llm: LlmClient,
}

impl LlmParserCapability {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ParserCapability for LlmParserCapability {
    async fn parse(
        &self,
        context: &CandidateContext,
        narrative: &str,
        citations: &[Citation],
    ) -> Result<ExecutiveResearchResult, CapabilityError> {
        let prompt = build_parser_prompt(context, narrative, citations)?;
        let payload: ParsedResearchPayload = call_json_strict(&self.llm, &prompt, PARSER_SYSTEM).await?;
        Ok(payload.into_research(context, MODEL))
    }
}

fn build_parser_prompt(
    context: &CandidateContext,
    narrative: &str,
    citations: &[Citation],
) -> Result<String, CapabilityError> {
    let citations_json = serde_json::to_string_pretty(citations)
        .map_err(|e| CapabilityError::Schema(format!("Failed to serialize citations: {e}")))?;

    Ok(PARSER_PROMPT_TEMPLATE
        .replace("{candidate_name}", &context.candidate_name)
        .replace("{current_title}", &context.current_title)
        .replace("{current_company}", &context.current_company)
        .replace("{citations_json}", &citations_json)
        .replace("{narrative}", narrative))
}

// ────────────────────────────────────────────────────────────────────────────
// Incremental search
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmIncrementalSearchCapability {
    llm: LlmClient,
}

impl LlmIncrementalSearchCapability {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl IncrementalSearchCapability for LlmIncrementalSearchCapability {
    async fn search(
        &self,
        context: &CandidateContext,
        gaps: &[String],
        role_spec_excerpt: Option<&str>,
    ) -> Result<Option<ExecutiveResearchResult>, CapabilityError> {
        let prompt = build_incremental_prompt(context, gaps, role_spec_excerpt);
        let payload: Option<ParsedResearchPayload> =
            call_json_strict(&self.llm, &prompt, INCREMENTAL_SYSTEM).await?;
        Ok(payload.map(|p| p.into_research(context, MODEL)))
    }
}

fn build_incremental_prompt(
    context: &CandidateContext,
    gaps: &[String],
    role_spec_excerpt: Option<&str>,
) -> String {
    let gaps_section = if gaps.is_empty() {
        "- Missing public evidence (general)".to_string()
    } else {
        gaps.iter()
            .map(|gap| format!("- {gap}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let role_section = match role_spec_excerpt {
        Some(spec) if !spec.trim().is_empty() => {
            format!("\n\nROLE SPECIFICATION CONTEXT:\n{}", spec.trim())
        }
        _ => String::new(),
    };

    INCREMENTAL_PROMPT_TEMPLATE
        .replace("{candidate_name}", &context.candidate_name)
        .replace("{current_title}", &context.current_title)
        .replace("{current_company}", &context.current_company)
        .replace("{gaps_section}", &gaps_section)
        .replace("{role_section}", &role_section)
}

// ────────────────────────────────────────────────────────────────────────────
// Assessment
// ────────────────────────────────────────────────────────────────────────────

pub struct LlmAssessmentCapability {
    llm: LlmClient,
}

impl LlmAssessmentCapability {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AssessmentCapability for LlmAssessmentCapability {
    async fn assess(
        &self,
        research: &ExecutiveResearchResult,
        role_spec_markdown: &str,
        custom_instructions: Option<&str>,
    ) -> Result<AssessmentResult, CapabilityError> {
        let prompt = build_assessment_prompt(research, role_spec_markdown, custom_instructions);
        let payload: AssessmentPayload =
            call_json_strict(&self.llm, &prompt, ASSESSMENT_SYSTEM).await?;
        validate_dimension_scores(&payload.dimension_scores)?;

        Ok(AssessmentResult {
            // Advisory only — the assessment stage overwrites this.
            overall_score: payload.overall_score,
            overall_confidence: payload.overall_confidence,
            dimension_scores: payload.dimension_scores,
            must_haves: payload.must_haves,
            red_flags: payload.red_flags,
            green_flags: payload.green_flags,
            summary: payload.summary,
            counterfactuals: payload.counterfactuals,
            role_spec_used: None,
            assessed_at: Utc::now(),
            capability_id: MODEL.to_string(),
        })
    }

    fn id(&self) -> &str {
        MODEL
    }
}

/// Rejects dimension scores outside the 1-5 scale instead of clamping them.
fn validate_dimension_scores(scores: &[DimensionScore]) -> Result<(), CapabilityError> {
    for dimension in scores {
        if let Some(score) = dimension.score {
            if !(1..=5).contains(&score) {
                return Err(CapabilityError::Schema(format!(
                    "Dimension '{}' has score {score}, outside the 1-5 scale",
                    dimension.dimension
                )));
            }
        }
    }
    Ok(())
}

fn build_assessment_prompt(
    research: &ExecutiveResearchResult,
    role_spec_markdown: &str,
    custom_instructions: Option<&str>,
) -> String {
    let role_spec = if role_spec_markdown.trim().is_empty() {
        "(role specification missing)"
    } else {
        role_spec_markdown.trim()
    };
    let custom_section = match custom_instructions {
        Some(instructions) if !instructions.trim().is_empty() => {
            format!("\n\nCUSTOM INSTRUCTIONS:\n{}", instructions.trim())
        }
        _ => String::new(),
    };

    ASSESSMENT_PROMPT_TEMPLATE
        .replace("{role_spec}", role_spec)
        .replace("{research_block}", &format_research_for_assessment(research))
        .replace(
            "{evidence_instruction}",
            crate::llm_client::prompts::EVIDENCE_INSTRUCTION,
        )
        .replace(
            "{unknown_instruction}",
            crate::llm_client::prompts::UNKNOWN_SCORE_INSTRUCTION,
        )
        .replace("{custom_section}", &custom_section)
}

/// Formats research data into readable sections for the assessment prompt.
fn format_research_for_assessment(research: &ExecutiveResearchResult) -> String {
    let timeline = if research.career_timeline.is_empty() {
        "- Timeline not available".to_string()
    } else {
        research
            .career_timeline
            .iter()
            .map(|entry| {
                format!(
                    "- {} at {} ({} - {})",
                    entry.role,
                    entry.company,
                    entry.start_date.as_deref().unwrap_or("?"),
                    entry.end_date.as_deref().unwrap_or("Present"),
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let achievements = if research.achievements.is_empty() {
        "- Not documented".to_string()
    } else {
        research
            .achievements
            .iter()
            .map(|a| format!("- {a}"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let citations = if research.citations.is_empty() {
        "- No citations recorded".to_string()
    } else {
        research
            .citations
            .iter()
            .map(|c| format!("- {} ({})", c.title, c.url))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let gaps = if research.gaps.is_empty() {
        "- No explicit gaps.".to_string()
    } else {
        research
            .gaps
            .iter()
            .map(|g| format!("- {g}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let summary = if research.summary.is_empty() {
        "(no summary provided)"
    } else {
        research.summary.as_str()
    };
    let sector = if research.sector_expertise.is_empty() {
        "Unknown".to_string()
    } else {
        research.sector_expertise.join(", ")
    };
    let stage = if research.stage_exposure.is_empty() {
        "Unknown".to_string()
    } else {
        research.stage_exposure.join(", ")
    };

    format!(
        "Candidate: {}\nCurrent Role: {} at {}\n\nSummary:\n{}\n\nCareer Timeline:\n{}\n\nKey Achievements:\n{}\n\nSector Expertise: {}\nStage Exposure: {}\n\nCitations:\n{}\n\nKnown Gaps:\n{}",
        research.candidate_name,
        research.current_title,
        research.current_company,
        summary,
        timeline,
        achievements,
        sector,
        stage,
        citations,
        gaps,
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Shared call helper
// ────────────────────────────────────────────────────────────────────────────

/// `call_json` that reports schema mismatches as typed failures rather than
/// generic LLM errors, so callers can tell "the model answered garbage" from
/// "the call itself failed".
async fn call_json_strict<T: serde::de::DeserializeOwned>(
    llm: &LlmClient,
    prompt: &str,
    system: &str,
) -> Result<T, CapabilityError> {
    match llm.call_json::<T>(prompt, system).await {
        Ok(value) => Ok(value),
        Err(LlmError::Parse(e)) => Err(CapabilityError::Schema(e.to_string())),
        Err(e) => Err(CapabilityError::Llm(e)),
    }
}
