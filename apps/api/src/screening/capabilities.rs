//! Capability contracts consumed by the screening pipeline.
//!
//! Each capability is an external black box with a typed interface. Retry,
//! backoff, and call budgets live inside the implementations (see
//! [`crate::screening::agents`] for the LLM-backed set), never in the
//! pipeline that calls them. A capability error here means the budget is
//! already exhausted and the failure is final for that candidate.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::screening::models::{
    AssessmentResult, CandidateContext, Citation, ExecutiveResearchResult,
};

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// The capability answered, but its output did not match the expected
    /// schema. Surfaced loudly instead of patched over.
    #[error("Malformed capability output: {0}")]
    Schema(String),
}

/// Free-text narrative plus best-effort citations, as produced by the
/// research capability before any schema validation.
#[derive(Debug, Clone)]
pub struct ResearchNarrative {
    pub narrative: String,
    pub citations: Vec<Citation>,
}

/// Produces a comprehensive free-text research narrative for a candidate.
/// Cannot be forced to emit a validated schema — that is the parser's job.
#[async_trait]
pub trait ResearchCapability: Send + Sync {
    async fn research(
        &self,
        context: &CandidateContext,
    ) -> Result<ResearchNarrative, CapabilityError>;

    /// Identifier stamped onto research results for provenance.
    fn id(&self) -> &str;
}

/// Normalizes a research narrative into a structured result. Fails with
/// [`CapabilityError::Schema`] on mismatch rather than guessing.
#[async_trait]
pub trait ParserCapability: Send + Sync {
    async fn parse(
        &self,
        context: &CandidateContext,
        narrative: &str,
        citations: &[Citation],
    ) -> Result<ExecutiveResearchResult, CapabilityError>;
}

/// Bounded supplemental search, run only when the quality gate fails.
/// The implementation enforces its own search budget. Returning `Ok(None)`
/// means no new evidence was found — graceful degradation, not an error.
#[async_trait]
pub trait IncrementalSearchCapability: Send + Sync {
    async fn search(
        &self,
        context: &CandidateContext,
        gaps: &[String],
        role_spec_excerpt: Option<&str>,
    ) -> Result<Option<ExecutiveResearchResult>, CapabilityError>;
}

/// Scores a candidate's research against a role specification rubric.
/// The returned `overall_score` is advisory only; the pipeline recomputes it.
#[async_trait]
pub trait AssessmentCapability: Send + Sync {
    async fn assess(
        &self,
        research: &ExecutiveResearchResult,
        role_spec_markdown: &str,
        custom_instructions: Option<&str>,
    ) -> Result<AssessmentResult, CapabilityError>;

    /// Identifier stamped onto assessment results for provenance.
    fn id(&self) -> &str;
}

/// The four capabilities wired into the pipeline, bundled for `AppState`.
#[derive(Clone)]
pub struct CapabilitySet {
    pub research: Arc<dyn ResearchCapability>,
    pub parser: Arc<dyn ParserCapability>,
    pub incremental: Arc<dyn IncrementalSearchCapability>,
    pub assessment: Arc<dyn AssessmentCapability>,
}
