//! Per-candidate pipeline orchestration — the explicit stage state machine.
//!
//! Stages run strictly in order for one candidate; a batch runs one
//! orchestrator instance per candidate, concurrently, each against its own
//! session key. The orchestrator never retries: a capability failure after
//! the capability's own budget is final for that candidate.
//!
//! State machine:
//! `deep_research -> quality_check -> [incremental_search] -> assessment -> complete`,
//! with `failed` reachable from any stage. The quality gate is evaluated
//! exactly once; after incremental search the pipeline proceeds to assessment
//! regardless of whether the merged result would now pass. A snapshot is
//! persisted after every transition, before the next stage starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::screening::capabilities::CapabilitySet;
use crate::screening::models::{AssessmentResult, CandidateContext, ExecutiveResearchResult};
use crate::screening::quality::passes_quality_gate;
use crate::screening::session::{SessionKey, SessionSnapshot, SessionStateStore};
use crate::screening::stages;

/// Typed failure taxonomy for the screening core.
#[derive(Debug, Error)]
pub enum ScreeningError {
    /// A capability raised an error after exhausting its own retry budget.
    /// Carries enough context to retry the one candidate manually.
    #[error("{stage} failed for {candidate}: {message}")]
    Capability {
        stage: &'static str,
        candidate: String,
        message: String,
    },

    /// Malformed input rejected before stage 1 begins.
    #[error("{0}")]
    Validation(String),

    #[error("Failed to serialize pipeline state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Session persistence failed: {0}")]
    Session(String),
}

/// Completed pipeline steps, as recorded in session snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Start,
    DeepResearch,
    QualityCheck,
    IncrementalSearch,
    Assessment,
    Complete,
}

/// Terminal output of one candidate's run.
#[derive(Debug, Clone)]
pub struct ScreenOutcome {
    pub research: ExecutiveResearchResult,
    pub assessment: AssessmentResult,
}

/// One orchestrator instance per candidate run. Holds no mutable state of its
/// own; all progress lives in the session snapshot.
pub struct CandidatePipeline<'a> {
    capabilities: &'a CapabilitySet,
    sessions: &'a dyn SessionStateStore,
    min_citations: usize,
}

impl<'a> CandidatePipeline<'a> {
    pub fn new(
        capabilities: &'a CapabilitySet,
        sessions: &'a dyn SessionStateStore,
        min_citations: usize,
    ) -> Self {
        Self {
            capabilities,
            sessions,
            min_citations,
        }
    }

    pub async fn run(
        &self,
        screen_id: &str,
        candidate: &CandidateContext,
        role_spec_markdown: &str,
        custom_instructions: Option<&str>,
    ) -> Result<ScreenOutcome, ScreeningError> {
        let key = SessionKey::new(screen_id, &candidate.candidate_id);
        let mut snapshot = SessionSnapshot::new(screen_id, candidate);

        info!(
            "Starting deep research for {} ({} at {})",
            candidate.candidate_name, candidate.current_title, candidate.current_company
        );
        let research = match stages::run_research(
            self.capabilities.research.as_ref(),
            self.capabilities.parser.as_ref(),
            candidate,
        )
        .await
        {
            Ok(research) => research,
            Err(e) => return self.fail(&key, snapshot, e).await,
        };
        snapshot.last_step = PipelineStep::DeepResearch;
        snapshot.research = Some(serde_json::to_value(&research)?);
        self.persist(&key, &snapshot).await?;

        let gate_passed = passes_quality_gate(&research, self.min_citations);
        info!(
            "Research quality check for {} -> {}",
            candidate.candidate_name,
            if gate_passed { "pass" } else { "fail" }
        );
        snapshot.last_step = PipelineStep::QualityCheck;
        snapshot.quality_gate_triggered = !gate_passed;
        self.persist(&key, &snapshot).await?;

        // The gate decides exactly once. After a single incremental attempt
        // the pipeline moves on, whether or not the merged result would pass.
        let research = if gate_passed {
            research
        } else {
            info!(
                "Running incremental search for {}",
                candidate.candidate_name
            );
            let merged = match stages::run_incremental_search(
                self.capabilities.incremental.as_ref(),
                candidate,
                research,
                Some(stages::role_spec_excerpt(role_spec_markdown)),
            )
            .await
            {
                Ok(merged) => merged,
                Err(e) => return self.fail(&key, snapshot, e).await,
            };
            snapshot.last_step = PipelineStep::IncrementalSearch;
            snapshot.research = Some(serde_json::to_value(&merged)?);
            self.persist(&key, &snapshot).await?;
            merged
        };

        info!("Starting assessment for {}", candidate.candidate_name);
        let assessment = match stages::run_assessment(
            self.capabilities.assessment.as_ref(),
            &research,
            role_spec_markdown,
            custom_instructions,
        )
        .await
        {
            Ok(assessment) => assessment,
            Err(e) => return self.fail(&key, snapshot, e).await,
        };
        snapshot.last_step = PipelineStep::Assessment;
        snapshot.assessment = Some(serde_json::to_value(&assessment)?);
        self.persist(&key, &snapshot).await?;

        snapshot.last_step = PipelineStep::Complete;
        self.persist(&key, &snapshot).await?;
        info!(
            "Assessment complete for {} (overall_score={:?})",
            candidate.candidate_name, assessment.overall_score
        );

        Ok(ScreenOutcome {
            research,
            assessment,
        })
    }

    async fn persist(
        &self,
        key: &SessionKey,
        snapshot: &SessionSnapshot,
    ) -> Result<(), ScreeningError> {
        self.sessions
            .put(key, snapshot)
            .await
            .map_err(|e| ScreeningError::Session(e.to_string()))
    }

    /// Records the failure in the snapshot without advancing `last_step`,
    /// then propagates the original error to the caller.
    async fn fail(
        &self,
        key: &SessionKey,
        mut snapshot: SessionSnapshot,
        error: ScreeningError,
    ) -> Result<ScreenOutcome, ScreeningError> {
        snapshot.last_error = Some(error.to_string());
        if let Err(store_error) = self.sessions.put(key, &snapshot).await {
            // Don't mask the stage failure with a persistence failure.
            warn!(
                "Failed to persist failure snapshot for {}: {store_error}",
                snapshot.candidate_name
            );
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::capabilities::{
        AssessmentCapability, CapabilityError, IncrementalSearchCapability, ParserCapability,
        ResearchCapability, ResearchNarrative,
    };
    use crate::screening::models::{Citation, ConfidenceTier, DimensionScore};
    use crate::screening::session::InMemorySessionStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn candidate() -> CandidateContext {
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

    fn supplemental_research(urls: &[&str]) -> ExecutiveResearchResult {
        ExecutiveResearchResult {
            candidate_name: "Jane Doe".to_string(),
            current_title: "CFO".to_string(),
            current_company: "Acme".to_string(),
            summary: "Supplemental evidence.".to_string(),
            narrative_markdown: String::new(),
            citations: urls.iter().map(|u| citation(u)).collect(),
            career_timeline: vec![],
            achievements: vec![],
            notable_companies: vec![],
            sector_expertise: vec![],
            stage_exposure: vec![],
            gaps: vec![],
            confidence: ConfidenceTier::Medium,
            researched_at: Utc::now(),
            capability_id: "mock-incremental".to_string(),
        }
    }

    fn dimension(name: &str, score: Option<u8>) -> DimensionScore {
        DimensionScore {
            dimension: name.to_string(),
            score,
            evidence_level: ConfidenceTier::Medium,
            confidence: ConfidenceTier::Medium,
            reasoning: String::new(),
            evidence_quotes: vec![],
            citation_urls: vec![],
        }
    }

    /// Research capability returning a fixed narrative and citation list.
    struct StaticResearch {
        citations: Vec<Citation>,
    }

    #[async_trait]
    impl ResearchCapability for StaticResearch {
        async fn research(
            &self,
            _context: &CandidateContext,
        ) -> Result<ResearchNarrative, CapabilityError> {
            Ok(ResearchNarrative {
                narrative: "Career, leadership and experience details. ".repeat(20),
                citations: self.citations.clone(),
            })
        }

        fn id(&self) -> &str {
            "mock-research"
        }
    }

    struct FailingResearch;

    #[async_trait]
    impl ResearchCapability for FailingResearch {
        async fn research(
            &self,
            _context: &CandidateContext,
        ) -> Result<ResearchNarrative, CapabilityError> {
            Err(CapabilityError::Schema("simulated outage".to_string()))
        }

        fn id(&self) -> &str {
            "mock-research"
        }
    }

    /// Parser that echoes the supplied citations into a structured result.
    struct EchoParser;

    #[async_trait]
    impl ParserCapability for EchoParser {
        async fn parse(
            &self,
            context: &CandidateContext,
            _narrative: &str,
            citations: &[Citation],
        ) -> Result<ExecutiveResearchResult, CapabilityError> {
            let mut research = supplemental_research(&[]);
            research.candidate_name = context.candidate_name.clone();
            research.summary = "Parsed summary.".to_string();
            research.citations = citations.to_vec();
            Ok(research)
        }
    }

    struct StaticIncremental {
        supplemental: Option<ExecutiveResearchResult>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl IncrementalSearchCapability for StaticIncremental {
        async fn search(
            &self,
            _context: &CandidateContext,
            _gaps: &[String],
            _role_spec_excerpt: Option<&str>,
        ) -> Result<Option<ExecutiveResearchResult>, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.supplemental.clone())
        }
    }

    struct StaticAssessment {
        scores: Vec<DimensionScore>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AssessmentCapability for StaticAssessment {
        async fn assess(
            &self,
            research: &ExecutiveResearchResult,
            _role_spec_markdown: &str,
            _custom_instructions: Option<&str>,
        ) -> Result<AssessmentResult, CapabilityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AssessmentResult {
                // Junk aggregate the pipeline must overwrite.
                overall_score: Some(1.0),
                overall_confidence: ConfidenceTier::Medium,
                dimension_scores: self.scores.clone(),
                must_haves: vec![],
                red_flags: vec![],
                green_flags: vec![],
                summary: format!("Assessment of {}", research.candidate_name),
                counterfactuals: vec![],
                role_spec_used: None,
                assessed_at: Utc::now(),
                capability_id: "mock-assessment".to_string(),
            })
        }

        fn id(&self) -> &str {
            "mock-assessment"
        }
    }

    struct FailingAssessment;

    #[async_trait]
    impl AssessmentCapability for FailingAssessment {
        async fn assess(
            &self,
            _research: &ExecutiveResearchResult,
            _role_spec_markdown: &str,
            _custom_instructions: Option<&str>,
        ) -> Result<AssessmentResult, CapabilityError> {
            Err(CapabilityError::Schema("simulated outage".to_string()))
        }

        fn id(&self) -> &str {
            "mock-assessment"
        }
    }

    struct TestHarness {
        capabilities: CapabilitySet,
        sessions: Arc<InMemorySessionStore>,
        incremental_calls: Arc<AtomicUsize>,
        assessment_calls: Arc<AtomicUsize>,
    }

    fn harness(
        research_citations: Vec<Citation>,
        supplemental: Option<ExecutiveResearchResult>,
        scores: Vec<DimensionScore>,
    ) -> TestHarness {
        let incremental_calls = Arc::new(AtomicUsize::new(0));
        let assessment_calls = Arc::new(AtomicUsize::new(0));
        TestHarness {
            capabilities: CapabilitySet {
                research: Arc::new(StaticResearch {
                    citations: research_citations,
                }),
                parser: Arc::new(EchoParser),
                incremental: Arc::new(StaticIncremental {
                    supplemental,
                    calls: Arc::clone(&incremental_calls),
                }),
                assessment: Arc::new(StaticAssessment {
                    scores,
                    calls: Arc::clone(&assessment_calls),
                }),
            },
            sessions: Arc::new(InMemorySessionStore::new()),
            incremental_calls,
            assessment_calls,
        }
    }

    #[tokio::test]
    async fn test_passing_gate_skips_incremental_search() {
        let h = harness(
            vec![citation("https://1"), citation("https://2"), citation("https://3")],
            Some(supplemental_research(&["https://x"])),
            vec![dimension("Leadership", Some(4))],
        );
        let pipeline = CandidatePipeline::new(&h.capabilities, h.sessions.as_ref(), 3);
        let outcome = pipeline
            .run("screenA", &candidate(), "# Rubric", None)
            .await
            .unwrap();

        assert_eq!(h.incremental_calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.assessment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.research.citations.len(), 3);

        let snapshot = h
            .sessions
            .get(&SessionKey::new("screenA", "recP1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.last_step, PipelineStep::Complete);
        assert!(!snapshot.quality_gate_triggered);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failing_gate_runs_one_incremental_attempt_without_regating() {
        // 1 citation fails the gate; incremental adds 2 more (3 total). The
        // pipeline must proceed to assessment on this single attempt even
        // though 3 would now satisfy the gate.
        let h = harness(
            vec![citation("https://1")],
            Some(supplemental_research(&["https://2", "https://3"])),
            vec![dimension("Leadership", Some(4))],
        );
        let pipeline = CandidatePipeline::new(&h.capabilities, h.sessions.as_ref(), 3);
        let outcome = pipeline
            .run("screenA", &candidate(), "# Rubric", None)
            .await
            .unwrap();

        assert_eq!(h.incremental_calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.assessment_calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.research.citations.len(), 3);

        let snapshot = h
            .sessions
            .get(&SessionKey::new("screenA", "recP1"))
            .await
            .unwrap()
            .unwrap();
        assert!(snapshot.quality_gate_triggered);
        assert_eq!(snapshot.last_step, PipelineStep::Complete);
    }

    #[tokio::test]
    async fn test_empty_incremental_degrades_to_baseline() {
        let h = harness(
            vec![citation("https://1")],
            None,
            vec![dimension("Leadership", Some(3))],
        );
        let pipeline = CandidatePipeline::new(&h.capabilities, h.sessions.as_ref(), 3);
        let outcome = pipeline
            .run("screenA", &candidate(), "# Rubric", None)
            .await
            .unwrap();

        // Baseline unchanged, assessment still ran.
        assert_eq!(outcome.research.citations.len(), 1);
        assert_eq!(h.assessment_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_overall_score_is_overwritten_and_rubric_stamped() {
        let h = harness(
            vec![citation("https://1"), citation("https://2"), citation("https://3")],
            None,
            vec![
                dimension("Leadership", Some(5)),
                dimension("Fundraising", None),
                dimension("Strategy", Some(3)),
            ],
        );
        let pipeline = CandidatePipeline::new(&h.capabilities, h.sessions.as_ref(), 3);
        let outcome = pipeline
            .run("screenA", &candidate(), "# CFO Rubric", None)
            .await
            .unwrap();

        // The mock reported 1.0; the deterministic algorithm says 80.0.
        assert_eq!(outcome.assessment.overall_score, Some(80.0));
        assert_eq!(
            outcome.assessment.role_spec_used.as_deref(),
            Some("# CFO Rubric")
        );
    }

    #[tokio::test]
    async fn test_research_failure_records_error_and_stage() {
        let capabilities = CapabilitySet {
            research: Arc::new(FailingResearch),
            parser: Arc::new(EchoParser),
            incremental: Arc::new(StaticIncremental {
                supplemental: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            assessment: Arc::new(StaticAssessment {
                scores: vec![],
                calls: Arc::new(AtomicUsize::new(0)),
            }),
        };
        let sessions = Arc::new(InMemorySessionStore::new());
        let pipeline = CandidatePipeline::new(&capabilities, sessions.as_ref(), 3);
        let error = pipeline
            .run("screenA", &candidate(), "# Rubric", None)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ScreeningError::Capability {
                stage: "deep_research",
                ..
            }
        ));
        let snapshot = sessions
            .get(&SessionKey::new("screenA", "recP1"))
            .await
            .unwrap()
            .unwrap();
        // Nothing completed, and the error text names the failing stage.
        assert_eq!(snapshot.last_step, PipelineStep::Start);
        let last_error = snapshot.last_error.unwrap();
        assert!(last_error.contains("deep_research"));
        assert!(last_error.contains("Jane Doe"));
    }

    #[tokio::test]
    async fn test_assessment_failure_keeps_completed_progress() {
        let capabilities = CapabilitySet {
            research: Arc::new(StaticResearch {
                citations: vec![
                    citation("https://1"),
                    citation("https://2"),
                    citation("https://3"),
                ],
            }),
            parser: Arc::new(EchoParser),
            incremental: Arc::new(StaticIncremental {
                supplemental: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            assessment: Arc::new(FailingAssessment),
        };
        let sessions = Arc::new(InMemorySessionStore::new());
        let pipeline = CandidatePipeline::new(&capabilities, sessions.as_ref(), 3);
        let error = pipeline
            .run("screenA", &candidate(), "# Rubric", None)
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            ScreeningError::Capability {
                stage: "assessment",
                ..
            }
        ));
        let snapshot = sessions
            .get(&SessionKey::new("screenA", "recP1"))
            .await
            .unwrap()
            .unwrap();
        // Research and the gate completed; the failure is distinguishable
        // from one during research.
        assert_eq!(snapshot.last_step, PipelineStep::QualityCheck);
        assert!(snapshot.research.is_some());
        assert!(snapshot.assessment.is_none());
        assert!(snapshot.last_error.unwrap().contains("assessment"));
    }
}
