//! Batch screening service — validates the screen payload, runs every
//! candidate through its own pipeline concurrently, persists successful
//! assessments, and aggregates a per-candidate outcome report.
//!
//! One candidate's failure never aborts its siblings: a batch of N can finish
//! with some subset complete and the rest listed in the error report, each
//! with enough context to retry that one candidate.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::screening::capabilities::CapabilitySet;
use crate::screening::models::{CandidateContext, ConfidenceTier};
use crate::screening::pipeline::{CandidatePipeline, ScreenOutcome, ScreeningError};
use crate::screening::report::{render_assessment_inline, render_screen_report};
use crate::screening::session::SessionStateStore;
use crate::screening::stages::role_spec_excerpt;

// ────────────────────────────────────────────────────────────────────────────
// Request / response models
// ────────────────────────────────────────────────────────────────────────────

/// Webhook payload for one screening run.
#[derive(Debug, Clone, Deserialize)]
pub struct ScreenRequest {
    pub screen_id: String,
    pub role_spec_markdown: String,
    #[serde(default)]
    pub custom_instructions: Option<String>,
    pub candidates: Vec<CandidateInput>,
}

/// One candidate as delivered by the webhook. Optional fields arrive as
/// empty strings and are normalized in [`CandidateInput::to_context`].
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub linkedin: String,
}

impl CandidateInput {
    pub fn to_context(&self, role_context: Option<String>) -> CandidateContext {
        CandidateContext {
            candidate_id: self.id.clone(),
            candidate_name: if self.name.trim().is_empty() {
                "Unnamed Candidate".to_string()
            } else {
                self.name.clone()
            },
            current_title: if self.title.trim().is_empty() {
                "Unknown".to_string()
            } else {
                self.title.clone()
            },
            current_company: if self.company.trim().is_empty() {
                "Unknown".to_string()
            } else {
                self.company.clone()
            },
            linkedin_url: if self.linkedin.trim().is_empty() {
                None
            } else {
                Some(self.linkedin.clone())
            },
            role_context,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScreenResponse {
    pub status: String,
    pub screen_id: String,
    pub candidates_total: usize,
    pub candidates_processed: usize,
    pub candidates_failed: usize,
    pub execution_time_seconds: f64,
    pub results: Vec<CandidateResult>,
    pub errors: Vec<CandidateFailure>,
}

#[derive(Debug, Serialize)]
pub struct CandidateResult {
    pub candidate_id: String,
    pub assessment_id: Uuid,
    pub overall_score: Option<f64>,
    pub confidence: ConfidenceTier,
    pub summary: String,
    pub assessed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CandidateFailure {
    pub candidate_id: String,
    pub error: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Batch execution
// ────────────────────────────────────────────────────────────────────────────

/// Runs a full screening batch. Candidates execute concurrently, each with
/// its own pipeline instance and session record.
pub async fn process_screen(
    db: &PgPool,
    capabilities: Arc<CapabilitySet>,
    sessions: Arc<dyn SessionStateStore>,
    min_citations: usize,
    request: ScreenRequest,
) -> Result<ScreenResponse, ScreeningError> {
    validate_screen(&request)?;

    let started = Instant::now();
    info!(
        "Screening {} candidates for screen {}",
        request.candidates.len(),
        request.screen_id
    );

    let role_excerpt = role_spec_excerpt(&request.role_spec_markdown).to_string();

    let mut errors: Vec<CandidateFailure> = Vec::new();
    let mut handles = Vec::new();
    for candidate in &request.candidates {
        if candidate.id.trim().is_empty() {
            error!("Candidate record missing ID; skipping record");
            errors.push(CandidateFailure {
                candidate_id: "unknown".to_string(),
                error: "Candidate record missing ID".to_string(),
            });
            continue;
        }

        let context = candidate.to_context(Some(role_excerpt.clone()));
        let capabilities = Arc::clone(&capabilities);
        let sessions = Arc::clone(&sessions);
        let screen_id = request.screen_id.clone();
        let role_spec = request.role_spec_markdown.clone();
        let custom = request.custom_instructions.clone();

        let handle = tokio::spawn(async move {
            let pipeline =
                CandidatePipeline::new(&capabilities, sessions.as_ref(), min_citations);
            pipeline
                .run(&screen_id, &context, &role_spec, custom.as_deref())
                .await
                .map(|outcome| (context, outcome))
        });
        handles.push((candidate.id.clone(), candidate.name.clone(), handle));
    }

    let mut results = Vec::new();
    for (candidate_id, candidate_name, handle) in handles {
        match handle.await {
            Ok(Ok((context, outcome))) => {
                match persist_assessment(
                    db,
                    &request.screen_id,
                    &context,
                    &outcome,
                    &request.role_spec_markdown,
                    request.custom_instructions.as_deref(),
                )
                .await
                {
                    Ok(assessment_id) => {
                        info!(
                            "Candidate {} screened successfully (score={:?})",
                            candidate_name, outcome.assessment.overall_score
                        );
                        results.push(CandidateResult {
                            candidate_id,
                            assessment_id,
                            overall_score: outcome.assessment.overall_score,
                            confidence: outcome.assessment.overall_confidence,
                            summary: outcome.assessment.summary.clone(),
                            assessed_at: outcome.assessment.assessed_at,
                        });
                    }
                    Err(e) => {
                        error!("Failed to persist assessment for {candidate_name}: {e}");
                        errors.push(CandidateFailure {
                            candidate_id,
                            error: format!(
                                "Assessment completed but could not be persisted: {e}"
                            ),
                        });
                    }
                }
            }
            Ok(Err(e)) => {
                error!("Candidate {candidate_name} failed during screening: {e}");
                errors.push(CandidateFailure {
                    candidate_id,
                    error: e.to_string(),
                });
            }
            Err(join_error) => {
                error!("Candidate {candidate_name} screening task aborted: {join_error}");
                errors.push(CandidateFailure {
                    candidate_id,
                    error: format!("Screening task aborted: {join_error}"),
                });
            }
        }
    }

    let duration = started.elapsed().as_secs_f64();
    info!(
        "Screen {} completed ({} successes, {} failures)",
        request.screen_id,
        results.len(),
        errors.len()
    );

    Ok(ScreenResponse {
        status: batch_status(&errors).to_string(),
        screen_id: request.screen_id,
        candidates_total: request.candidates.len(),
        candidates_processed: results.len(),
        candidates_failed: errors.len(),
        execution_time_seconds: (duration * 100.0).round() / 100.0,
        results,
        errors,
    })
}

/// Rejects malformed payloads before any pipeline stage runs. No session
/// fields are populated for a rejected screen.
fn validate_screen(request: &ScreenRequest) -> Result<(), ScreeningError> {
    if request.role_spec_markdown.trim().is_empty() {
        return Err(ScreeningError::Validation(
            "A role specification is required".to_string(),
        ));
    }
    if request.candidates.is_empty() {
        return Err(ScreeningError::Validation(
            "At least one candidate is required".to_string(),
        ));
    }
    Ok(())
}

fn batch_status(errors: &[CandidateFailure]) -> &'static str {
    if errors.is_empty() {
        "success"
    } else {
        "partial"
    }
}

async fn persist_assessment(
    db: &PgPool,
    screen_id: &str,
    context: &CandidateContext,
    outcome: &ScreenOutcome,
    role_spec_markdown: &str,
    custom_instructions: Option<&str>,
) -> anyhow::Result<Uuid> {
    let assessment_id = Uuid::new_v4();
    let assessment_value = serde_json::to_value(&outcome.assessment)?;
    let research_value = serde_json::to_value(&outcome.research)?;
    let inline_markdown =
        render_assessment_inline(context, &outcome.assessment, Some(&outcome.research));
    let report_markdown = render_screen_report(
        screen_id,
        context,
        &outcome.assessment,
        Some(&outcome.research),
        Some(role_spec_markdown),
        custom_instructions,
    );

    sqlx::query(
        r#"
        INSERT INTO assessments
            (id, screen_id, candidate_id, candidate_name, overall_score,
             overall_confidence, assessment, research, inline_markdown,
             report_markdown, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
        "#,
    )
    .bind(assessment_id)
    .bind(screen_id)
    .bind(&context.candidate_id)
    .bind(&context.candidate_name)
    .bind(outcome.assessment.overall_score)
    .bind(outcome.assessment.overall_confidence.as_str())
    .bind(&assessment_value)
    .bind(&research_value)
    .bind(&inline_markdown)
    .bind(&report_markdown)
    .execute(db)
    .await?;

    Ok(assessment_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role_spec: &str, candidates: Vec<CandidateInput>) -> ScreenRequest {
        ScreenRequest {
            screen_id: "screenA".to_string(),
            role_spec_markdown: role_spec.to_string(),
            custom_instructions: None,
            candidates,
        }
    }

    fn input(id: &str, name: &str) -> CandidateInput {
        CandidateInput {
            id: id.to_string(),
            name: name.to_string(),
            title: String::new(),
            company: String::new(),
            linkedin: String::new(),
        }
    }

    #[test]
    fn test_validation_rejects_blank_role_spec() {
        let result = validate_screen(&request("   ", vec![input("recP1", "Jane")]));
        assert!(matches!(result, Err(ScreeningError::Validation(_))));
    }

    #[test]
    fn test_validation_rejects_empty_candidate_list() {
        let result = validate_screen(&request("# Rubric", vec![]));
        assert!(matches!(result, Err(ScreeningError::Validation(_))));
    }

    #[test]
    fn test_validation_accepts_complete_request() {
        assert!(validate_screen(&request("# Rubric", vec![input("recP1", "Jane")])).is_ok());
    }

    #[test]
    fn test_to_context_normalizes_missing_fields() {
        let context = input("recP1", "Jane Doe").to_context(None);
        assert_eq!(context.current_title, "Unknown");
        assert_eq!(context.current_company, "Unknown");
        assert!(context.linkedin_url.is_none());
    }

    #[test]
    fn test_to_context_keeps_supplied_fields() {
        let mut candidate = input("recP1", "Jane Doe");
        candidate.title = "CFO".to_string();
        candidate.company = "Acme".to_string();
        candidate.linkedin = "https://linkedin.com/in/janedoe".to_string();
        let context = candidate.to_context(Some("# Rubric".to_string()));
        assert_eq!(context.current_title, "CFO");
        assert_eq!(context.current_company, "Acme");
        assert_eq!(
            context.linkedin_url.as_deref(),
            Some("https://linkedin.com/in/janedoe")
        );
        assert_eq!(context.role_context.as_deref(), Some("# Rubric"));
    }

    #[test]
    fn test_to_context_blank_name_becomes_placeholder() {
        let context = input("recP1", "  ").to_context(None);
        assert_eq!(context.candidate_name, "Unnamed Candidate");
    }

    #[test]
    fn test_batch_status_reflects_errors() {
        assert_eq!(batch_status(&[]), "success");
        let failures = vec![CandidateFailure {
            candidate_id: "recP1".to_string(),
            error: "boom".to_string(),
        }];
        assert_eq!(batch_status(&failures), "partial");
    }

    #[test]
    fn test_screen_request_deserializes_with_defaults() {
        let json = serde_json::json!({
            "screen_id": "recScreen1",
            "role_spec_markdown": "# CFO Rubric",
            "candidates": [
                {"id": "recP1", "name": "Jane Doe"}
            ]
        });
        let request: ScreenRequest = serde_json::from_value(json).unwrap();
        assert!(request.custom_instructions.is_none());
        assert_eq!(request.candidates.len(), 1);
        assert!(request.candidates[0].title.is_empty());
    }
}
