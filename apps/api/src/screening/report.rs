//! Markdown rendering for screening results: a compact inline block for
//! table views and a full per-candidate report stored with the assessment.

use crate::screening::models::{
    AssessmentResult, CandidateContext, DimensionScore, ExecutiveResearchResult, MustHaveCheck,
};

/// Renders a concise markdown summary for inline display.
pub fn render_assessment_inline(
    context: &CandidateContext,
    assessment: &AssessmentResult,
    research: Option<&ExecutiveResearchResult>,
) -> String {
    let score_display = match assessment.overall_score {
        Some(score) => format!("{score:.1}"),
        None => "Unknown".to_string(),
    };
    let summary = if assessment.summary.trim().is_empty() {
        "No summary provided."
    } else {
        assessment.summary.trim()
    };

    let mut lines = vec![
        format!("### {}", context.candidate_name),
        format!(
            "**Current Role:** {} @ {}",
            context.current_title, context.current_company
        ),
        format!(
            "**Overall Score:** {score_display}/100 ({} confidence)",
            assessment.overall_confidence.as_str()
        ),
        String::new(),
        "**Summary**".to_string(),
        summary.to_string(),
        String::new(),
        "**Dimension Snapshot**".to_string(),
    ];
    lines.extend(format_dimension_snapshot(&assessment.dimension_scores));
    lines.push(String::new());
    lines.push("**Must-Haves**".to_string());
    lines.push(format!("- {}", format_must_have_summary(&assessment.must_haves)));

    if let Some(research) = research {
        if !research.summary.trim().is_empty() {
            lines.push(String::new());
            lines.push("**Research Signal**".to_string());
            lines.push(format!("- {}", shorten(research.summary.trim(), 240)));
        }
    }

    let mut rendered = lines.join("\n").trim().to_string();
    rendered.push('\n');
    rendered
}

/// Renders the comprehensive per-candidate report combining assessment and
/// research, stored alongside the assessment record.
pub fn render_screen_report(
    screen_id: &str,
    context: &CandidateContext,
    assessment: &AssessmentResult,
    research: Option<&ExecutiveResearchResult>,
    role_spec_markdown: Option<&str>,
    custom_instructions: Option<&str>,
) -> String {
    let score_display = match assessment.overall_score {
        Some(score) => format!("{score:.1}"),
        None => "Unknown".to_string(),
    };
    let linkedin = context.linkedin_url.as_deref().unwrap_or("Not provided");

    let mut lines: Vec<String> = vec![
        format!("# Screen Report: {}", context.candidate_name),
        String::new(),
        "## Candidate Snapshot".to_string(),
        format!("- **Screen ID:** {screen_id}"),
        format!("- **Candidate ID:** {}", context.candidate_id),
        format!(
            "- **Current Role:** {} @ {}",
            context.current_title, context.current_company
        ),
        format!("- **LinkedIn:** {linkedin}"),
    ];

    if let Some(instructions) = custom_instructions {
        if !instructions.trim().is_empty() {
            lines.push(format!("- **Custom Instructions:** {}", instructions.trim()));
        }
    }

    lines.extend([
        String::new(),
        "## Assessment Summary".to_string(),
        format!("- **Overall Score:** {score_display}/100"),
        format!("- **Confidence:** {}", assessment.overall_confidence.as_str()),
        String::new(),
        "### Topline Narrative".to_string(),
        if assessment.summary.trim().is_empty() {
            "No summary provided.".to_string()
        } else {
            assessment.summary.trim().to_string()
        },
        String::new(),
        "### Dimension Details".to_string(),
    ]);

    if assessment.dimension_scores.is_empty() {
        lines.push("- No dimension scores provided.".to_string());
    } else {
        for score in &assessment.dimension_scores {
            let rating = match score.score {
                Some(value) => format!("{value}/5"),
                None => "Unknown".to_string(),
            };
            let mut line = format!(
                "- **{}** — {rating} | {} confidence",
                score.dimension,
                score.confidence.as_str()
            );
            if !score.reasoning.trim().is_empty() {
                line.push_str(&format!("\n  - Evidence: {}", score.reasoning.trim()));
            }
            lines.push(line);
        }
    }

    lines.extend([
        String::new(),
        "### Must-Haves".to_string(),
        format_must_have_summary(&assessment.must_haves),
    ]);

    if !assessment.red_flags.is_empty() {
        lines.push(String::new());
        lines.push("### Red Flags".to_string());
        lines.extend(assessment.red_flags.iter().map(|flag| format!("- {flag}")));
    }
    if !assessment.green_flags.is_empty() {
        lines.push(String::new());
        lines.push("### Green Flags".to_string());
        lines.extend(assessment.green_flags.iter().map(|flag| format!("- {flag}")));
    }
    if !assessment.counterfactuals.is_empty() {
        lines.push(String::new());
        lines.push("### Counterfactuals".to_string());
        lines.extend(
            assessment
                .counterfactuals
                .iter()
                .map(|idea| format!("- {idea}")),
        );
    }

    match research {
        Some(research) => {
            lines.push(String::new());
            lines.push("## Research Summary".to_string());
            lines.push(if research.summary.trim().is_empty() {
                "Research summary unavailable.".to_string()
            } else {
                research.summary.trim().to_string()
            });

            if !research.achievements.is_empty() {
                lines.push(String::new());
                lines.push("### Key Achievements".to_string());
                lines.extend(research.achievements.iter().map(|a| format!("- {a}")));
            }

            if !research.career_timeline.is_empty() {
                lines.push(String::new());
                lines.push("### Career Timeline (most recent first)".to_string());
                for entry in research.career_timeline.iter().rev().take(5) {
                    let start = entry.start_date.as_deref().unwrap_or("?");
                    let end = entry.end_date.as_deref().unwrap_or("Present");
                    lines.push(format!(
                        "- {} @ {} ({start} – {end})",
                        entry.role, entry.company
                    ));
                }
            }

            if !research.citations.is_empty() {
                lines.push(String::new());
                lines.push("### Citations".to_string());
                for citation in research.citations.iter().take(10) {
                    let suffix = if citation.url.is_empty() {
                        String::new()
                    } else {
                        format!(" — {}", citation.url)
                    };
                    lines.push(format!("- {}{suffix}", citation.title));
                }
            }
        }
        None => {
            lines.push(String::new());
            lines.push("## Research Summary".to_string());
            lines.push("No research results were available for this candidate.".to_string());
        }
    }

    if let Some(role_spec) = role_spec_markdown {
        let snippet: Vec<&str> = role_spec.trim().lines().take(20).collect();
        if !snippet.is_empty() {
            lines.push(String::new());
            lines.push("## Role Spec Snapshot".to_string());
            lines.push("```markdown".to_string());
            lines.extend(snippet.iter().map(|line| line.to_string()));
            lines.push("```".to_string());
        }
    }

    let mut rendered = lines.join("\n").trim().to_string();
    rendered.push('\n');
    rendered
}

/// Compact markdown list summarizing up to five dimension scores.
fn format_dimension_snapshot(scores: &[DimensionScore]) -> Vec<String> {
    if scores.is_empty() {
        return vec!["- No dimension scores were provided.".to_string()];
    }

    scores
        .iter()
        .take(5)
        .map(|score| {
            let rating = match score.score {
                Some(value) => format!("{value}/5"),
                None => "Unknown".to_string(),
            };
            format!(
                "- **{}:** {rating} — {} confidence, {} evidence",
                score.dimension,
                score.confidence.as_str(),
                score.evidence_level.as_str()
            )
        })
        .collect()
}

/// Single-line description of must-have coverage.
fn format_must_have_summary(checks: &[MustHaveCheck]) -> String {
    if checks.is_empty() {
        return "No must-have requirements were evaluated.".to_string();
    }
    let met = checks.iter().filter(|check| check.met).count();
    format!("Met {met}/{} must-have requirements.", checks.len())
}

/// Truncates to `width` bytes at a char boundary, appending "..." when cut.
fn shorten(text: &str, width: usize) -> String {
    if text.len() <= width {
        return text.to_string();
    }
    let mut cut = width.saturating_sub(3);
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", text[..cut].trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::models::ConfidenceTier;
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

    fn assessment(overall_score: Option<f64>) -> AssessmentResult {
        AssessmentResult {
            overall_score,
            overall_confidence: ConfidenceTier::Medium,
            dimension_scores: vec![DimensionScore {
                dimension: "Leadership".to_string(),
                score: Some(4),
                evidence_level: ConfidenceTier::High,
                confidence: ConfidenceTier::Medium,
                reasoning: "Scaled the finance org from 5 to 40.".to_string(),
                evidence_quotes: vec![],
                citation_urls: vec![],
            }],
            must_haves: vec![
                MustHaveCheck {
                    requirement: "10+ years finance".to_string(),
                    met: true,
                    evidence: None,
                },
                MustHaveCheck {
                    requirement: "IPO experience".to_string(),
                    met: false,
                    evidence: None,
                },
            ],
            red_flags: vec![],
            green_flags: vec!["Repeat CFO".to_string()],
            summary: "Strong operational finance leader.".to_string(),
            counterfactuals: vec![],
            role_spec_used: None,
            assessed_at: Utc::now(),
            capability_id: "test".to_string(),
        }
    }

    #[test]
    fn test_inline_report_contains_score_and_must_haves() {
        let rendered = render_assessment_inline(&context(), &assessment(Some(80.0)), None);
        assert!(rendered.contains("### Jane Doe"));
        assert!(rendered.contains("80.0/100"));
        assert!(rendered.contains("Met 1/2 must-have requirements."));
    }

    #[test]
    fn test_inline_report_renders_unknown_score() {
        let rendered = render_assessment_inline(&context(), &assessment(None), None);
        assert!(rendered.contains("Unknown/100"));
    }

    #[test]
    fn test_full_report_sections() {
        let rendered = render_screen_report(
            "screenA",
            &context(),
            &assessment(Some(80.0)),
            None,
            Some("# CFO Rubric\n- Fundraising"),
            Some("Weight fundraising heavily"),
        );
        assert!(rendered.contains("# Screen Report: Jane Doe"));
        assert!(rendered.contains("- **Screen ID:** screenA"));
        assert!(rendered.contains("### Green Flags"));
        assert!(rendered.contains("No research results were available"));
        assert!(rendered.contains("## Role Spec Snapshot"));
        assert!(rendered.contains("Custom Instructions"));
    }

    #[test]
    fn test_shorten_truncates_long_text() {
        let long = "x".repeat(300);
        let short = shorten(&long, 240);
        assert!(short.len() <= 240);
        assert!(short.ends_with("..."));
        assert_eq!(shorten("brief", 240), "brief");
    }
}
