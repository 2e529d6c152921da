// All LLM prompt constants for the screening capabilities.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for the research capability — free-text narrative output.
pub const RESEARCH_SYSTEM: &str =
    "You are an executive research analyst producing thorough, citation-backed \
    research on senior operators and executives. Use only publicly verifiable \
    information. Write in structured markdown. Include inline citations as \
    markdown links with full URLs. Be explicit about what you could NOT find.";

/// Research prompt template. Replace `{candidate_name}`, `{current_title}`,
/// `{current_company}`, `{linkedin_section}`, `{role_section}` before sending.
pub const RESEARCH_PROMPT_TEMPLATE: &str = r#"Candidate: {candidate_name}
Current Title: {current_title} at {current_company}{linkedin_section}{role_section}

Research this executive comprehensively.

Focus on:
- Career trajectory: roles, companies, tenure, progression
- Leadership experience: team sizes, scope of responsibility
- Domain expertise: technical/functional areas, industry sectors
- Company stage experience: startup, growth, scale, public
- Notable achievements: exits, fundraising, product launches
- Public evidence: LinkedIn, company sites, news articles

Structure your response with clear sections:
- Executive Summary
- Career Timeline
- Leadership & Team Building
- Domain Expertise
- Stage & Sector Experience
- Key Achievements
- Gaps in Public Evidence

Include inline citations as markdown links with URLs and relevant quotes.

Be explicit about:
- What you found, with supporting citations
- What you couldn't find (gaps)
- Confidence level based on evidence quality and quantity"#;

/// System prompt for the parser capability — enforces JSON-only output.
pub const PARSER_SYSTEM: &str =
    "You are a meticulous research analyst who extracts structured data from \
    free-text executive research. Extract only what the narrative supports. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Parser prompt template. Replace `{candidate_name}`, `{current_title}`,
/// `{current_company}`, `{narrative}`, `{citations_json}` before sending.
pub const PARSER_PROMPT_TEMPLATE: &str = r#"Extract structured research data for this candidate from the narrative below.

CANDIDATE: {candidate_name}, {current_title} at {current_company}

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "2-4 paragraph executive summary drawn from the narrative",
  "career_timeline": [
    {"company": "Acme", "role": "CFO", "start_date": "2019", "end_date": null, "achievements": ["Raised $40M Series C"]}
  ],
  "achievements": ["Raised $40M Series C at Acme"],
  "notable_companies": ["Acme"],
  "sector_expertise": ["fintech"],
  "stage_exposure": ["Series B", "Series C"],
  "citations": [
    {"url": "https://...", "title": "Source title", "snippet": "supporting quote"}
  ]
}

Rules:
- Every citation must carry the URL exactly as it appears in the narrative or the supplied citation list.
- Dates are free-form strings as found ("2019", "Mar 2019"); use null when unknown.
- Leave lists empty rather than guessing.
- The summary must be non-empty whenever the narrative has any substance.

KNOWN CITATIONS:
{citations_json}

NARRATIVE:
{narrative}"#;

/// System prompt for the incremental search capability.
/// The two-search budget is this capability's own constraint, not the pipeline's.
pub const INCREMENTAL_SYSTEM: &str =
    "You are a single-pass supplemental researcher. You run only when initial \
    research lacks sufficient citations or key evidence. Perform at most TWO \
    targeted searches to address the supplied gaps, then stop. Return only NEW \
    information with supporting citations. \
    You MUST respond with valid JSON only (the research object, or null if \
    nothing new was found). Do NOT use markdown code fences.";

/// Incremental search prompt template. Replace `{candidate_name}`,
/// `{current_title}`, `{current_company}`, `{gaps_section}`, `{role_section}`
/// before sending.
pub const INCREMENTAL_PROMPT_TEMPLATE: &str = r#"CANDIDATE: {candidate_name}
CURRENT ROLE: {current_title} at {current_company}

GAPS IDENTIFIED IN EXISTING RESEARCH:
{gaps_section}{role_section}

Run up to TWO targeted searches to close the gaps. Focus on:
- Missing LinkedIn/biography details
- Leadership scope (team size, budgets, org design)
- Fundraising or product evidence relevant to the role specification

Return a JSON object with the same schema as structured research (summary,
career_timeline, achievements, notable_companies, sector_expertise,
stage_exposure, citations), containing ONLY new information, or the JSON
value null if nothing new was found."#;

/// System prompt for the assessment capability — enforces JSON-only output.
pub const ASSESSMENT_SYSTEM: &str =
    "You are an executive assessment specialist scoring a candidate against a \
    role specification. Score each rubric dimension on a 1-5 scale, tying \
    every score to cited evidence. Never fabricate. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Assessment prompt template. Replace `{role_spec}`, `{research_block}`,
/// `{evidence_instruction}`, `{unknown_instruction}`, `{custom_section}`
/// before sending.
pub const ASSESSMENT_PROMPT_TEMPLATE: &str = r#"ROLE SPECIFICATION:
{role_spec}

CANDIDATE RESEARCH:
{research_block}

EVALUATION TASK:
For each dimension in the role specification:
- Score on a 1-5 scale with confidence (High/Medium/Low) and 1-3 sentences of reasoning tied to citations.
- Record the evidence level the role spec assigns to the dimension.
{evidence_instruction}
{unknown_instruction}

Then summarize must-have checks, red flags, green flags, and counterfactuals
(what additional evidence would most change this assessment).

Return a JSON object with this EXACT schema (no extra fields):
{
  "overall_score": null,
  "overall_confidence": "Medium",
  "dimension_scores": [
    {
      "dimension": "Fundraising",
      "score": 4,
      "evidence_level": "High",
      "confidence": "Medium",
      "reasoning": "Led two institutional rounds at Acme.",
      "evidence_quotes": ["...raised a $40M Series C..."],
      "citation_urls": ["https://..."]
    }
  ],
  "must_haves": [
    {"requirement": "10+ years operational finance", "met": true, "evidence": "CFO since 2014"}
  ],
  "red_flags": [],
  "green_flags": [],
  "summary": "2-3 sentence topline assessment",
  "counterfactuals": []
}{custom_section}"#;
