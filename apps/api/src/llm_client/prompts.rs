#![allow(dead_code)]

// Shared prompt constants and prompt-building utilities.
// Each capability defines its own prompts.rs alongside it; this file
// contains cross-cutting fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to every capability prompt that emits evidence.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Every claim must be backed by a citation URL from the supplied \
    research. Do NOT infer, interpolate, or invent facts about the candidate. \
    If the evidence does not support a claim, omit it entirely.";

/// Instruction for scorers: missing evidence is null, never a low number.
pub const UNKNOWN_SCORE_INSTRUCTION: &str = "\
    CRITICAL: When evidence is insufficient to score a dimension, set its \
    score to null. NEVER substitute 0, 1, or a guess for missing evidence. \
    A null score means 'unknown', and is handled separately downstream.";
