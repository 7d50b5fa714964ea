// Shared prompt fragments. Each service that needs LLM calls defines its own prompts.rs
// alongside it; this file holds the cross-cutting pieces.

/// Instruction appended to prompts whose output lands in fixed-size visual containers.
pub const LENGTH_LIMIT_INSTRUCTION: &str = "\
    CRITICAL: Every field has a hard character limit. Count characters, not words. \
    A field that exceeds its limit will be cut off mid-sentence on the final image. \
    Prefer short, concrete phrasing over long sentences.";
