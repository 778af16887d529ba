// Shared prompt fragments. Each component that talks to the LLM keeps its own
// templates in a prompts.rs alongside it; only cross-cutting text lives here.

/// Instruction that keeps generated slide text tied to the lesson material.
pub const FIDELITY_INSTRUCTION: &str = "\
    CRITICAL: Only use the lesson points provided. Do NOT invent facts, \
    examples, statistics or references that the points do not support. \
    If a point is too thin for a block, keep the block short rather than padding it.";
