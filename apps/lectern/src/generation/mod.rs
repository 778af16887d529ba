// Lesson generation: oracle boundary, per-lesson assembly, course orchestration.
// All LLM calls go through llm_client — the oracle here only wraps it.

pub mod assembler;
pub mod orchestrator;
pub mod oracle;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;
