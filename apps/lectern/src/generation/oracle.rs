//! Content Oracle — the untrusted source of raw slide material.
//!
//! The oracle proposes content blocks for a lesson fragment. Size constraints are
//! passed as hints only: everything it returns goes through `parse_proposal` (the
//! strict validation boundary) and is then re-measured by the estimator before it
//! reaches a slide.
//!
//! `CourseOrchestrator` holds an `Arc<dyn Oracle>`; `LlmOracle` is the production
//! backend, tests use scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::OracleError;
use crate::generation::prompts::{
    INCREMENTAL_MODE_INSTRUCTION, PROPOSE_PROMPT_TEMPLATE, PROPOSE_SYSTEM,
    WHOLE_SLIDE_MODE_INSTRUCTION,
};
use crate::layout::metrics::LayoutMetrics;
use crate::llm_client::prompts::FIDELITY_INSTRUCTION;
use crate::llm_client::{LlmClient, LlmError};
use crate::models::slide::ContentBlock;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

/// The slice of a lesson sent to the oracle in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonFragment {
    pub lesson_id: String,
    pub lesson_title: String,
    pub heading: String,
    pub points: Vec<String>,
    /// 1-based position of this fragment within its segment.
    pub increment: usize,
    pub total_increments: usize,
}

/// Size hints for a proposal. The oracle may ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProposalConstraints {
    pub max_blocks: usize,
    pub max_bullets_per_list: usize,
    pub max_chars_per_item: usize,
    pub whole_slide: bool,
}

impl ProposalConstraints {
    /// Hints for one small increment: a block or two of short items.
    pub fn incremental(metrics: &LayoutMetrics) -> Self {
        Self {
            max_blocks: 2,
            max_bullets_per_list: 4,
            max_chars_per_item: metrics.chars_per_line as usize,
            whole_slide: false,
        }
    }

    /// Hints for a complete candidate slide, sized to the slide's subtitle state.
    pub fn whole_slide(metrics: &LayoutMetrics, has_subtitle: bool) -> Self {
        let lines = metrics.target(has_subtitle) / metrics.bullet_height.max(1);
        Self {
            max_blocks: 4,
            max_bullets_per_list: lines.max(1) as usize,
            max_chars_per_item: metrics.chars_per_line as usize,
            whole_slide: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn propose(
        &self,
        fragment: &LessonFragment,
        constraints: &ProposalConstraints,
    ) -> Result<Vec<ContentBlock>, OracleError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Validation boundary
// ────────────────────────────────────────────────────────────────────────────

/// Loosely-typed block exactly as the model emitted it.
#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: String,
    heading: Option<String>,
    items: Option<Vec<String>>,
    caption: Option<String>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawProposal {
    Wrapped { blocks: Vec<RawBlock> },
    Bare(Vec<RawBlock>),
}

/// Parses oracle text into strict content blocks.
///
/// Accepts `{"blocks": [...]}` or a bare array, optionally wrapped in markdown
/// fences. Blank optional fields become `None`, blank bullet items are dropped;
/// anything else that does not conform is `OracleError::Malformed`.
pub fn parse_proposal(text: &str) -> Result<Vec<ContentBlock>, OracleError> {
    let text = crate::llm_client::strip_json_fences(text);
    let raw: RawProposal = serde_json::from_str(text)
        .map_err(|e| OracleError::Malformed(format!("invalid proposal JSON: {e}")))?;
    let raw_blocks = match raw {
        RawProposal::Wrapped { blocks } => blocks,
        RawProposal::Bare(blocks) => blocks,
    };

    if raw_blocks.is_empty() {
        return Err(OracleError::Malformed("proposal contains no blocks".to_string()));
    }

    raw_blocks
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            into_block(raw).map_err(|reason| OracleError::Malformed(format!("block {i}: {reason}")))
        })
        .collect()
}

fn into_block(raw: RawBlock) -> Result<ContentBlock, String> {
    match raw.kind.trim().to_ascii_lowercase().as_str() {
        "bullet_list" | "bullets" => {
            let items: Vec<String> = raw
                .items
                .ok_or("bullet_list without items")?
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect();
            if items.is_empty() {
                return Err("bullet_list has no non-empty items".to_string());
            }
            Ok(ContentBlock::BulletList {
                heading: non_blank(raw.heading),
                items,
            })
        }
        "image" => Ok(ContentBlock::Image {
            caption: non_blank(raw.caption),
        }),
        "callout" => Ok(ContentBlock::Callout {
            text: non_blank(raw.text).ok_or("callout without text")?,
        }),
        "paragraph" => Ok(ContentBlock::Paragraph {
            text: non_blank(raw.text).ok_or("paragraph without text")?,
        }),
        other => Err(format!("unknown block type '{other}'")),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// LlmOracle — production backend
// ────────────────────────────────────────────────────────────────────────────

/// Oracle backed by the Claude API via `LlmClient`.
pub struct LlmOracle {
    llm: LlmClient,
}

impl LlmOracle {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Oracle for LlmOracle {
    async fn propose(
        &self,
        fragment: &LessonFragment,
        constraints: &ProposalConstraints,
    ) -> Result<Vec<ContentBlock>, OracleError> {
        let prompt = build_prompt(fragment, constraints);
        let text = self
            .llm
            .call_text(&prompt, PROPOSE_SYSTEM)
            .await
            .map_err(classify_llm_error)?;
        let blocks = parse_proposal(&text)?;
        debug!(
            lesson_id = %fragment.lesson_id,
            heading = %fragment.heading,
            blocks = blocks.len(),
            "Oracle proposal parsed"
        );
        Ok(blocks)
    }
}

/// Maps transport/API failures onto the retryable/terminal oracle taxonomy.
pub(crate) fn classify_llm_error(err: LlmError) -> OracleError {
    if !err.is_retryable() {
        return OracleError::Terminal(err.to_string());
    }
    match err {
        LlmError::Http(e) if e.is_timeout() => OracleError::Timeout,
        LlmError::Http(e) => OracleError::Unavailable(e.to_string()),
        LlmError::Api { status: 429, message } => OracleError::RateLimited(message),
        LlmError::Api { status, message } => {
            OracleError::Unavailable(format!("status {status}: {message}"))
        }
        LlmError::EmptyContent => OracleError::Malformed("empty content".to_string()),
    }
}

pub(crate) fn build_prompt(fragment: &LessonFragment, constraints: &ProposalConstraints) -> String {
    let points = fragment
        .points
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n");
    let mode_instruction = if constraints.whole_slide {
        WHOLE_SLIDE_MODE_INSTRUCTION
    } else {
        INCREMENTAL_MODE_INSTRUCTION
    };

    PROPOSE_PROMPT_TEMPLATE
        .replace("{lesson_title}", &fragment.lesson_title)
        .replace("{heading}", &fragment.heading)
        .replace("{fidelity_instruction}", FIDELITY_INSTRUCTION)
        .replace("{increment}", &fragment.increment.to_string())
        .replace("{total_increments}", &fragment.total_increments.to_string())
        .replace("{points}", &points)
        .replace("{max_blocks}", &constraints.max_blocks.to_string())
        .replace("{max_bullets}", &constraints.max_bullets_per_list.to_string())
        .replace("{max_chars}", &constraints.max_chars_per_item.to_string())
        .replace("{mode_instruction}", mode_instruction)
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
