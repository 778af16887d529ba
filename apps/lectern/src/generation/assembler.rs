//! Section Assembler — turns one lesson into validated slides despite an unreliable oracle.
#![allow(dead_code)]
//!
//! # Architecture
//! - `SectionAssembler::assemble` is the async entry point. It never fails: every
//!   per-lesson problem ends up in `LessonResult::status`.
//! - `LessonTracker` owns the lesson's state machine, attempt count and committed
//!   slides. It performs no I/O and is tested on its own.
//! - Suspension happens only around oracle calls and retry backoff; packing is
//!   synchronous.
//!
//! # Phases
//! ```text
//! Pending → Generating → Validating → (Splitting) → Generating … → Committed
//!              │   ↑          │
//!              │   └─rejected─┘
//!              └────────────────→ Failed   (retries exhausted, terminal error, budget)
//! ```
//!
//! # Generation modes
//! - `Incremental`: segment points are sent a few at a time; each proposal is fed
//!   block by block into a capacity-bounded `SlideBuilder`.
//! - `WholeSlide`: one proposal per segment is treated as a candidate slide and
//!   repacked by the splitter when it overflows.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{AppError, OracleError, PackError};
use crate::generation::oracle::{LessonFragment, Oracle, ProposalConstraints};
use crate::layout::builder::{Admission, SlideBuilder};
use crate::layout::metrics::LayoutMetrics;
use crate::layout::splitter::{classify, split, Fit, SplitOutcome};
use crate::models::course::{LessonDescriptor, LessonResult, LessonSegment, LessonStatus};
use crate::models::slide::{ContentBlock, Slide};

// ────────────────────────────────────────────────────────────────────────────
// Settings
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Incremental,
    WholeSlide,
}

impl std::str::FromStr for GenerationMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "incremental" => Ok(GenerationMode::Incremental),
            "whole_slide" | "whole-slide" => Ok(GenerationMode::WholeSlide),
            other => Err(AppError::Config(format!(
                "unknown generation mode '{other}' (expected incremental or whole_slide)"
            ))),
        }
    }
}

/// Retry, timeout and increment sizing for one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerSettings {
    /// Oracle calls allowed per fragment, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub backoff_base: Duration,
    /// Upper bound for a single oracle call.
    pub call_timeout: Duration,
    /// Wall-clock budget for the whole lesson, retries and backoff included.
    pub lesson_budget: Duration,
    /// Lesson points sent per oracle call in incremental mode.
    pub points_per_increment: usize,
    pub mode: GenerationMode,
}

impl Default for AssemblerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1000),
            call_timeout: Duration::from_secs(45),
            lesson_budget: Duration::from_secs(120),
            points_per_increment: 3,
            mode: GenerationMode::Incremental,
        }
    }
}

impl AssemblerSettings {
    /// Backoff before retry number `attempt` (1-based count of calls made so far).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lesson state machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonPhase {
    Pending,
    Generating,
    Validating,
    Splitting,
    Committed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonEvent {
    /// Generation starts.
    Begin,
    /// The oracle call failed and will be retried.
    Retry,
    /// The oracle returned a parsed proposal.
    ProposalReceived,
    /// The proposal failed size validation and will be retried.
    Rejected,
    /// The candidate overflows and goes to the splitter.
    NeedsSplit,
    /// The proposal's blocks are on slides; the next fragment may start.
    Packed,
    /// All fragments are packed.
    Finish,
    /// Generation stopped early.
    Abandon,
}

impl LessonPhase {
    /// Applies `event`, rejecting transitions the assembler never makes.
    pub fn advance(self, event: LessonEvent) -> Result<LessonPhase, PackError> {
        use LessonEvent as E;
        use LessonPhase as P;

        match (self, event) {
            (P::Pending, E::Begin) => Ok(P::Generating),
            (P::Generating, E::Retry) => Ok(P::Generating),
            (P::Generating, E::ProposalReceived) => Ok(P::Validating),
            (P::Validating, E::Rejected) => Ok(P::Generating),
            (P::Validating, E::NeedsSplit) => Ok(P::Splitting),
            (P::Validating | P::Splitting, E::Packed) => Ok(P::Generating),
            (P::Generating, E::Finish) => Ok(P::Committed),
            (P::Pending | P::Generating | P::Validating | P::Splitting, E::Abandon) => Ok(P::Failed),
            _ => Err(PackError::InvalidState("illegal lesson phase transition")),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LessonPhase::Committed | LessonPhase::Failed)
    }
}

/// Mutable per-lesson bookkeeping. Owned by exactly one assembler run.
#[derive(Debug)]
pub struct LessonTracker {
    lesson_id: String,
    phase: LessonPhase,
    attempts: u32,
    slides: Vec<Slide>,
    parts_over_capacity: u32,
    error: Option<String>,
}

impl LessonTracker {
    pub fn new(lesson_id: &str) -> Self {
        Self {
            lesson_id: lesson_id.to_string(),
            phase: LessonPhase::Pending,
            attempts: 0,
            slides: Vec::new(),
            parts_over_capacity: 0,
            error: None,
        }
    }

    pub fn phase(&self) -> LessonPhase {
        self.phase
    }

    pub fn advance(&mut self, event: LessonEvent) -> Result<(), PackError> {
        self.phase = self.phase.advance(event)?;
        Ok(())
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn commit(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    pub fn commit_split(&mut self, outcome: SplitOutcome) {
        self.parts_over_capacity += outcome.parts_over_capacity;
        self.slides.extend(outcome.slides);
    }

    /// Stops the lesson early, keeping everything committed so far.
    pub fn abandon(&mut self, reason: String) {
        self.phase = self.phase.advance(LessonEvent::Abandon).unwrap_or(LessonPhase::Failed);
        self.error = Some(reason);
    }

    /// Final status: complete only if the lesson reached `Committed`.
    pub fn status(&self) -> LessonStatus {
        match self.phase {
            LessonPhase::Committed => LessonStatus::Complete,
            _ if self.slides.is_empty() => LessonStatus::Failed,
            _ => LessonStatus::Degraded,
        }
    }

    pub fn into_result(self) -> LessonResult {
        let status = self.status();
        LessonResult {
            lesson_id: self.lesson_id,
            slides: self.slides,
            status,
            attempts: self.attempts,
            parts_over_capacity: self.parts_over_capacity,
            error: self.error,
        }
    }
}

/// Why a lesson stopped before all fragments were packed.
#[derive(Debug, Error)]
enum Stop {
    #[error("{0}")]
    Terminal(OracleError),

    #[error("oracle failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: OracleError },

    #[error("lesson time budget of {0:?} exhausted")]
    BudgetExhausted(Duration),

    #[error(transparent)]
    Pack(#[from] PackError),
}

// ────────────────────────────────────────────────────────────────────────────
// Assembler
// ────────────────────────────────────────────────────────────────────────────

pub struct SectionAssembler {
    oracle: Arc<dyn Oracle>,
    metrics: LayoutMetrics,
    settings: AssemblerSettings,
}

impl SectionAssembler {
    pub fn new(oracle: Arc<dyn Oracle>, metrics: LayoutMetrics, settings: AssemblerSettings) -> Self {
        Self {
            oracle,
            metrics,
            settings,
        }
    }

    /// Generates and packs all slides for `lesson`.
    ///
    /// Never returns an error: retries exhausted, terminal oracle errors and an
    /// exhausted time budget end the lesson early as `Degraded` or `Failed`.
    pub async fn assemble(&self, lesson: &LessonDescriptor) -> LessonResult {
        let deadline = Instant::now() + self.settings.lesson_budget;
        let mut tracker = LessonTracker::new(&lesson.lesson_id);
        let mut builder = SlideBuilder::new(self.metrics);

        info!(
            lesson_id = %lesson.lesson_id,
            segments = lesson.segments.len(),
            mode = ?self.settings.mode,
            "Assembling lesson"
        );

        let outcome = match self.settings.mode {
            GenerationMode::Incremental => {
                self.run_incremental(lesson, &mut tracker, &mut builder, deadline)
                    .await
            }
            GenerationMode::WholeSlide => self.run_whole_slide(lesson, &mut tracker, deadline).await,
        };

        match outcome.and_then(|()| tracker.advance(LessonEvent::Finish).map_err(Stop::from)) {
            Ok(()) => {}
            Err(stop) => {
                // Keep whatever is already on the open slide.
                if builder.is_open() {
                    match builder.finish() {
                        Ok(slide) if !slide.blocks.is_empty() => tracker.commit(slide),
                        Ok(_) => {}
                        Err(e) => warn!(lesson_id = %lesson.lesson_id, "Could not flush open slide: {e}"),
                    }
                }
                tracker.abandon(stop.to_string());
            }
        }

        let result = tracker.into_result();
        match result.status {
            LessonStatus::Complete => info!(
                lesson_id = %result.lesson_id,
                slides = result.slides.len(),
                attempts = result.attempts,
                "Lesson complete"
            ),
            status => warn!(
                lesson_id = %result.lesson_id,
                ?status,
                slides = result.slides.len(),
                attempts = result.attempts,
                error = result.error.as_deref().unwrap_or(""),
                "Lesson stopped early"
            ),
        }
        result
    }

    async fn run_incremental(
        &self,
        lesson: &LessonDescriptor,
        tracker: &mut LessonTracker,
        builder: &mut SlideBuilder,
        deadline: Instant,
    ) -> Result<(), Stop> {
        tracker.advance(LessonEvent::Begin)?;
        let constraints = ProposalConstraints::incremental(&self.metrics);
        let chunk = self.settings.points_per_increment.max(1);

        for segment in &lesson.segments {
            if segment.points.is_empty() {
                debug!(lesson_id = %lesson.lesson_id, heading = %segment.heading, "Skipping empty segment");
                continue;
            }

            let total = segment.points.chunks(chunk).count();
            let subtitle = segment.subheading.as_deref();
            let mut part = 1u32;
            builder.start_part(&segment.heading, subtitle, part)?;

            for (i, points) in segment.points.chunks(chunk).enumerate() {
                let fragment = make_fragment(lesson, segment, points, i + 1, total);
                let blocks = self
                    .propose_with_retry(&fragment, &constraints, tracker, deadline)
                    .await?;

                for block in blocks {
                    match builder.add(block)? {
                        Admission::Added => {}
                        Admission::Full(block) if builder.is_empty() => builder.place_atomic(block)?,
                        Admission::Full(block) => {
                            tracker.commit(builder.finish()?);
                            part += 1;
                            builder.start_part(&segment.heading, subtitle, part)?;
                            if let Admission::Full(block) = builder.add(block)? {
                                builder.place_atomic(block)?;
                            }
                        }
                    }
                }
                tracker.advance(LessonEvent::Packed)?;
            }

            let slide = builder.finish()?;
            if !slide.blocks.is_empty() {
                tracker.commit(slide);
            }
        }
        Ok(())
    }

    async fn run_whole_slide(
        &self,
        lesson: &LessonDescriptor,
        tracker: &mut LessonTracker,
        deadline: Instant,
    ) -> Result<(), Stop> {
        tracker.advance(LessonEvent::Begin)?;

        for segment in &lesson.segments {
            if segment.points.is_empty() {
                debug!(lesson_id = %lesson.lesson_id, heading = %segment.heading, "Skipping empty segment");
                continue;
            }

            let subtitle = segment.subheading.as_deref();
            let constraints = ProposalConstraints::whole_slide(&self.metrics, subtitle.is_some());
            let fragment = make_fragment(lesson, segment, &segment.points, 1, 1);
            let blocks = self
                .propose_with_retry(&fragment, &constraints, tracker, deadline)
                .await?;

            if classify(&self.metrics, &blocks, subtitle.is_some()) == Fit::Overflow {
                tracker.advance(LessonEvent::NeedsSplit)?;
            }
            let outcome = split(&self.metrics, &segment.heading, subtitle, blocks)?;
            tracker.commit_split(outcome);
            tracker.advance(LessonEvent::Packed)?;
        }
        Ok(())
    }

    /// Calls the oracle until it returns a valid proposal, retrying transient
    /// failures with exponential backoff inside the lesson's time budget.
    async fn propose_with_retry(
        &self,
        fragment: &LessonFragment,
        constraints: &ProposalConstraints,
        tracker: &mut LessonTracker,
        deadline: Instant,
    ) -> Result<Vec<ContentBlock>, Stop> {
        let mut attempt = 0u32;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Stop::BudgetExhausted(self.settings.lesson_budget));
            }
            let call_budget = self.settings.call_timeout.min(remaining);
            let budget_bound = call_budget < self.settings.call_timeout;

            attempt += 1;
            tracker.record_attempt();

            let result =
                match tokio::time::timeout(call_budget, self.oracle.propose(fragment, constraints)).await {
                    Ok(result) => result,
                    Err(_) if budget_bound => {
                        return Err(Stop::BudgetExhausted(self.settings.lesson_budget));
                    }
                    Err(_) => Err(OracleError::Timeout),
                };

            let error = match result {
                Ok(blocks) => {
                    tracker.advance(LessonEvent::ProposalReceived)?;
                    match self.validate(blocks) {
                        Ok(blocks) => return Ok(blocks),
                        Err(e) => {
                            tracker.advance(LessonEvent::Rejected)?;
                            e
                        }
                    }
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                return Err(Stop::Terminal(error));
            }
            if attempt >= self.settings.max_attempts {
                return Err(Stop::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self.settings.backoff_for(attempt);
            warn!(
                lesson_id = %fragment.lesson_id,
                heading = %fragment.heading,
                attempt,
                max_attempts = self.settings.max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Oracle call failed ({error}), retrying"
            );
            if Instant::now() + delay >= deadline {
                return Err(Stop::BudgetExhausted(self.settings.lesson_budget));
            }
            tokio::time::sleep(delay).await;
            tracker.advance(LessonEvent::Retry)?;
        }
    }

    /// Re-checks a parsed proposal against the layout: it must contain blocks and
    /// every block must fit by itself on a slide without a subtitle, the largest
    /// capacity any part can have.
    fn validate(&self, blocks: Vec<ContentBlock>) -> Result<Vec<ContentBlock>, OracleError> {
        if blocks.is_empty() {
            return Err(OracleError::Malformed("proposal contains no blocks".to_string()));
        }
        let limit = self.metrics.capacity(false);
        if let Some((i, height)) = blocks
            .iter()
            .map(|b| self.metrics.estimate(b))
            .enumerate()
            .find(|(_, height)| *height > limit)
        {
            return Err(OracleError::Malformed(format!(
                "block {i} estimated at {height}px exceeds slide capacity of {limit}px"
            )));
        }
        Ok(blocks)
    }
}

fn make_fragment(
    lesson: &LessonDescriptor,
    segment: &LessonSegment,
    points: &[String],
    increment: usize,
    total_increments: usize,
) -> LessonFragment {
    LessonFragment {
        lesson_id: lesson.lesson_id.clone(),
        lesson_title: lesson.title.clone(),
        heading: segment.heading.clone(),
        points: points.to_vec(),
        increment,
        total_increments,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
