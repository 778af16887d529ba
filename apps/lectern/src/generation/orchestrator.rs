//! Course Orchestrator — fans the section assembler out over every lesson of a course.
//!
//! Lessons run as independent tokio tasks, at most `max_concurrent_lessons` at a
//! time (a semaphore permit per in-flight lesson; the rest queue). Each task
//! returns its lesson index with the result, and the merge writes it into that
//! index's slot. Slides are flattened only once every slot is filled, so the
//! deck follows input order whatever order lessons finish in. A task that panics
//! is matched back to its slot by task id and reported as a failed lesson.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::assembler::{AssemblerSettings, SectionAssembler};
use crate::generation::oracle::Oracle;
use crate::layout::metrics::LayoutMetrics;
use crate::models::course::{
    CourseResult, LessonDescriptor, LessonResult, LessonStatus, LessonSummary,
};
use crate::models::slide::Density;

pub struct CourseOrchestrator {
    assembler: Arc<SectionAssembler>,
    max_concurrent_lessons: usize,
}

impl CourseOrchestrator {
    pub fn new(
        oracle: Arc<dyn Oracle>,
        metrics: LayoutMetrics,
        settings: AssemblerSettings,
        max_concurrent_lessons: usize,
    ) -> Self {
        Self {
            assembler: Arc::new(SectionAssembler::new(oracle, metrics, settings)),
            max_concurrent_lessons: max_concurrent_lessons.max(1),
        }
    }

    /// Assembles every lesson and merges the results in input order.
    ///
    /// Lesson failures, panics included, are reported in the result, never as an
    /// error. Errors are reserved for bad input (duplicate lesson ids) and
    /// bookkeeping failures of the merge itself.
    pub async fn run(&self, lessons: Vec<LessonDescriptor>) -> Result<CourseResult, AppError> {
        ensure_unique_ids(&lessons)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            %run_id,
            lessons = lessons.len(),
            max_concurrent = self.max_concurrent_lessons,
            "Starting course assembly"
        );

        let permits = Arc::new(Semaphore::new(self.max_concurrent_lessons));
        let mut tasks: JoinSet<(usize, LessonResult)> = JoinSet::new();
        let mut task_lessons: HashMap<Id, (usize, String)> = HashMap::new();

        for (index, lesson) in lessons.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let assembler = Arc::clone(&self.assembler);
            let lesson_id = lesson.lesson_id.clone();
            let span = info_span!("lesson", lesson_id = %lesson.lesson_id, index);
            let handle = tasks.spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return (index, scheduling_failure(&lesson));
                    };
                    (index, assembler.assemble(&lesson).await)
                }
                .instrument(span),
            );
            task_lessons.insert(handle.id(), (index, lesson_id));
        }

        let mut slots: Vec<Option<LessonResult>> = Vec::new();
        slots.resize_with(tasks.len(), || None);

        while let Some(joined) = tasks.join_next_with_id().await {
            let (index, result) = match joined {
                Ok((_, finished)) => finished,
                Err(e) => {
                    let (index, lesson_id) = task_lessons.get(&e.id()).ok_or_else(|| {
                        AppError::Orchestration(format!("unknown lesson task {}", e.id()))
                    })?;
                    (*index, task_failure(lesson_id, &e))
                }
            };
            let slot = slots.get_mut(index).ok_or_else(|| {
                AppError::Orchestration(format!("lesson index {index} out of range"))
            })?;
            *slot = Some(result);
        }

        let results = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    AppError::Orchestration(format!("lesson {index} produced no result"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let course = merge(run_id, started_at, results);
        info!(
            %run_id,
            slides = course.slides.len(),
            failed = course
                .lesson_statuses
                .values()
                .filter(|s| **s == LessonStatus::Failed)
                .count(),
            degraded = course
                .lesson_statuses
                .values()
                .filter(|s| **s == LessonStatus::Degraded)
                .count(),
            "Course assembly finished"
        );
        Ok(course)
    }
}

fn ensure_unique_ids(lessons: &[LessonDescriptor]) -> Result<(), AppError> {
    let mut seen = HashSet::new();
    for lesson in lessons {
        if !seen.insert(lesson.lesson_id.as_str()) {
            return Err(AppError::Validation(format!(
                "duplicate lesson id '{}'",
                lesson.lesson_id
            )));
        }
    }
    Ok(())
}

fn scheduling_failure(lesson: &LessonDescriptor) -> LessonResult {
    warn!(lesson_id = %lesson.lesson_id, "Lesson could not be scheduled");
    failed_lesson(&lesson.lesson_id, "scheduler closed before the lesson started")
}

/// Result for a lesson whose task panicked or was cancelled. Slides committed
/// inside the task are lost with it.
fn task_failure(lesson_id: &str, err: &JoinError) -> LessonResult {
    warn!(lesson_id, "Lesson task did not complete: {err}");
    failed_lesson(lesson_id, &format!("lesson task did not complete: {err}"))
}

fn failed_lesson(lesson_id: &str, reason: &str) -> LessonResult {
    LessonResult {
        lesson_id: lesson_id.to_string(),
        slides: Vec::new(),
        status: LessonStatus::Failed,
        attempts: 0,
        parts_over_capacity: 0,
        error: Some(reason.to_string()),
    }
}

/// Flattens per-lesson results (already in lesson order) into the course result.
fn merge(
    run_id: Uuid,
    started_at: chrono::DateTime<Utc>,
    results: Vec<LessonResult>,
) -> CourseResult {
    let mut slides = Vec::new();
    let mut lesson_statuses = HashMap::with_capacity(results.len());
    let mut lessons = Vec::with_capacity(results.len());
    let mut overflow_count = 0;

    for result in results {
        overflow_count += result.parts_over_capacity;
        lesson_statuses.insert(result.lesson_id.clone(), result.status);
        lessons.push(LessonSummary {
            lesson_id: result.lesson_id.clone(),
            status: result.status,
            attempts: result.attempts,
            slide_count: result.slides.len(),
            dense_slide_count: result
                .slides
                .iter()
                .filter(|s| s.density == Density::Dense)
                .count(),
            warnings: result.warnings().cloned().collect(),
            error: result.error,
        });
        slides.extend(result.slides);
    }

    if overflow_count > 0 {
        warn!(overflow_count, "Deck contains slides over capacity");
    }

    CourseResult {
        run_id,
        started_at,
        finished_at: Utc::now(),
        slides,
        overflow_count,
        lesson_statuses,
        lessons,
    }
}
