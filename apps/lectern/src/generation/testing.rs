//! Scripted oracles and fixtures shared by the assembler and orchestrator tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::OracleError;
use crate::generation::oracle::{LessonFragment, Oracle, ProposalConstraints};
use crate::models::course::{LessonDescriptor, LessonSegment};
use crate::models::slide::ContentBlock;

type Proposal = Result<Vec<ContentBlock>, OracleError>;

pub(crate) fn bullet_list(items: &[&str]) -> ContentBlock {
    ContentBlock::BulletList {
        heading: None,
        items: items.iter().map(|s| s.to_string()).collect(),
    }
}

/// Builds a lesson from `(heading, subheading, point_count)` triples.
pub(crate) fn lesson(id: &str, segments: &[(&str, Option<&str>, usize)]) -> LessonDescriptor {
    LessonDescriptor {
        lesson_id: id.to_string(),
        title: format!("Lesson {id}"),
        segments: segments
            .iter()
            .map(|(heading, subheading, count)| LessonSegment {
                heading: heading.to_string(),
                subheading: subheading.map(str::to_string),
                points: (0..*count).map(|i| format!("{id} {heading} point {i}")).collect(),
            })
            .collect(),
    }
}

/// Replays responses in order, then keeps repeating the last one.
pub(crate) struct ScriptedOracle {
    script: Mutex<VecDeque<Proposal>>,
    last: Mutex<Option<Proposal>>,
    calls: AtomicU32,
}

impl ScriptedOracle {
    pub(crate) fn new(script: Vec<Proposal>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn propose(
        &self,
        _fragment: &LessonFragment,
        _constraints: &ProposalConstraints,
    ) -> Result<Vec<ContentBlock>, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(proposal) => {
                *last = Some(proposal.clone());
                proposal
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(OracleError::Malformed("script exhausted".to_string()))),
        }
    }
}

/// Echoes each fragment's points back as one bullet list. Per-lesson delays,
/// failures, hangs and panics simulate an uneven oracle.
#[derive(Default)]
pub(crate) struct EchoOracle {
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    completed: Mutex<Vec<String>>,
}

impl EchoOracle {
    pub(crate) fn with_delay(mut self, lesson_id: &str, delay: Duration) -> Self {
        self.delays.insert(lesson_id.to_string(), delay);
        self
    }

    pub(crate) fn failing(mut self, lesson_id: &str) -> Self {
        self.failing.insert(lesson_id.to_string());
        self
    }

    pub(crate) fn hanging(mut self, lesson_id: &str) -> Self {
        self.hanging.insert(lesson_id.to_string());
        self
    }

    pub(crate) fn panicking(mut self, lesson_id: &str) -> Self {
        self.panicking.insert(lesson_id.to_string());
        self
    }

    /// Lesson ids in the order their proposals were answered.
    pub(crate) fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Oracle for EchoOracle {
    async fn propose(
        &self,
        fragment: &LessonFragment,
        _constraints: &ProposalConstraints,
    ) -> Result<Vec<ContentBlock>, OracleError> {
        if self.panicking.contains(&fragment.lesson_id) {
            panic!("oracle response handling failed for {}", fragment.lesson_id);
        }
        if self.hanging.contains(&fragment.lesson_id) {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delays.get(&fragment.lesson_id) {
            tokio::time::sleep(*delay).await;
        }
        self.completed
            .lock()
            .unwrap()
            .push(fragment.lesson_id.clone());
        if self.failing.contains(&fragment.lesson_id) {
            return Err(OracleError::Unavailable("scripted outage".to_string()));
        }
        Ok(vec![ContentBlock::BulletList {
            heading: None,
            items: fragment.points.clone(),
        }])
    }
}
