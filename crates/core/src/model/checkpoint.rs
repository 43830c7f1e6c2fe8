use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted resumption point for a learner in a course.
///
/// `position` is the explanation index reached in the current subtopic. One
/// checkpoint exists per `(user, course)` pair; it is upserted, never
/// multiplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub topic_index: usize,
    pub subtopic_index: usize,
    pub position: usize,
}

impl Checkpoint {
    #[must_use]
    pub fn new(topic_index: usize, subtopic_index: usize, position: usize) -> Self {
        Self {
            topic_index,
            subtopic_index,
            position,
        }
    }

    /// Checkpoint at the start of a course.
    #[must_use]
    pub fn start() -> Self {
        Self::new(0, 0, 0)
    }
}

/// A learner's question raised mid-session, with the context it was asked in
/// and the generated answer once available. Session-local; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doubt {
    id: Uuid,
    question: String,
    context: Vec<String>,
    answer: Option<String>,
    asked_at: DateTime<Utc>,
}

impl Doubt {
    #[must_use]
    pub fn new(question: impl Into<String>, context: Vec<String>, asked_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            question: question.into(),
            context,
            answer: None,
            asked_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn context(&self) -> &[String] {
        &self.context
    }

    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        self.answer.as_deref()
    }

    #[must_use]
    pub fn asked_at(&self) -> DateTime<Utc> {
        self.asked_at
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.answer = Some(answer.into());
    }
}
