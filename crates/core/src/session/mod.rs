//! The session progression engine: a client-held state machine that walks a
//! learner through a course (explanations, practice questions, topic quiz)
//! and asks its caller to materialize content just before it is needed.

mod engine;

pub use engine::SessionEngine;

use std::time::Duration;
use thiserror::Error;

use crate::model::Checkpoint;

/// Fixed learner-reading delay before a practice answer auto-advances.
pub const PRACTICE_ADVANCE_DELAY: Duration = Duration::from_secs(3);

/// Delay before a quiz answer auto-advances. Longer than practice so a
/// remediation message can be read.
pub const QUIZ_ADVANCE_DELAY: Duration = Duration::from_secs(4);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session already completed")]
    Completed,

    #[error("operation not valid in phase {actual:?}")]
    WrongPhase { actual: Phase },

    #[error("answer already recorded for the current question")]
    AlreadyAnswered,

    #[error("no question is available to answer")]
    NoQuestion,

    #[error("choice index {choice} is out of range")]
    InvalidChoice { choice: usize },
}

/// Where the learner currently is within a subtopic/topic cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Explaining,
    Practicing,
    TopicQuiz,
    Complete,
}

/// Outward-facing companion signal derived from engine state and answer
/// outcomes. Theme assets that render it are out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanionCue {
    Explaining,
    Asking,
    Praising,
    Consoling,
}

/// Opaque marker for a phase/cursor generation. A timer scheduled against an
/// old token finds its advance is a no-op, so an auto-advance racing a manual
/// action cannot double-advance the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseToken(pub(crate) u64);

/// Side effects requested by a transition. The engine never performs I/O
/// itself; the caller interprets these. Failures never block progression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The subtopic the learner just entered has no generated content yet.
    MaterializeContent {
        topic_index: usize,
        subtopic_index: usize,
    },
    /// The topic quiz the learner just reached has not been generated yet.
    MaterializeQuiz { topic_index: usize },
    /// The resumption point moved; persist it (debounced by the caller).
    SaveCheckpoint(Checkpoint),
}

/// Everything needed to request generated remediation for a missed answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemediationPrompt {
    pub question: String,
    pub correct_text: String,
    pub chosen_text: String,
    pub context: Vec<String>,
}

/// What to show the learner after a wrong answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationPlan {
    /// Correct answer; nothing to remediate.
    None,
    /// The question carries an authored explanation; show it, never generate.
    BuiltIn(String),
    /// No authored explanation; the caller may request generated text.
    Generate(RemediationPrompt),
}

/// Result of submitting a practice or quiz answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub cue: CompanionCue,
    pub remediation: RemediationPlan,
    /// How long to wait before calling `advance_after_answer`.
    pub auto_advance_after: Duration,
    /// Token the auto-advance must present; stale tokens are ignored.
    pub token: PhaseToken,
}
