use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use mentor_core::Clock;
use mentor_core::model::{Checkpoint, CourseId, Doubt, Mcq, QuizContent, SubtopicContent, UserId};
use mentor_core::session::{
    CompanionCue, Effect, Phase, PhaseToken, RemediationPlan, SessionEngine,
};
use storage::repository::Storage;

use crate::checkpoint::CheckpointDebouncer;
use crate::error::{MaterializeError, SessionLoopError};
use crate::generation::GenerationService;
use crate::materialize::MaterializeService;

/// What the caller shows the learner after an answer. `remediation` is the
/// resolved text: the question's authored explanation, generated guidance,
/// or nothing for a correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub cue: CompanionCue,
    pub remediation: Option<String>,
    pub auto_advance_after: Duration,
    pub token: PhaseToken,
}

/// One learner's live session: the engine plus the transient service state
/// around it. Dropped when the learner leaves; call
/// `SessionLoopService::end_session` first to flush the checkpoint.
pub struct LearningSession {
    course_id: CourseId,
    engine: SessionEngine,
    debouncer: CheckpointDebouncer,
    loading_content: bool,
    loading_quiz: bool,
    request_seq: u64,
    doubts: Vec<Doubt>,
}

impl std::fmt::Debug for LearningSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningSession")
            .field("course_id", &self.course_id)
            .field("engine", &self.engine)
            .field("loading_content", &self.loading_content)
            .field("loading_quiz", &self.loading_quiz)
            .field("request_seq", &self.request_seq)
            .field("doubts", &self.doubts)
            .finish_non_exhaustive()
    }
}

impl LearningSession {
    #[must_use]
    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.engine.is_complete()
    }

    #[must_use]
    pub fn doubts(&self) -> &[Doubt] {
        &self.doubts
    }

    /// Read-only snapshot for rendering.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.engine.phase(),
            cue: self.engine.cue(),
            topic_name: self.engine.current_topic().name().to_string(),
            subtopic_name: self.engine.current_subtopic().name().to_string(),
            explanation: self.engine.current_explanation().map(str::to_owned),
            practice_question: self.engine.current_question().cloned(),
            quiz_question: self.engine.current_mcq().cloned(),
            progress_percent: self.engine.progress_percent(),
            loading_content: self.loading_content,
            loading_quiz: self.loading_quiz,
        }
    }

    fn begin_content_request(&mut self) -> MaterializeTicket {
        self.request_seq += 1;
        self.loading_content = true;
        MaterializeTicket(self.request_seq)
    }

    /// Lands a content materialization result. A result whose ticket is no
    /// longer current belongs to a superseded request and is discarded; the
    /// current request clears the loading flag when it lands.
    fn complete_content_request(
        &mut self,
        ticket: MaterializeTicket,
        topic_index: usize,
        subtopic_index: usize,
        result: Result<SubtopicContent, MaterializeError>,
    ) {
        if ticket.0 != self.request_seq {
            return;
        }
        self.loading_content = false;
        match result {
            Ok(content) => {
                if let Err(error) = self
                    .engine
                    .apply_subtopic_content(topic_index, subtopic_index, content)
                {
                    warn!(%error, topic_index, subtopic_index, "could not apply subtopic content");
                }
            }
            Err(error) => {
                warn!(%error, topic_index, subtopic_index, "content materialization failed");
            }
        }
    }

    fn begin_quiz_request(&mut self) -> MaterializeTicket {
        self.request_seq += 1;
        self.loading_quiz = true;
        MaterializeTicket(self.request_seq)
    }

    fn complete_quiz_request(
        &mut self,
        ticket: MaterializeTicket,
        topic_index: usize,
        result: Result<QuizContent, MaterializeError>,
    ) {
        if ticket.0 != self.request_seq {
            return;
        }
        self.loading_quiz = false;
        match result {
            Ok(quiz) => {
                if let Err(error) = self.engine.apply_topic_quiz(topic_index, quiz) {
                    warn!(%error, topic_index, "could not apply topic quiz");
                }
            }
            Err(error) => {
                warn!(%error, topic_index, "quiz materialization failed");
            }
        }
    }
}

/// Identifies one in-flight materialization request. Only the ticket issued
/// last is current; earlier tickets land as no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MaterializeTicket(u64);

/// Immutable render-ready snapshot of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub phase: Phase,
    pub cue: CompanionCue,
    pub topic_name: String,
    pub subtopic_name: String,
    pub explanation: Option<String>,
    pub practice_question: Option<Mcq>,
    pub quiz_question: Option<Mcq>,
    pub progress_percent: f64,
    pub loading_content: bool,
    pub loading_quiz: bool,
}

/// Drives one learner's sessions: loads the course, resumes from the stored
/// checkpoint, and interprets the engine's effects (materialization,
/// debounced checkpointing). Materialization and remediation failures are
/// logged and the session moves on.
#[derive(Clone)]
pub struct SessionLoopService {
    user_id: UserId,
    storage: Storage,
    generator: Arc<dyn GenerationService>,
    materializer: MaterializeService,
    clock: Clock,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        user_id: UserId,
        storage: Storage,
        generator: Arc<dyn GenerationService>,
        clock: Clock,
    ) -> Self {
        let materializer = MaterializeService::new(generator.clone(), storage.clone());
        Self {
            user_id,
            storage,
            generator,
            materializer,
            clock,
        }
    }

    /// Starts (or resumes) a session for the given course and dispatches the
    /// initial materialization if the starting subtopic has no content.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` if the course does not exist or the
    /// checkpoint cannot be read.
    pub async fn start_session(
        &self,
        course_id: CourseId,
    ) -> Result<LearningSession, SessionLoopError> {
        let course = self
            .storage
            .courses
            .get_course(course_id)
            .await?
            .ok_or(SessionLoopError::CourseNotFound(course_id))?;
        let checkpoint = self
            .storage
            .progress
            .get_checkpoint(self.user_id, course_id)
            .await?;

        let engine = match checkpoint {
            Some(checkpoint) => SessionEngine::resume(course, checkpoint),
            None => SessionEngine::new(course),
        };
        let debouncer = CheckpointDebouncer::new(
            self.storage.progress.clone(),
            self.user_id,
            course_id,
            self.clock,
        );

        let mut session = LearningSession {
            course_id,
            engine,
            debouncer,
            loading_content: false,
            loading_quiz: false,
            request_seq: 0,
            doubts: Vec::new(),
        };
        let effects = session.engine.initial_effects();
        self.apply_effects(&mut session, effects).await;
        Ok(session)
    }

    /// Flushes the pending checkpoint before the session object is dropped.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` if the final checkpoint write fails.
    pub async fn end_session(&self, session: &LearningSession) -> Result<(), SessionLoopError> {
        session.debouncer.flush().await?;
        Ok(())
    }

    /// Steps to the next explanation, or into practice after the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` for phase violations.
    pub async fn advance_explanation(
        &self,
        session: &mut LearningSession,
    ) -> Result<(), SessionLoopError> {
        let effects = session.engine.advance_explanation()?;
        self.apply_effects(session, effects).await;
        Ok(())
    }

    /// Submits a practice answer and resolves its remediation text.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` for phase violations, double submissions,
    /// or invalid choices.
    pub async fn submit_practice_answer(
        &self,
        session: &mut LearningSession,
        choice: usize,
    ) -> Result<AnswerOutcome, SessionLoopError> {
        let feedback = session.engine.submit_practice_answer(choice)?;
        Ok(self.resolve_feedback(feedback).await)
    }

    /// Submits a quiz answer and resolves its remediation text.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` for phase violations, double submissions,
    /// or invalid choices.
    pub async fn submit_quiz_answer(
        &self,
        session: &mut LearningSession,
        choice: usize,
    ) -> Result<AnswerOutcome, SessionLoopError> {
        let feedback = session.engine.submit_quiz_answer(choice)?;
        Ok(self.resolve_feedback(feedback).await)
    }

    /// Timer-driven advance after an answer. A stale token is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` for phase violations.
    pub async fn advance_after_answer(
        &self,
        session: &mut LearningSession,
        token: PhaseToken,
    ) -> Result<(), SessionLoopError> {
        let effects = session.engine.advance_after_answer(token)?;
        self.apply_effects(session, effects).await;
        Ok(())
    }

    /// Manual advance past an answered practice question.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` for phase violations.
    pub async fn advance_practice(
        &self,
        session: &mut LearningSession,
    ) -> Result<(), SessionLoopError> {
        let effects = session.engine.advance_practice()?;
        self.apply_effects(session, effects).await;
        Ok(())
    }

    /// Manual advance past an answered quiz question.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` for phase violations.
    pub async fn advance_quiz(
        &self,
        session: &mut LearningSession,
    ) -> Result<(), SessionLoopError> {
        let effects = session.engine.advance_quiz()?;
        self.apply_effects(session, effects).await;
        Ok(())
    }

    /// Asks a free-form doubt against the current subtopic's context and
    /// records it on the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionLoopError` when clarification generation fails.
    pub async fn ask_doubt(
        &self,
        session: &mut LearningSession,
        question: &str,
    ) -> Result<Doubt, SessionLoopError> {
        let subtopic = session.engine.current_subtopic();
        let mut context = vec![subtopic.description().to_string()];
        if let Some(content) = subtopic.content() {
            context.extend(content.explanations().iter().cloned());
        }

        let mut doubt = Doubt::new(question, context, self.clock.now());
        let answer = self
            .generator
            .clarify_doubt(doubt.question(), doubt.context())
            .await?;
        doubt.set_answer(answer);
        session.doubts.push(doubt.clone());
        Ok(doubt)
    }

    async fn resolve_feedback(
        &self,
        feedback: mentor_core::session::AnswerFeedback,
    ) -> AnswerOutcome {
        let remediation = match feedback.remediation {
            RemediationPlan::None => None,
            RemediationPlan::BuiltIn(text) => Some(text),
            RemediationPlan::Generate(prompt) => {
                match self.generator.remediate(&prompt).await {
                    Ok(text) => Some(text),
                    Err(error) => {
                        warn!(%error, "remediation generation failed, moving on");
                        None
                    }
                }
            }
        };
        AnswerOutcome {
            correct: feedback.correct,
            cue: feedback.cue,
            remediation,
            auto_advance_after: feedback.auto_advance_after,
            token: feedback.token,
        }
    }

    /// Interprets effects returned by an engine transition.
    ///
    /// Each materialization request carries a sequence number; by the time a
    /// result lands, a newer request may have superseded it, in which case
    /// the stale result is discarded instead of applied.
    async fn apply_effects(&self, session: &mut LearningSession, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SaveCheckpoint(checkpoint) => self.save_checkpoint(session, checkpoint),
                Effect::MaterializeContent {
                    topic_index,
                    subtopic_index,
                } => {
                    self.materialize_content(session, topic_index, subtopic_index)
                        .await;
                }
                Effect::MaterializeQuiz { topic_index } => {
                    self.materialize_quiz(session, topic_index).await;
                }
            }
        }
    }

    fn save_checkpoint(&self, session: &LearningSession, checkpoint: Checkpoint) {
        session.debouncer.record(checkpoint);
    }

    async fn materialize_content(
        &self,
        session: &mut LearningSession,
        topic_index: usize,
        subtopic_index: usize,
    ) {
        let ticket = session.begin_content_request();
        let result = self
            .materializer
            .materialize_subtopic_content(session.course_id, topic_index, subtopic_index)
            .await;
        session.complete_content_request(ticket, topic_index, subtopic_index, result);
    }

    async fn materialize_quiz(&self, session: &mut LearningSession, topic_index: usize) {
        let ticket = session.begin_quiz_request();
        let result = self
            .materializer
            .materialize_topic_quiz(session.course_id, topic_index)
            .await;
        session.complete_quiz_request(ticket, topic_index, result);
    }
}
