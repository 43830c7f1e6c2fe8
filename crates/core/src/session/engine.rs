use crate::model::{Checkpoint, Course, CourseError, Mcq, QuizContent, SubtopicContent, Subtopic, Topic};

use super::{
    AnswerFeedback, CompanionCue, Effect, Phase, PhaseToken, RemediationPlan, RemediationPrompt,
    SessionError, PRACTICE_ADVANCE_DELAY, QUIZ_ADVANCE_DELAY,
};

/// In-memory progression state for one learner walking one course.
///
/// Owns a copy of the course and all cursors; transitions mutate the engine
/// synchronously and return the side effects the caller should dispatch.
/// Destroyed when the learner exits or the session completes.
#[derive(Debug, Clone)]
pub struct SessionEngine {
    course: Course,
    topic_index: usize,
    subtopic_index: usize,
    explanation_index: usize,
    question_index: usize,
    mcq_index: usize,
    phase: Phase,
    selected_answer: Option<usize>,
    selected_quiz_answer: Option<usize>,
    token: u64,
}

impl SessionEngine {
    /// Starts a session at the beginning of the course.
    #[must_use]
    pub fn new(course: Course) -> Self {
        Self {
            course,
            topic_index: 0,
            subtopic_index: 0,
            explanation_index: 0,
            question_index: 0,
            mcq_index: 0,
            phase: Phase::Explaining,
            selected_answer: None,
            selected_quiz_answer: None,
            token: 0,
        }
    }

    /// Starts a session at a previously persisted checkpoint.
    ///
    /// Indices are clamped to the course shape, so a stale checkpoint never
    /// produces an out-of-range cursor.
    #[must_use]
    pub fn resume(course: Course, checkpoint: Checkpoint) -> Self {
        let topic_index = checkpoint.topic_index.min(course.topics().len() - 1);
        let subtopic_count = course.topics()[topic_index].subtopics().len();
        let subtopic_index = checkpoint.subtopic_index.min(subtopic_count - 1);
        let explanation_count = course.topics()[topic_index].subtopics()[subtopic_index]
            .content()
            .map_or(0, |c| c.explanations().len());
        let explanation_index = if explanation_count == 0 {
            0
        } else {
            checkpoint.position.min(explanation_count - 1)
        };

        let mut engine = Self::new(course);
        engine.topic_index = topic_index;
        engine.subtopic_index = subtopic_index;
        engine.explanation_index = explanation_index;
        engine
    }

    /// Effects that should be dispatched right after construction:
    /// materialization for the starting subtopic if it has no content yet.
    #[must_use]
    pub fn initial_effects(&self) -> Vec<Effect> {
        if self.current_subtopic().content_generated() {
            Vec::new()
        } else {
            vec![Effect::MaterializeContent {
                topic_index: self.topic_index,
                subtopic_index: self.subtopic_index,
            }]
        }
    }

    //
    // ─── ACCESSORS ─────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    #[must_use]
    pub fn token(&self) -> PhaseToken {
        PhaseToken(self.token)
    }

    #[must_use]
    pub fn topic_index(&self) -> usize {
        self.topic_index
    }

    #[must_use]
    pub fn subtopic_index(&self) -> usize {
        self.subtopic_index
    }

    #[must_use]
    pub fn explanation_index(&self) -> usize {
        self.explanation_index
    }

    #[must_use]
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    #[must_use]
    pub fn mcq_index(&self) -> usize {
        self.mcq_index
    }

    #[must_use]
    pub fn current_topic(&self) -> &Topic {
        &self.course.topics()[self.topic_index]
    }

    #[must_use]
    pub fn current_subtopic(&self) -> &Subtopic {
        &self.current_topic().subtopics()[self.subtopic_index]
    }

    #[must_use]
    pub fn current_explanation(&self) -> Option<&str> {
        self.current_subtopic()
            .content()
            .and_then(|c| c.explanations().get(self.explanation_index))
            .map(String::as_str)
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Mcq> {
        self.current_subtopic()
            .content()
            .and_then(|c| c.questions().get(self.question_index))
    }

    #[must_use]
    pub fn current_mcq(&self) -> Option<&Mcq> {
        self.current_topic()
            .quiz()
            .and_then(|q| q.mcqs().get(self.mcq_index))
    }

    /// Companion signal derived from the current phase. Transient
    /// praise/console signals ride on `AnswerFeedback` instead.
    #[must_use]
    pub fn cue(&self) -> CompanionCue {
        match self.phase {
            Phase::Explaining => CompanionCue::Explaining,
            Phase::Practicing | Phase::TopicQuiz => CompanionCue::Asking,
            Phase::Complete => CompanionCue::Praising,
        }
    }

    #[must_use]
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.topic_index, self.subtopic_index, self.explanation_index)
    }

    /// Coarse overall progress in percent, clamped to 100.
    ///
    /// Weighted by topic and subtopic position only; intentionally not linear
    /// in actual content consumed.
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        let total_topics = self.course.topics().len();
        let subtopics = self.current_topic().subtopics().len().max(1);
        #[allow(clippy::cast_precision_loss)]
        let percent = (self.topic_index as f64 * 100.0) / total_topics as f64
            + ((self.subtopic_index as f64 + 1.0) * 100.0)
                / (total_topics as f64 * subtopics as f64);
        percent.min(100.0)
    }

    fn total_explanations(&self) -> usize {
        self.current_subtopic()
            .content()
            .map_or(0, |c| c.explanations().len())
    }

    fn total_questions(&self) -> usize {
        self.current_subtopic()
            .content()
            .map_or(0, |c| c.questions().len())
    }

    fn total_mcqs(&self) -> usize {
        self.current_topic().quiz().map_or(0, QuizContent::len)
    }

    //
    // ─── TRANSITIONS ───────────────────────────────────────────────────────
    //

    /// Advances the explanation cursor, or moves into practice once the last
    /// explanation has been read.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside the `Explaining` phase.
    pub fn advance_explanation(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.require_phase(Phase::Explaining)?;

        if self.explanation_index + 1 < self.total_explanations() {
            self.explanation_index += 1;
            self.bump_token();
            Ok(vec![Effect::SaveCheckpoint(self.checkpoint())])
        } else {
            Ok(self.enter_practicing())
        }
    }

    /// Records and evaluates a practice answer.
    ///
    /// Does not advance; the caller schedules `advance_after_answer` with the
    /// returned token after the fixed reading delay.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside the `Practicing` phase, for a second
    /// submission on the same question, when no question is available, or for
    /// an out-of-range choice.
    pub fn submit_practice_answer(
        &mut self,
        choice: usize,
    ) -> Result<AnswerFeedback, SessionError> {
        self.require_phase(Phase::Practicing)?;
        if self.selected_answer.is_some() {
            return Err(SessionError::AlreadyAnswered);
        }

        let context = self.practice_context();
        let question = self.current_question().ok_or(SessionError::NoQuestion)?;
        if choice >= question.options().len() {
            return Err(SessionError::InvalidChoice { choice });
        }
        let feedback = Self::evaluate(
            question,
            choice,
            context,
            PRACTICE_ADVANCE_DELAY,
            self.token(),
        );

        self.selected_answer = Some(choice);
        Ok(feedback)
    }

    /// Moves to the next practice question, or into the topic quiz after the
    /// last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside the `Practicing` phase.
    pub fn advance_practice(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.require_phase(Phase::Practicing)?;

        if self.question_index + 1 < self.total_questions() {
            self.question_index += 1;
            self.selected_answer = None;
            self.bump_token();
            Ok(Vec::new())
        } else {
            Ok(self.enter_topic_quiz())
        }
    }

    /// Records and evaluates a quiz answer. Same contract as
    /// `submit_practice_answer`, with the longer quiz reading delay.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside the `TopicQuiz` phase, for a second
    /// submission, a missing MCQ, or an out-of-range choice.
    pub fn submit_quiz_answer(&mut self, choice: usize) -> Result<AnswerFeedback, SessionError> {
        self.require_phase(Phase::TopicQuiz)?;
        if self.selected_quiz_answer.is_some() {
            return Err(SessionError::AlreadyAnswered);
        }

        let context = self.quiz_context();
        let mcq = self.current_mcq().ok_or(SessionError::NoQuestion)?;
        if choice >= mcq.options().len() {
            return Err(SessionError::InvalidChoice { choice });
        }
        let feedback = Self::evaluate(mcq, choice, context, QUIZ_ADVANCE_DELAY, self.token());

        self.selected_quiz_answer = Some(choice);
        Ok(feedback)
    }

    /// Moves to the next quiz MCQ, or onward to the next subtopic/topic after
    /// the last one. With no quiz available (failed materialization) this
    /// moves on directly rather than blocking the session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside the `TopicQuiz` phase.
    pub fn advance_quiz(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.require_phase(Phase::TopicQuiz)?;

        if self.mcq_index + 1 < self.total_mcqs() {
            self.mcq_index += 1;
            self.selected_quiz_answer = None;
            self.bump_token();
            Ok(Vec::new())
        } else {
            Ok(self.advance_subtopic())
        }
    }

    /// Timer-driven advance scheduled after an answer submission.
    ///
    /// A stale token (the phase or cursor moved since the answer) makes this
    /// a no-op, so a late timer can never double-advance.
    ///
    /// # Errors
    ///
    /// Propagates phase errors from the underlying advance.
    pub fn advance_after_answer(&mut self, token: PhaseToken) -> Result<Vec<Effect>, SessionError> {
        if token != self.token() {
            return Ok(Vec::new());
        }
        match self.phase {
            Phase::Practicing => self.advance_practice(),
            Phase::TopicQuiz => self.advance_quiz(),
            _ => Ok(Vec::new()),
        }
    }

    //
    // ─── MATERIALIZED CONTENT ──────────────────────────────────────────────
    //

    /// Merges materialized subtopic content into the engine's course copy.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` on out-of-range indices or double generation.
    pub fn apply_subtopic_content(
        &mut self,
        topic_index: usize,
        subtopic_index: usize,
        content: SubtopicContent,
    ) -> Result<(), CourseError> {
        self.course
            .attach_subtopic_content(topic_index, subtopic_index, content)
    }

    /// Merges a materialized topic quiz into the engine's course copy.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` on an out-of-range index or double generation.
    pub fn apply_topic_quiz(
        &mut self,
        topic_index: usize,
        quiz: QuizContent,
    ) -> Result<(), CourseError> {
        self.course.attach_topic_quiz(topic_index, quiz)
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────
    //

    fn require_phase(&self, expected: Phase) -> Result<(), SessionError> {
        if self.phase == Phase::Complete {
            return Err(SessionError::Completed);
        }
        if self.phase != expected {
            return Err(SessionError::WrongPhase { actual: self.phase });
        }
        Ok(())
    }

    fn bump_token(&mut self) {
        self.token += 1;
    }

    fn evaluate(
        question: &Mcq,
        choice: usize,
        context: Vec<String>,
        delay: std::time::Duration,
        token: PhaseToken,
    ) -> AnswerFeedback {
        let correct = question.is_correct(choice);
        let remediation = if correct {
            RemediationPlan::None
        } else if let Some(explanation) = question.explanation() {
            RemediationPlan::BuiltIn(explanation.to_string())
        } else {
            RemediationPlan::Generate(RemediationPrompt {
                question: question.question().to_string(),
                correct_text: question.correct_option_text().to_string(),
                chosen_text: question
                    .option_text(choice)
                    .unwrap_or_default()
                    .to_string(),
                context,
            })
        };

        AnswerFeedback {
            correct,
            cue: if correct {
                CompanionCue::Praising
            } else {
                CompanionCue::Consoling
            },
            remediation,
            auto_advance_after: delay,
            token,
        }
    }

    /// Context passed to remediation for practice misses: the subtopic
    /// description followed by its explanations.
    fn practice_context(&self) -> Vec<String> {
        let subtopic = self.current_subtopic();
        let mut context = vec![subtopic.description().to_string()];
        if let Some(content) = subtopic.content() {
            context.extend(content.explanations().iter().cloned());
        }
        context
    }

    /// Context for quiz misses: the topic name plus every generated
    /// subtopic's explanations.
    fn quiz_context(&self) -> Vec<String> {
        let topic = self.current_topic();
        let mut context = vec![topic.name().to_string()];
        for subtopic in topic.subtopics() {
            if let Some(content) = subtopic.content() {
                context.extend(content.explanations().iter().cloned());
            }
        }
        context
    }

    fn enter_practicing(&mut self) -> Vec<Effect> {
        self.phase = Phase::Practicing;
        self.question_index = 0;
        self.selected_answer = None;
        self.bump_token();

        // Missing or question-less content falls straight through to the
        // quiz so a failed materialization never strands the learner.
        if self.total_questions() == 0 {
            self.enter_topic_quiz()
        } else {
            Vec::new()
        }
    }

    fn enter_topic_quiz(&mut self) -> Vec<Effect> {
        self.phase = Phase::TopicQuiz;
        self.mcq_index = 0;
        self.selected_quiz_answer = None;
        self.bump_token();

        if self.current_topic().quiz_generated() {
            Vec::new()
        } else {
            vec![Effect::MaterializeQuiz {
                topic_index: self.topic_index,
            }]
        }
    }

    fn advance_subtopic(&mut self) -> Vec<Effect> {
        if self.subtopic_index + 1 < self.current_topic().subtopics().len() {
            self.subtopic_index += 1;
            self.reset_cursors();
            self.enter_explaining()
        } else {
            self.advance_topic()
        }
    }

    fn advance_topic(&mut self) -> Vec<Effect> {
        if self.topic_index + 1 < self.course.topics().len() {
            self.topic_index += 1;
            self.subtopic_index = 0;
            self.reset_cursors();
            self.enter_explaining()
        } else {
            self.phase = Phase::Complete;
            self.bump_token();
            Vec::new()
        }
    }

    fn enter_explaining(&mut self) -> Vec<Effect> {
        self.phase = Phase::Explaining;
        self.bump_token();

        let mut effects = vec![Effect::SaveCheckpoint(self.checkpoint())];
        if !self.current_subtopic().content_generated() {
            effects.push(Effect::MaterializeContent {
                topic_index: self.topic_index,
                subtopic_index: self.subtopic_index,
            });
        }
        effects
    }

    fn reset_cursors(&mut self) {
        self.explanation_index = 0;
        self.question_index = 0;
        self.mcq_index = 0;
        self.selected_answer = None;
        self.selected_quiz_answer = None;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, UserId};
    use crate::time::fixed_now;

    fn mcq(correct: usize, explanation: Option<&str>) -> Mcq {
        Mcq::new(
            "Q",
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct,
            explanation.map(String::from),
        )
        .unwrap()
    }

    fn content(explanations: usize, questions: usize) -> SubtopicContent {
        SubtopicContent::new(
            (0..explanations).map(|i| format!("explanation {i}")).collect(),
            (0..questions).map(|_| mcq(0, None)).collect(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap()
    }

    fn quiz(mcqs: usize) -> QuizContent {
        QuizContent::new((0..mcqs).map(|_| mcq(1, None)).collect()).unwrap()
    }

    /// Course with every subtopic's content and every quiz pre-generated.
    fn materialized_course(topics: usize, subtopics: usize) -> Course {
        let topics: Vec<Topic> = (0..topics)
            .map(|t| {
                let subs: Vec<Subtopic> = (0..subtopics)
                    .map(|s| {
                        Subtopic::from_persisted(
                            format!("Subtopic {t}.{s}"),
                            "description",
                            None,
                            Some(content(3, 2)),
                            true,
                        )
                        .unwrap()
                    })
                    .collect();
                Topic::from_persisted(
                    format!("Topic {t}"),
                    "topic description",
                    None,
                    subs,
                    Some(quiz(2)),
                    true,
                )
                .unwrap()
            })
            .collect();
        Course::new(
            CourseId::new(1),
            "Course",
            None,
            None,
            None,
            None,
            Vec::new(),
            topics,
            UserId::new(1),
            fixed_now(),
        )
        .unwrap()
    }

    fn outline_course() -> Course {
        let topic = Topic::new(
            "Topic 0",
            "topic description",
            None,
            vec![Subtopic::new("Subtopic 0.0", "description", None).unwrap()],
        )
        .unwrap();
        Course::new(
            CourseId::new(1),
            "Course",
            None,
            None,
            None,
            None,
            Vec::new(),
            vec![topic],
            UserId::new(1),
            fixed_now(),
        )
        .unwrap()
    }

    fn drive_to_completion(engine: &mut SessionEngine) -> usize {
        let mut transitions = 0;
        while !engine.is_complete() {
            transitions += 1;
            assert!(transitions < 10_000, "engine did not terminate");
            match engine.phase() {
                Phase::Explaining => {
                    engine.advance_explanation().unwrap();
                }
                Phase::Practicing => {
                    engine.submit_practice_answer(0).unwrap();
                    let token = engine.token();
                    engine.advance_after_answer(token).unwrap();
                }
                Phase::TopicQuiz => {
                    engine.submit_quiz_answer(0).unwrap();
                    let token = engine.token();
                    engine.advance_after_answer(token).unwrap();
                }
                Phase::Complete => unreachable!(),
            }
        }
        transitions
    }

    #[test]
    fn initial_state_is_explaining_at_origin() {
        let engine = SessionEngine::new(materialized_course(2, 2));
        assert_eq!(engine.phase(), Phase::Explaining);
        assert_eq!(engine.checkpoint(), Checkpoint::start());
        assert!(engine.initial_effects().is_empty());
    }

    #[test]
    fn initial_effects_request_content_for_ungenerated_subtopic() {
        let engine = SessionEngine::new(outline_course());
        assert_eq!(
            engine.initial_effects(),
            vec![Effect::MaterializeContent {
                topic_index: 0,
                subtopic_index: 0
            }]
        );
    }

    #[test]
    fn full_walkthrough_reaches_complete_without_revisits() {
        let mut engine = SessionEngine::new(materialized_course(3, 2));
        let mut visited = Vec::new();
        let mut last_progress = 0.0;

        while !engine.is_complete() {
            if engine.phase() == Phase::Explaining && engine.explanation_index() == 0 {
                let position = (engine.topic_index(), engine.subtopic_index());
                if visited.last() != Some(&position) {
                    visited.push(position);
                }
            }
            let progress = engine.progress_percent();
            assert!(progress >= last_progress, "progress regressed");
            last_progress = progress;

            match engine.phase() {
                Phase::Explaining => {
                    engine.advance_explanation().unwrap();
                }
                Phase::Practicing => {
                    engine.submit_practice_answer(0).unwrap();
                    let token = engine.token();
                    engine.advance_after_answer(token).unwrap();
                }
                Phase::TopicQuiz => {
                    engine.submit_quiz_answer(0).unwrap();
                    let token = engine.token();
                    engine.advance_after_answer(token).unwrap();
                }
                Phase::Complete => unreachable!(),
            }
        }

        // Every subtopic visited exactly once, in order.
        let expected: Vec<(usize, usize)> =
            (0..3).flat_map(|t| (0..2).map(move |s| (t, s))).collect();
        assert_eq!(visited, expected);
        assert!((engine.progress_percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn completion_is_terminal() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));
        drive_to_completion(&mut engine);

        assert_eq!(engine.phase(), Phase::Complete);
        assert_eq!(engine.cue(), CompanionCue::Praising);
        assert_eq!(
            engine.advance_explanation().unwrap_err(),
            SessionError::Completed
        );
        assert_eq!(
            engine.submit_practice_answer(0).unwrap_err(),
            SessionError::Completed
        );
    }

    #[test]
    fn explanations_step_then_enter_practice() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));

        let fx = engine.advance_explanation().unwrap();
        assert_eq!(fx, vec![Effect::SaveCheckpoint(Checkpoint::new(0, 0, 1))]);
        engine.advance_explanation().unwrap();
        assert_eq!(engine.explanation_index(), 2);

        // Past the last explanation: into practice, question cursor reset.
        engine.advance_explanation().unwrap();
        assert_eq!(engine.phase(), Phase::Practicing);
        assert_eq!(engine.question_index(), 0);
        assert_eq!(engine.cue(), CompanionCue::Asking);
    }

    #[test]
    fn correct_answer_praises_without_remediation() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();

        let feedback = engine.submit_practice_answer(0).unwrap();
        assert!(feedback.correct);
        assert_eq!(feedback.cue, CompanionCue::Praising);
        assert_eq!(feedback.remediation, RemediationPlan::None);
        assert_eq!(feedback.auto_advance_after, PRACTICE_ADVANCE_DELAY);
    }

    #[test]
    fn wrong_answer_with_builtin_explanation_never_generates() {
        let sub = Subtopic::from_persisted(
            "S",
            "d",
            None,
            Some(
                SubtopicContent::new(
                    vec!["e".into()],
                    vec![mcq(1, Some("because B"))],
                    Vec::new(),
                    Vec::new(),
                )
                .unwrap(),
            ),
            true,
        )
        .unwrap();
        let topic =
            Topic::from_persisted("T", "d", None, vec![sub], Some(quiz(1)), true).unwrap();
        let course = Course::new(
            CourseId::new(1),
            "C",
            None,
            None,
            None,
            None,
            Vec::new(),
            vec![topic],
            UserId::new(1),
            fixed_now(),
        )
        .unwrap();

        let mut engine = SessionEngine::new(course);
        engine.advance_explanation().unwrap();

        let feedback = engine.submit_practice_answer(0).unwrap();
        assert!(!feedback.correct);
        assert_eq!(feedback.cue, CompanionCue::Consoling);
        assert_eq!(
            feedback.remediation,
            RemediationPlan::BuiltIn("because B".into())
        );
    }

    #[test]
    fn wrong_answer_without_explanation_requests_generation_with_context() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();

        let feedback = engine.submit_practice_answer(3).unwrap();
        assert!(!feedback.correct);
        let RemediationPlan::Generate(prompt) = feedback.remediation else {
            panic!("expected generated remediation");
        };
        assert_eq!(prompt.correct_text, "A");
        assert_eq!(prompt.chosen_text, "D");
        // Subtopic description first, then its explanations.
        assert_eq!(prompt.context[0], "description");
        assert_eq!(prompt.context.len(), 4);
    }

    #[test]
    fn double_answer_is_rejected_until_cursor_advances() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();

        engine.submit_practice_answer(0).unwrap();
        assert_eq!(
            engine.submit_practice_answer(1).unwrap_err(),
            SessionError::AlreadyAnswered
        );

        engine.advance_practice().unwrap();
        // Reset re-enables input for the next question.
        engine.submit_practice_answer(1).unwrap();
    }

    #[test]
    fn stale_auto_advance_token_is_a_no_op() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();

        let feedback = engine.submit_practice_answer(0).unwrap();
        // Manual advance fires before the timer.
        engine.advance_practice().unwrap();
        assert_eq!(engine.question_index(), 1);

        // The timer's token is now stale; nothing moves.
        engine.advance_after_answer(feedback.token).unwrap();
        assert_eq!(engine.question_index(), 1);
        assert_eq!(engine.phase(), Phase::Practicing);
    }

    #[test]
    fn entering_quiz_requests_materialization_once() {
        let sub = Subtopic::from_persisted("S", "d", None, Some(content(1, 1)), true).unwrap();
        let topic = Topic::new("T", "d", None, vec![sub]).unwrap();
        let course = Course::new(
            CourseId::new(1),
            "C",
            None,
            None,
            None,
            None,
            Vec::new(),
            vec![topic],
            UserId::new(1),
            fixed_now(),
        )
        .unwrap();
        let mut engine = SessionEngine::new(course);

        engine.advance_explanation().unwrap();
        engine.submit_practice_answer(0).unwrap();
        let fx = engine.advance_practice().unwrap();
        assert_eq!(fx, vec![Effect::MaterializeQuiz { topic_index: 0 }]);
        assert_eq!(engine.phase(), Phase::TopicQuiz);
    }

    #[test]
    fn quiz_unavailable_moves_on_instead_of_blocking() {
        // Quiz never materialized: advancing past the (empty) quiz completes
        // the single-topic course.
        let sub = Subtopic::from_persisted("S", "d", None, Some(content(1, 0)), true).unwrap();
        let topic = Topic::new("T", "d", None, vec![sub]).unwrap();
        let course = Course::new(
            CourseId::new(1),
            "C",
            None,
            None,
            None,
            None,
            Vec::new(),
            vec![topic],
            UserId::new(1),
            fixed_now(),
        )
        .unwrap();
        let mut engine = SessionEngine::new(course);

        // No questions either, so practice falls through into the quiz.
        let fx = engine.advance_explanation().unwrap();
        assert_eq!(engine.phase(), Phase::TopicQuiz);
        assert_eq!(fx, vec![Effect::MaterializeQuiz { topic_index: 0 }]);

        engine.advance_quiz().unwrap();
        assert!(engine.is_complete());
    }

    #[test]
    fn moving_to_next_subtopic_resets_cursors_and_checkpoints() {
        let mut engine = SessionEngine::new(materialized_course(1, 2));
        // Walk subtopic 0 to the end of its quiz... but the quiz belongs to
        // the topic; a 2-subtopic topic reaches the quiz after each subtopic's
        // practice per the progression order.
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();
        engine.submit_practice_answer(0).unwrap();
        engine.advance_practice().unwrap();
        engine.submit_practice_answer(0).unwrap();
        engine.advance_practice().unwrap();
        assert_eq!(engine.phase(), Phase::TopicQuiz);

        engine.submit_quiz_answer(0).unwrap();
        engine.advance_quiz().unwrap();
        engine.submit_quiz_answer(0).unwrap();
        let fx = engine.advance_quiz().unwrap();

        assert_eq!(engine.phase(), Phase::Explaining);
        assert_eq!(engine.subtopic_index(), 1);
        assert_eq!(engine.explanation_index(), 0);
        assert!(fx.contains(&Effect::SaveCheckpoint(Checkpoint::new(0, 1, 0))));
    }

    #[test]
    fn resume_clamps_stale_checkpoint() {
        let course = materialized_course(2, 2);
        let engine = SessionEngine::resume(course, Checkpoint::new(9, 9, 9));
        assert_eq!(engine.topic_index(), 1);
        assert_eq!(engine.subtopic_index(), 1);
        assert_eq!(engine.explanation_index(), 2);
    }

    #[test]
    fn progress_formula_matches_source_weighting() {
        let mut engine = SessionEngine::new(materialized_course(2, 2));
        // topic 0, subtopic 0 of 2, 2 topics: 0 + (1 * 100) / (2 * 2) = 25.
        assert!((engine.progress_percent() - 25.0).abs() < 1e-9);

        drive_to_completion(&mut engine);
        assert!((engine.progress_percent() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn submitting_in_wrong_phase_is_rejected() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));
        assert_eq!(
            engine.submit_practice_answer(0).unwrap_err(),
            SessionError::WrongPhase {
                actual: Phase::Explaining
            }
        );
        assert_eq!(
            engine.advance_quiz().unwrap_err(),
            SessionError::WrongPhase {
                actual: Phase::Explaining
            }
        );
    }

    #[test]
    fn out_of_range_choice_is_rejected_and_not_recorded() {
        let mut engine = SessionEngine::new(materialized_course(1, 1));
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();
        engine.advance_explanation().unwrap();

        assert_eq!(
            engine.submit_practice_answer(4).unwrap_err(),
            SessionError::InvalidChoice { choice: 4 }
        );
        // The failed submission did not consume the question.
        engine.submit_practice_answer(0).unwrap();
    }
}
