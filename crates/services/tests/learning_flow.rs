use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use mentor_core::model::{
    Checkpoint, Course, CourseError, CourseId, Difficulty, Mcq, QuizContent, Subtopic,
    SubtopicContent, Topic, UserId,
};
use mentor_core::session::{CompanionCue, Phase};
use mentor_core::time::{fixed_clock, fixed_now};
use services::error::{GenerationError, MaterializeError};
use services::generation::{
    GenerationService, OutlineRequest, SubtopicContentRequest, TopicQuizRequest,
};
use services::{CourseService, LearningSession, MaterializeService, SessionLoopService};
use storage::repository::Storage;

use mentor_core::model::CourseOutline;
use mentor_core::session::RemediationPrompt;

//
// ─── FAKE GENERATOR ────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct FakeGenerator {
    content_calls: AtomicUsize,
    quiz_calls: AtomicUsize,
    remediation_calls: AtomicUsize,
    /// Number of upcoming content calls that should fail.
    fail_content_times: AtomicUsize,
    /// Number of upcoming remediation calls that should fail.
    fail_remediations: AtomicUsize,
}

fn fake_mcq(correct: usize, explanation: Option<&str>) -> Mcq {
    Mcq::new(
        "Which option is right?",
        vec!["A".into(), "B".into(), "C".into(), "D".into()],
        correct,
        explanation.map(String::from),
    )
    .unwrap()
}

#[async_trait]
impl GenerationService for FakeGenerator {
    async fn outline(&self, request: &OutlineRequest) -> Result<CourseOutline, GenerationError> {
        let subtopics = vec![
            Subtopic::new("Getting started", "First steps", Some("30 minutes".into())).unwrap(),
            Subtopic::new("Going deeper", "More detail", None).unwrap(),
        ];
        let topic = Topic::new(
            format!("{} fundamentals", request.topic),
            "The fundamentals",
            Some("2 hours".into()),
            subtopics,
        )
        .unwrap();
        CourseOutline::new(
            format!("Learn {}", request.topic),
            Some("A generated course".into()),
            Some("4-6 hours".into()),
            Some(request.level),
            vec!["generated".into()],
            vec![topic],
        )
        .map_err(|e| GenerationError::Malformed(e.to_string()))
    }

    async fn subtopic_content(
        &self,
        request: &SubtopicContentRequest,
    ) -> Result<SubtopicContent, GenerationError> {
        self.content_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_content_times.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_content_times.store(remaining - 1, Ordering::SeqCst);
            return Err(GenerationError::EmptyResponse);
        }
        SubtopicContent::new(
            vec![
                format!("{} explained", request.subtopic_title),
                "A practical example".into(),
            ],
            vec![fake_mcq(0, Some("authored explanation"))],
            vec!["example".into()],
            vec!["takeaway".into()],
        )
        .map_err(|e| GenerationError::Malformed(e.to_string()))
    }

    async fn topic_quiz(
        &self,
        _request: &TopicQuizRequest,
    ) -> Result<QuizContent, GenerationError> {
        self.quiz_calls.fetch_add(1, Ordering::SeqCst);
        QuizContent::new(vec![
            fake_mcq(0, Some("quiz explanation")),
            fake_mcq(0, None),
        ])
        .map_err(|e| GenerationError::Malformed(e.to_string()))
    }

    async fn remediate(&self, _prompt: &RemediationPrompt) -> Result<String, GenerationError> {
        self.remediation_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_remediations.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_remediations.store(remaining - 1, Ordering::SeqCst);
            return Err(GenerationError::EmptyResponse);
        }
        Ok("Close! Review the concept and try again.".into())
    }

    async fn clarify_doubt(
        &self,
        question: &str,
        _context: &[String],
    ) -> Result<String, GenerationError> {
        Ok(format!("Here is what '{question}' means."))
    }
}

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

/// Outline-only course: nothing materialized yet.
fn outline_course(id: u64, topics: usize, subtopics: usize) -> Course {
    let topics: Vec<Topic> = (0..topics)
        .map(|t| {
            let subs: Vec<Subtopic> = (0..subtopics)
                .map(|s| Subtopic::new(format!("Subtopic {t}.{s}"), "description", None).unwrap())
                .collect();
            Topic::new(format!("Topic {t}"), "topic description", None, subs).unwrap()
        })
        .collect();
    Course::new(
        CourseId::new(id),
        "Course",
        None,
        None,
        Some(Difficulty::Beginner),
        None,
        Vec::new(),
        topics,
        UserId::new(1),
        fixed_now(),
    )
    .unwrap()
}

/// One topic, one subtopic, three explanations, two practice questions, two
/// quiz MCQs; everything pre-materialized.
fn small_materialized_course(question_explanations: [Option<&str>; 2]) -> Course {
    let content = SubtopicContent::new(
        vec!["one".into(), "two".into(), "three".into()],
        vec![
            fake_mcq(0, question_explanations[0]),
            fake_mcq(0, question_explanations[1]),
        ],
        Vec::new(),
        Vec::new(),
    )
    .unwrap();
    let subtopic = Subtopic::from_persisted("S", "d", None, Some(content), true).unwrap();
    let quiz = QuizContent::new(vec![fake_mcq(0, None), fake_mcq(0, Some("why"))]).unwrap();
    let topic = Topic::from_persisted("T", "d", None, vec![subtopic], Some(quiz), true).unwrap();
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

async fn seeded(course: Course) -> (Storage, Arc<FakeGenerator>, SessionLoopService) {
    let storage = Storage::in_memory();
    storage.courses.upsert_course(&course).await.unwrap();
    let generator = Arc::new(FakeGenerator::default());
    let service = SessionLoopService::new(
        UserId::new(1),
        storage.clone(),
        generator.clone(),
        fixed_clock(),
    );
    (storage, generator, service)
}

async fn drive_to_completion(service: &SessionLoopService, session: &mut LearningSession) {
    let mut steps = 0;
    while !session.is_complete() {
        steps += 1;
        assert!(steps < 10_000, "session did not terminate");
        match session.engine().phase() {
            Phase::Explaining => service.advance_explanation(session).await.unwrap(),
            Phase::Practicing => {
                let outcome = service.submit_practice_answer(session, 0).await.unwrap();
                service
                    .advance_after_answer(session, outcome.token)
                    .await
                    .unwrap();
            }
            Phase::TopicQuiz => {
                let outcome = service.submit_quiz_answer(session, 0).await.unwrap();
                service
                    .advance_after_answer(session, outcome.token)
                    .await
                    .unwrap();
            }
            Phase::Complete => unreachable!(),
        }
    }
}

//
// ─── COURSE GENERATION ─────────────────────────────────────────────────────────
//

#[tokio::test]
async fn course_service_persists_generated_outline() {
    let storage = Storage::in_memory();
    let generator = Arc::new(FakeGenerator::default());
    let service = CourseService::new(generator, storage.clone(), fixed_clock());

    let course = service
        .generate_course(
            UserId::new(5),
            OutlineRequest {
                topic: "Rust".into(),
                situation: Some("career switch".into()),
                level: Difficulty::Beginner,
            },
        )
        .await
        .unwrap();

    assert_eq!(course.title(), "Learn Rust");
    assert_eq!(course.created_by(), UserId::new(5));
    assert_eq!(course.situation(), Some("career switch"));
    // Outline only: nothing materialized at creation time.
    assert!(!course.topics()[0].subtopics()[0].content_generated());

    let stored = service.get_course(course.id()).await.unwrap().unwrap();
    assert_eq!(stored, course);
}

//
// ─── MATERIALIZATION ───────────────────────────────────────────────────────────
//

#[tokio::test]
async fn session_materializes_each_subtopic_and_quiz_exactly_once() {
    let (storage, generator, service) = seeded(outline_course(1, 2, 2)).await;

    let mut session = service.start_session(CourseId::new(1)).await.unwrap();
    drive_to_completion(&service, &mut session).await;

    assert_eq!(generator.content_calls.load(Ordering::SeqCst), 4);
    assert_eq!(generator.quiz_calls.load(Ordering::SeqCst), 2);

    // Everything merged into the stored course.
    let stored = storage
        .courses
        .get_course(CourseId::new(1))
        .await
        .unwrap()
        .unwrap();
    for topic in stored.topics() {
        assert!(topic.quiz_generated());
        for subtopic in topic.subtopics() {
            assert!(subtopic.content_generated());
        }
    }
}

#[tokio::test]
async fn failed_materialization_leaves_flag_unset_for_retry() {
    let storage = Storage::in_memory();
    storage
        .courses
        .upsert_course(&outline_course(1, 1, 1))
        .await
        .unwrap();
    let generator = Arc::new(FakeGenerator::default());
    generator.fail_content_times.store(1, Ordering::SeqCst);
    let materializer = MaterializeService::new(generator.clone(), storage.clone());

    let err = materializer
        .materialize_subtopic_content(CourseId::new(1), 0, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, MaterializeError::Generation(_)));

    let stored = storage
        .courses
        .get_course(CourseId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert!(!stored.topics()[0].subtopics()[0].content_generated());

    // The next trigger retries and succeeds.
    materializer
        .materialize_subtopic_content(CourseId::new(1), 0, 0)
        .await
        .unwrap();
    let stored = storage
        .courses
        .get_course(CourseId::new(1))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.topics()[0].subtopics()[0].content_generated());
}

#[tokio::test]
async fn materializing_generated_content_is_a_caller_error() {
    let storage = Storage::in_memory();
    storage
        .courses
        .upsert_course(&small_materialized_course([None, None]))
        .await
        .unwrap();
    let generator = Arc::new(FakeGenerator::default());
    let materializer = MaterializeService::new(generator.clone(), storage);

    let err = materializer
        .materialize_subtopic_content(CourseId::new(1), 0, 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MaterializeError::Course(CourseError::ContentAlreadyGenerated { .. })
    ));
    let err = materializer
        .materialize_topic_quiz(CourseId::new(1), 0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MaterializeError::Course(CourseError::QuizAlreadyGenerated { .. })
    ));
    // The generator was never consulted.
    assert_eq!(generator.content_calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.quiz_calls.load(Ordering::SeqCst), 0);
}

//
// ─── SESSION FLOW ──────────────────────────────────────────────────────────────
//

#[tokio::test]
async fn small_course_walkthrough_hits_every_phase() {
    let (_storage, generator, service) =
        seeded(small_materialized_course([Some("authored"), None])).await;

    let mut session = service.start_session(CourseId::new(1)).await.unwrap();
    assert_eq!(session.engine().phase(), Phase::Explaining);
    assert!(!session.view().loading_content);

    // Three explanations, then practice.
    service.advance_explanation(&mut session).await.unwrap();
    service.advance_explanation(&mut session).await.unwrap();
    service.advance_explanation(&mut session).await.unwrap();
    assert_eq!(session.engine().phase(), Phase::Practicing);

    // Wrong answer on a question with an authored explanation: the text is
    // served as-is, nothing is generated.
    let outcome = service.submit_practice_answer(&mut session, 1).await.unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.remediation.as_deref(), Some("authored"));
    assert_eq!(generator.remediation_calls.load(Ordering::SeqCst), 0);
    service
        .advance_after_answer(&mut session, outcome.token)
        .await
        .unwrap();

    // Wrong answer on a question without one: remediation is generated.
    let outcome = service.submit_practice_answer(&mut session, 1).await.unwrap();
    assert!(!outcome.correct);
    assert_eq!(
        outcome.remediation.as_deref(),
        Some("Close! Review the concept and try again.")
    );
    assert_eq!(generator.remediation_calls.load(Ordering::SeqCst), 1);
    service
        .advance_after_answer(&mut session, outcome.token)
        .await
        .unwrap();

    // Quiz: two MCQs, both answered correctly.
    assert_eq!(session.engine().phase(), Phase::TopicQuiz);
    let outcome = service.submit_quiz_answer(&mut session, 0).await.unwrap();
    assert!(outcome.correct);
    assert!(outcome.remediation.is_none());
    service
        .advance_after_answer(&mut session, outcome.token)
        .await
        .unwrap();
    let outcome = service.submit_quiz_answer(&mut session, 0).await.unwrap();
    service
        .advance_after_answer(&mut session, outcome.token)
        .await
        .unwrap();

    assert!(session.is_complete());
    assert!((session.view().progress_percent - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn failed_remediation_degrades_to_no_text_and_the_session_moves_on() {
    let (_storage, generator, service) =
        seeded(small_materialized_course([None, None])).await;
    generator.fail_remediations.store(1, Ordering::SeqCst);

    let mut session = service.start_session(CourseId::new(1)).await.unwrap();
    service.advance_explanation(&mut session).await.unwrap();
    service.advance_explanation(&mut session).await.unwrap();
    service.advance_explanation(&mut session).await.unwrap();
    assert_eq!(session.engine().phase(), Phase::Practicing);

    // Wrong answer, no authored explanation, generation down: the learner
    // still gets the consoling cue, just no remediation text.
    let outcome = service.submit_practice_answer(&mut session, 1).await.unwrap();
    assert!(!outcome.correct);
    assert_eq!(outcome.cue, CompanionCue::Consoling);
    assert!(outcome.remediation.is_none());
    assert_eq!(generator.remediation_calls.load(Ordering::SeqCst), 1);

    // The failure does not block progression.
    service
        .advance_after_answer(&mut session, outcome.token)
        .await
        .unwrap();
    assert_eq!(session.engine().phase(), Phase::Practicing);
    assert_eq!(session.engine().question_index(), 1);
}

#[tokio::test]
async fn session_resumes_from_stored_checkpoint() {
    let (storage, _generator, service) = seeded(outline_course(1, 2, 2)).await;
    storage
        .progress
        .upsert_checkpoint(
            UserId::new(1),
            CourseId::new(1),
            Checkpoint::new(1, 1, 0),
            fixed_now(),
        )
        .await
        .unwrap();

    let session = service.start_session(CourseId::new(1)).await.unwrap();
    assert_eq!(session.engine().topic_index(), 1);
    assert_eq!(session.engine().subtopic_index(), 1);
}

#[tokio::test]
async fn end_session_flushes_the_pending_checkpoint() {
    let (storage, _generator, service) = seeded(outline_course(1, 1, 2)).await;

    let mut session = service.start_session(CourseId::new(1)).await.unwrap();
    // Content was materialized at start; step one explanation to move the
    // checkpoint, then leave before the debounce window passes.
    service.advance_explanation(&mut session).await.unwrap();
    service.end_session(&session).await.unwrap();

    let checkpoint = storage
        .progress
        .get_checkpoint(UserId::new(1), CourseId::new(1))
        .await
        .unwrap();
    assert_eq!(checkpoint, Some(Checkpoint::new(0, 0, 1)));
}

#[tokio::test]
async fn missing_course_is_reported() {
    let storage = Storage::in_memory();
    let service = SessionLoopService::new(
        UserId::new(1),
        storage,
        Arc::new(FakeGenerator::default()),
        fixed_clock(),
    );
    let err = service.start_session(CourseId::new(42)).await.unwrap_err();
    assert!(matches!(
        err,
        services::SessionLoopError::CourseNotFound(id) if id == CourseId::new(42)
    ));
}

#[tokio::test]
async fn doubt_is_answered_and_recorded_on_the_session() {
    let (_storage, _generator, service) =
        seeded(small_materialized_course([None, None])).await;

    let mut session = service.start_session(CourseId::new(1)).await.unwrap();
    let doubt = service
        .ask_doubt(&mut session, "why does this work?")
        .await
        .unwrap();

    assert_eq!(
        doubt.answer(),
        Some("Here is what 'why does this work?' means.")
    );
    // Context starts with the subtopic description.
    assert_eq!(doubt.context()[0], "d");
    assert_eq!(session.doubts().len(), 1);
}
