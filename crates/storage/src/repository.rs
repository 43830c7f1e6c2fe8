use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentor_core::model::{
    Checkpoint, Course, CourseId, Difficulty, Mcq, McqError, QuizContent, Subtopic,
    SubtopicContent, Topic, UserId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape for an MCQ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McqRecord {
    pub question: String,
    pub options: Vec<String>,
    pub correct: usize,
    pub explanation: Option<String>,
}

impl McqRecord {
    #[must_use]
    pub fn from_mcq(mcq: &Mcq) -> Self {
        Self {
            question: mcq.question().to_owned(),
            options: mcq.options().to_vec(),
            correct: mcq.correct(),
            explanation: mcq.explanation().map(str::to_owned),
        }
    }

    /// # Errors
    ///
    /// Returns `McqError` if the persisted shape fails validation.
    pub fn into_mcq(self) -> Result<Mcq, McqError> {
        Mcq::new(self.question, self.options, self.correct, self.explanation)
    }
}

/// Persisted shape for materialized subtopic content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtopicContentRecord {
    pub explanations: Vec<String>,
    pub questions: Vec<McqRecord>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub key_takeaways: Vec<String>,
}

impl SubtopicContentRecord {
    #[must_use]
    pub fn from_content(content: &SubtopicContent) -> Self {
        Self {
            explanations: content.explanations().to_vec(),
            questions: content.questions().iter().map(McqRecord::from_mcq).collect(),
            examples: content.examples().to_vec(),
            key_takeaways: content.key_takeaways().to_vec(),
        }
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the persisted shape fails
    /// domain validation.
    pub fn into_content(self) -> Result<SubtopicContent, StorageError> {
        let questions = self
            .questions
            .into_iter()
            .map(McqRecord::into_mcq)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        SubtopicContent::new(self.explanations, questions, self.examples, self.key_takeaways)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubtopicRecord {
    pub name: String,
    pub description: String,
    pub estimated_duration: Option<String>,
    pub content: Option<SubtopicContentRecord>,
    #[serde(default)]
    pub content_generated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub name: String,
    pub description: String,
    pub duration: Option<String>,
    pub subtopics: Vec<SubtopicRecord>,
    pub quiz: Option<Vec<McqRecord>>,
    #[serde(default)]
    pub quiz_generated: bool,
}

/// Persisted shape for a course, stored as one JSON document per course.
///
/// This mirrors the domain `Course` so repositories can serialize and
/// deserialize without leaking storage concerns into the domain layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    pub total_duration: Option<String>,
    pub difficulty: Option<String>,
    pub situation: Option<String>,
    pub tags: Vec<String>,
    pub topics: Vec<TopicRecord>,
    pub created_by: u64,
    pub upvotes: u32,
    pub created_at: DateTime<Utc>,
}

impl CourseRecord {
    #[must_use]
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: course.id().value(),
            title: course.title().to_owned(),
            description: course.description().map(str::to_owned),
            total_duration: course.total_duration().map(str::to_owned),
            difficulty: course.difficulty().map(|d| d.to_string()),
            situation: course.situation().map(str::to_owned),
            tags: course.tags().to_vec(),
            topics: course
                .topics()
                .iter()
                .map(|topic| TopicRecord {
                    name: topic.name().to_owned(),
                    description: topic.description().to_owned(),
                    duration: topic.duration().map(str::to_owned),
                    subtopics: topic
                        .subtopics()
                        .iter()
                        .map(|subtopic| SubtopicRecord {
                            name: subtopic.name().to_owned(),
                            description: subtopic.description().to_owned(),
                            estimated_duration: subtopic
                                .estimated_duration()
                                .map(str::to_owned),
                            content: subtopic.content().map(SubtopicContentRecord::from_content),
                            content_generated: subtopic.content_generated(),
                        })
                        .collect(),
                    quiz: topic
                        .quiz()
                        .map(|quiz| quiz.mcqs().iter().map(McqRecord::from_mcq).collect()),
                    quiz_generated: topic.quiz_generated(),
                })
                .collect(),
            created_by: course.created_by().value(),
            upvotes: course.upvotes(),
            created_at: course.created_at(),
        }
    }

    /// Convert the record back into a domain `Course`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if any persisted part fails
    /// domain validation, including a generated flag set without content.
    pub fn into_course(self) -> Result<Course, StorageError> {
        fn domain<E: core::fmt::Display>(e: E) -> StorageError {
            StorageError::Serialization(e.to_string())
        }

        let mut topics = Vec::with_capacity(self.topics.len());
        for topic in self.topics {
            let mut subtopics = Vec::with_capacity(topic.subtopics.len());
            for subtopic in topic.subtopics {
                let content = subtopic
                    .content
                    .map(SubtopicContentRecord::into_content)
                    .transpose()?;
                subtopics.push(
                    Subtopic::from_persisted(
                        subtopic.name,
                        subtopic.description,
                        subtopic.estimated_duration,
                        content,
                        subtopic.content_generated,
                    )
                    .map_err(domain)?,
                );
            }
            let quiz = topic
                .quiz
                .map(|mcqs| {
                    let mcqs = mcqs
                        .into_iter()
                        .map(McqRecord::into_mcq)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(domain)?;
                    QuizContent::new(mcqs).map_err(domain)
                })
                .transpose()?;
            topics.push(
                Topic::from_persisted(
                    topic.name,
                    topic.description,
                    topic.duration,
                    subtopics,
                    quiz,
                    topic.quiz_generated,
                )
                .map_err(domain)?,
            );
        }

        let difficulty = self
            .difficulty
            .map(|d| d.parse::<Difficulty>().map_err(domain))
            .transpose()?;

        Course::from_persisted(
            CourseId::new(self.id),
            self.title,
            self.description,
            self.total_duration,
            difficulty,
            self.situation,
            self.tags,
            topics,
            UserId::new(self.created_by),
            self.upvotes,
            self.created_at,
        )
        .map_err(domain)
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for courses.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Reserve an identity for a new course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if an id cannot be allocated.
    async fn allocate_course_id(&self) -> Result<CourseId, StorageError>;

    /// Persist or update a course, including materialized content.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID; `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for storage failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;
}

/// Repository contract for learner checkpoints. One checkpoint per
/// `(user, course)` pair; upserted, never multiplied.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist the resumption point, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_checkpoint(
        &self,
        user_id: UserId,
        course_id: CourseId,
        checkpoint: Checkpoint,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Fetch the resumption point, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for storage failures.
    async fn get_checkpoint(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Checkpoint>, StorageError>;
}

//
// ─── IN-MEMORY IMPLEMENTATION ──────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    next_course_id: Arc<Mutex<u64>>,
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    checkpoints: Arc<Mutex<HashMap<(UserId, CourseId), Checkpoint>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn allocate_course_id(&self) -> Result<CourseId, StorageError> {
        let mut next = self
            .next_course_id
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *next += 1;
        Ok(CourseId::new(*next))
    }

    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self
            .courses
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_checkpoint(
        &self,
        user_id: UserId,
        course_id: CourseId,
        checkpoint: Checkpoint,
        _at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .checkpoints
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert((user_id, course_id), checkpoint);
        Ok(())
    }

    async fn get_checkpoint(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Checkpoint>, StorageError> {
        let guard = self
            .checkpoints
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&(user_id, course_id)).copied())
    }
}

/// Aggregates course and progress repositories behind trait objects for easy
/// backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { courses, progress }
    }
}
