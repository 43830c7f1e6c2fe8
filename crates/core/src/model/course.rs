use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CourseId, UserId};
use crate::model::mcq::{Mcq, QuizContent};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("name cannot be empty")]
    EmptyName,

    #[error("a course must contain at least one topic")]
    EmptyTopics,

    #[error("a topic must contain at least one subtopic")]
    EmptySubtopics,

    #[error("subtopic content must contain at least one explanation")]
    EmptyExplanations,

    #[error("topic index {index} out of range (len {len})")]
    TopicIndexOutOfRange { index: usize, len: usize },

    #[error("subtopic index {index} out of range (len {len})")]
    SubtopicIndexOutOfRange { index: usize, len: usize },

    #[error("content already generated for subtopic {subtopic_index} of topic {topic_index}")]
    ContentAlreadyGenerated {
        topic_index: usize,
        subtopic_index: usize,
    },

    #[error("quiz already generated for topic {topic_index}")]
    QuizAlreadyGenerated { topic_index: usize },

    #[error("persisted generated flag set without usable content")]
    MissingGeneratedContent,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Learner level a course is pitched at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CourseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            other => Err(CourseError::UnknownDifficulty(other.to_string())),
        }
    }
}

//
// ─── SUBTOPIC CONTENT ──────────────────────────────────────────────────────────
//

/// Materialized learning content for one subtopic.
///
/// Explanations are the ordered steps the learner walks through; practice
/// questions follow them. Emptiness of the explanation sequence is rejected at
/// construction so a generated-but-unusable payload can never be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtopicContent {
    explanations: Vec<String>,
    questions: Vec<Mcq>,
    examples: Vec<String>,
    key_takeaways: Vec<String>,
}

impl SubtopicContent {
    /// Builds validated subtopic content.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyExplanations` if no explanations are given.
    pub fn new(
        explanations: Vec<String>,
        questions: Vec<Mcq>,
        examples: Vec<String>,
        key_takeaways: Vec<String>,
    ) -> Result<Self, CourseError> {
        if explanations.is_empty() {
            return Err(CourseError::EmptyExplanations);
        }
        Ok(Self {
            explanations,
            questions,
            examples,
            key_takeaways,
        })
    }

    #[must_use]
    pub fn explanations(&self) -> &[String] {
        &self.explanations
    }

    #[must_use]
    pub fn questions(&self) -> &[Mcq] {
        &self.questions
    }

    #[must_use]
    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    #[must_use]
    pub fn key_takeaways(&self) -> &[String] {
        &self.key_takeaways
    }
}

//
// ─── SUBTOPIC ──────────────────────────────────────────────────────────────────
//

/// One subtopic of a topic. Content is materialized lazily; the generated
/// flag is derived from its presence, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtopic {
    name: String,
    description: String,
    estimated_duration: Option<String>,
    content: Option<SubtopicContent>,
}

impl Subtopic {
    /// Builds an outline-stage subtopic (no content yet).
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyName` if the name is empty.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        estimated_duration: Option<String>,
    ) -> Result<Self, CourseError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CourseError::EmptyName);
        }
        Ok(Self {
            name,
            description: description.into(),
            estimated_duration,
            content: None,
        })
    }

    /// Rehydrates a subtopic from storage.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::MissingGeneratedContent` if the persisted
    /// generated flag is set but no content was stored with it.
    pub fn from_persisted(
        name: impl Into<String>,
        description: impl Into<String>,
        estimated_duration: Option<String>,
        content: Option<SubtopicContent>,
        content_generated: bool,
    ) -> Result<Self, CourseError> {
        if content_generated && content.is_none() {
            return Err(CourseError::MissingGeneratedContent);
        }
        let mut subtopic = Self::new(name, description, estimated_duration)?;
        subtopic.content = content;
        Ok(subtopic)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn estimated_duration(&self) -> Option<&str> {
        self.estimated_duration.as_deref()
    }

    #[must_use]
    pub fn content(&self) -> Option<&SubtopicContent> {
        self.content.as_ref()
    }

    #[must_use]
    pub fn content_generated(&self) -> bool {
        self.content.is_some()
    }

    pub(crate) fn set_content(&mut self, content: SubtopicContent) {
        self.content = Some(content);
    }
}

//
// ─── TOPIC ─────────────────────────────────────────────────────────────────────
//

/// One topic of a course: an ordered, non-empty sequence of subtopics plus a
/// lazily materialized topic quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    name: String,
    description: String,
    duration: Option<String>,
    subtopics: Vec<Subtopic>,
    quiz: Option<QuizContent>,
}

impl Topic {
    /// Builds an outline-stage topic.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyName` for an empty name and
    /// `CourseError::EmptySubtopics` for an empty subtopic list.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        duration: Option<String>,
        subtopics: Vec<Subtopic>,
    ) -> Result<Self, CourseError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CourseError::EmptyName);
        }
        if subtopics.is_empty() {
            return Err(CourseError::EmptySubtopics);
        }
        Ok(Self {
            name,
            description: description.into(),
            duration,
            subtopics,
            quiz: None,
        })
    }

    /// Rehydrates a topic from storage.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::MissingGeneratedContent` if the persisted quiz
    /// flag is set without a stored quiz.
    pub fn from_persisted(
        name: impl Into<String>,
        description: impl Into<String>,
        duration: Option<String>,
        subtopics: Vec<Subtopic>,
        quiz: Option<QuizContent>,
        quiz_generated: bool,
    ) -> Result<Self, CourseError> {
        if quiz_generated && quiz.is_none() {
            return Err(CourseError::MissingGeneratedContent);
        }
        let mut topic = Self::new(name, description, duration, subtopics)?;
        topic.quiz = quiz;
        Ok(topic)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    #[must_use]
    pub fn subtopics(&self) -> &[Subtopic] {
        &self.subtopics
    }

    #[must_use]
    pub fn subtopic(&self, index: usize) -> Option<&Subtopic> {
        self.subtopics.get(index)
    }

    #[must_use]
    pub fn quiz(&self) -> Option<&QuizContent> {
        self.quiz.as_ref()
    }

    #[must_use]
    pub fn quiz_generated(&self) -> bool {
        self.quiz.is_some()
    }

    /// Names of all subtopics, in order. Used to scope quiz generation.
    #[must_use]
    pub fn subtopic_names(&self) -> Vec<String> {
        self.subtopics.iter().map(|s| s.name.clone()).collect()
    }
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A generated course: outline metadata plus an ordered, non-empty syllabus
/// of topics. Created once; topic/subtopic content is materialized in place
/// as the learner reaches it. Never deleted by the session core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    total_duration: Option<String>,
    difficulty: Option<Difficulty>,
    situation: Option<String>,
    tags: Vec<String>,
    topics: Vec<Topic>,
    created_by: UserId,
    upvotes: u32,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Builds a new course from outline-stage parts.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` or `CourseError::EmptyTopics` when
    /// the corresponding parts are missing.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        total_duration: Option<String>,
        difficulty: Option<Difficulty>,
        situation: Option<String>,
        tags: Vec<String>,
        topics: Vec<Topic>,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if topics.is_empty() {
            return Err(CourseError::EmptyTopics);
        }
        Ok(Self {
            id,
            title,
            description,
            total_duration,
            difficulty,
            situation,
            tags,
            topics,
            created_by,
            upvotes: 0,
            created_at,
        })
    }

    /// Rehydrates a course from storage, including its vote count.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the persisted parts fail validation.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: CourseId,
        title: impl Into<String>,
        description: Option<String>,
        total_duration: Option<String>,
        difficulty: Option<Difficulty>,
        situation: Option<String>,
        tags: Vec<String>,
        topics: Vec<Topic>,
        created_by: UserId,
        upvotes: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CourseError> {
        let mut course = Self::new(
            id,
            title,
            description,
            total_duration,
            difficulty,
            situation,
            tags,
            topics,
            created_by,
            created_at,
        )?;
        course.upvotes = upvotes;
        Ok(course)
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn total_duration(&self) -> Option<&str> {
        self.total_duration.as_deref()
    }

    #[must_use]
    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    #[must_use]
    pub fn situation(&self) -> Option<&str> {
        self.situation.as_deref()
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    #[must_use]
    pub fn topic(&self, index: usize) -> Option<&Topic> {
        self.topics.get(index)
    }

    #[must_use]
    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    #[must_use]
    pub fn upvotes(&self) -> u32 {
        self.upvotes
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Merges freshly materialized content into a subtopic.
    ///
    /// Calling this for a subtopic whose content is already generated is a
    /// caller error; materialization must be gated on the flag.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` on out-of-range indices or when content is
    /// already present.
    pub fn attach_subtopic_content(
        &mut self,
        topic_index: usize,
        subtopic_index: usize,
        content: SubtopicContent,
    ) -> Result<(), CourseError> {
        let len = self.topics.len();
        let topic = self
            .topics
            .get_mut(topic_index)
            .ok_or(CourseError::TopicIndexOutOfRange { index: topic_index, len })?;
        let sub_len = topic.subtopics.len();
        let subtopic = topic.subtopics.get_mut(subtopic_index).ok_or(
            CourseError::SubtopicIndexOutOfRange {
                index: subtopic_index,
                len: sub_len,
            },
        )?;
        if subtopic.content_generated() {
            return Err(CourseError::ContentAlreadyGenerated {
                topic_index,
                subtopic_index,
            });
        }
        subtopic.set_content(content);
        Ok(())
    }

    /// Merges a freshly materialized quiz into a topic. Same gating contract
    /// as `attach_subtopic_content`.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` on an out-of-range index or when a quiz is
    /// already present.
    pub fn attach_topic_quiz(
        &mut self,
        topic_index: usize,
        quiz: QuizContent,
    ) -> Result<(), CourseError> {
        let len = self.topics.len();
        let topic = self
            .topics
            .get_mut(topic_index)
            .ok_or(CourseError::TopicIndexOutOfRange { index: topic_index, len })?;
        if topic.quiz_generated() {
            return Err(CourseError::QuizAlreadyGenerated { topic_index });
        }
        topic.quiz = Some(quiz);
        Ok(())
    }
}

//
// ─── OUTLINE ───────────────────────────────────────────────────────────────────
//

/// A generated course outline before it is given an identity and an owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOutline {
    title: String,
    description: Option<String>,
    total_duration: Option<String>,
    difficulty: Option<Difficulty>,
    tags: Vec<String>,
    topics: Vec<Topic>,
}

impl CourseOutline {
    /// Builds a validated outline.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` or `CourseError::EmptyTopics`.
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        total_duration: Option<String>,
        difficulty: Option<Difficulty>,
        tags: Vec<String>,
        topics: Vec<Topic>,
    ) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        if topics.is_empty() {
            return Err(CourseError::EmptyTopics);
        }
        Ok(Self {
            title,
            description,
            total_duration,
            difficulty,
            tags,
            topics,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn topics(&self) -> &[Topic] {
        &self.topics
    }

    /// Turns the outline into a stored course owned by `created_by`.
    #[must_use]
    pub fn into_course(
        self,
        id: CourseId,
        created_by: UserId,
        situation: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Course {
        Course {
            id,
            title: self.title,
            description: self.description,
            total_duration: self.total_duration,
            difficulty: self.difficulty,
            situation,
            tags: self.tags,
            topics: self.topics,
            created_by,
            upvotes: 0,
            created_at,
        }
    }
}
