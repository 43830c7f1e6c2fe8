//! The generation seam: a trait the rest of the services program against,
//! plus the client-backed implementation.

use async_trait::async_trait;

use mentor_core::model::{CourseOutline, Difficulty, QuizContent, SubtopicContent};
use mentor_core::session::RemediationPrompt;

use crate::ai::{self, GenAiClient};
use crate::error::GenerationError;

/// What the learner asked to be taught.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineRequest {
    pub topic: String,
    pub situation: Option<String>,
    pub level: Difficulty,
}

/// Everything the generator needs to materialize one subtopic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtopicContentRequest {
    pub course_title: String,
    pub topic_title: String,
    pub subtopic_title: String,
    pub subtopic_description: String,
    pub level: Difficulty,
}

/// Everything the generator needs to materialize one topic quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicQuizRequest {
    pub course_title: String,
    pub topic_title: String,
    pub topic_description: String,
    pub subtopic_names: Vec<String>,
    pub level: Difficulty,
}

/// Content generation behind a trait so services and tests can swap the
/// backend. All methods are fallible; callers degrade rather than halt.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generates a course outline (structure only, no content).
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on transport or validation failure.
    async fn outline(&self, request: &OutlineRequest) -> Result<CourseOutline, GenerationError>;

    /// Generates explanations, practice questions, examples, and takeaways
    /// for one subtopic.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on transport or validation failure,
    /// including an empty payload.
    async fn subtopic_content(
        &self,
        request: &SubtopicContentRequest,
    ) -> Result<SubtopicContent, GenerationError>;

    /// Generates the quiz for one topic.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on transport or validation failure,
    /// including an empty MCQ list.
    async fn topic_quiz(&self, request: &TopicQuizRequest)
    -> Result<QuizContent, GenerationError>;

    /// Generates an encouraging explanation for a missed answer. Only called
    /// when the question has no authored explanation.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on transport failure or an empty response.
    async fn remediate(&self, prompt: &RemediationPrompt) -> Result<String, GenerationError>;

    /// Answers a learner's free-form doubt against the given context.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` on transport failure or an empty response.
    async fn clarify_doubt(
        &self,
        question: &str,
        context: &[String],
    ) -> Result<String, GenerationError>;
}

/// `GenerationService` backed by the chat-completions client.
#[derive(Clone)]
pub struct GenAiGenerationService {
    client: GenAiClient,
}

impl GenAiGenerationService {
    #[must_use]
    pub fn new(client: GenAiClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GenAiClient::from_env())
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.client.enabled()
    }

    fn non_empty(text: String) -> Result<String, GenerationError> {
        if text.trim().is_empty() {
            Err(GenerationError::EmptyResponse)
        } else {
            Ok(text)
        }
    }
}

#[async_trait]
impl GenerationService for GenAiGenerationService {
    async fn outline(&self, request: &OutlineRequest) -> Result<CourseOutline, GenerationError> {
        let prompt = ai::prompts::outline(
            &request.topic,
            request.situation.as_deref(),
            request.level,
        );
        let text = self.client.generate(&prompt).await?;
        ai::response::parse_outline(&text)
    }

    async fn subtopic_content(
        &self,
        request: &SubtopicContentRequest,
    ) -> Result<SubtopicContent, GenerationError> {
        let prompt = ai::prompts::subtopic_content(
            &request.course_title,
            &request.topic_title,
            &request.subtopic_title,
            &request.subtopic_description,
            request.level,
        );
        let text = self.client.generate(&prompt).await?;
        ai::response::parse_subtopic_content(&text)
    }

    async fn topic_quiz(
        &self,
        request: &TopicQuizRequest,
    ) -> Result<QuizContent, GenerationError> {
        let prompt = ai::prompts::topic_quiz(
            &request.course_title,
            &request.topic_title,
            &request.topic_description,
            &request.subtopic_names,
            request.level,
        );
        let text = self.client.generate(&prompt).await?;
        ai::response::parse_topic_quiz(&text)
    }

    async fn remediate(&self, prompt: &RemediationPrompt) -> Result<String, GenerationError> {
        let prompt = ai::prompts::remediation(
            &prompt.question,
            &prompt.correct_text,
            &prompt.chosen_text,
            &prompt.context,
        );
        Self::non_empty(self.client.generate(&prompt).await?)
    }

    async fn clarify_doubt(
        &self,
        question: &str,
        context: &[String],
    ) -> Result<String, GenerationError> {
        let prompt = ai::prompts::doubt(question, context);
        Self::non_empty(self.client.generate(&prompt).await?)
    }
}
