use thiserror::Error;

/// Number of answer options every MCQ must carry.
pub const MCQ_OPTION_COUNT: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum McqError {
    #[error("question text cannot be empty")]
    EmptyQuestion,

    #[error("an MCQ must have exactly {MCQ_OPTION_COUNT} options, got {len}")]
    WrongOptionCount { len: usize },

    #[error("correct option index {correct} is out of range")]
    CorrectOutOfRange { correct: usize },

    #[error("a quiz must contain at least one MCQ")]
    EmptyQuiz,
}

/// A multiple-choice question with exactly four options and one correct answer.
///
/// `correct` is a zero-based index into `options`. The optional `explanation`
/// is authored alongside the question; when present it is shown to the learner
/// on a miss instead of requesting generated remediation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mcq {
    question: String,
    options: Vec<String>,
    correct: usize,
    explanation: Option<String>,
}

impl Mcq {
    /// Builds a validated MCQ.
    ///
    /// # Errors
    ///
    /// Returns `McqError` if the question is empty, the option count is not
    /// exactly four, or `correct` does not index an option.
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        correct: usize,
        explanation: Option<String>,
    ) -> Result<Self, McqError> {
        let question = question.into();
        if question.trim().is_empty() {
            return Err(McqError::EmptyQuestion);
        }
        if options.len() != MCQ_OPTION_COUNT {
            return Err(McqError::WrongOptionCount { len: options.len() });
        }
        if correct >= options.len() {
            return Err(McqError::CorrectOutOfRange { correct });
        }

        // Blank explanations behave as absent ones.
        let explanation = explanation.filter(|e| !e.trim().is_empty());

        Ok(Self {
            question,
            options,
            correct,
            explanation,
        })
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Zero-based index of the correct option.
    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// Strict index equality; no partial credit.
    #[must_use]
    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct
    }

    #[must_use]
    pub fn correct_option_text(&self) -> &str {
        &self.options[self.correct]
    }

    /// Returns the option text for a choice, if the choice is in range.
    #[must_use]
    pub fn option_text(&self, choice: usize) -> Option<&str> {
        self.options.get(choice).map(String::as_str)
    }
}

/// Quiz for an entire topic: a non-empty set of MCQs.
///
/// Emptiness is rejected at construction so a `quiz_generated` flag can never
/// point at an unusable quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizContent {
    mcqs: Vec<Mcq>,
}

impl QuizContent {
    /// Builds a validated quiz.
    ///
    /// # Errors
    ///
    /// Returns `McqError::EmptyQuiz` if no MCQs are provided.
    pub fn new(mcqs: Vec<Mcq>) -> Result<Self, McqError> {
        if mcqs.is_empty() {
            return Err(McqError::EmptyQuiz);
        }
        Ok(Self { mcqs })
    }

    #[must_use]
    pub fn mcqs(&self) -> &[Mcq] {
        &self.mcqs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mcqs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mcqs.is_empty()
    }
}
