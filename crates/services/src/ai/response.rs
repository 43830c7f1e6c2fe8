//! Strict parsing of generated JSON payloads.
//!
//! A response is stripped of markdown code fences, parsed with serde, and
//! converted into validated domain types. Any shape mismatch (objects where
//! strings were demanded, missing fields, out-of-range indices, empty
//! sequences) is a `GenerationError::Malformed`; nothing is silently
//! repaired.

use serde::Deserialize;

use mentor_core::model::{
    CourseOutline, Difficulty, Mcq, QuizContent, Subtopic, SubtopicContent, Topic,
};

use crate::error::GenerationError;

/// Removes a surrounding ```json / ``` fence if the model wrapped its output.
pub(crate) fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let body = if let Some(rest) = trimmed.strip_prefix("```json") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn malformed<E: core::fmt::Display>(e: E) -> GenerationError {
    GenerationError::Malformed(e.to_string())
}

//
// ─── WIRE SHAPES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutlineDto {
    course_title: String,
    #[serde(default)]
    course_description: Option<String>,
    #[serde(default)]
    total_duration: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    topics: Vec<OutlineTopicDto>,
}

#[derive(Debug, Deserialize)]
struct OutlineTopicDto {
    topic: String,
    description: String,
    #[serde(default)]
    duration: Option<String>,
    subtopics: Vec<OutlineSubtopicDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutlineSubtopicDto {
    name: String,
    description: String,
    #[serde(default)]
    estimated_duration: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubtopicContentDto {
    explanations: Vec<String>,
    questions: Vec<McqDto>,
    #[serde(default)]
    examples: Vec<String>,
    #[serde(default)]
    key_takeaways: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct McqDto {
    question: String,
    options: Vec<String>,
    correct: usize,
    #[serde(default)]
    explanation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuizDto {
    mcqs: Vec<McqDto>,
}

impl McqDto {
    fn into_mcq(self) -> Result<Mcq, GenerationError> {
        Mcq::new(self.question, self.options, self.correct, self.explanation).map_err(malformed)
    }
}

//
// ─── PARSERS ───────────────────────────────────────────────────────────────────
//

/// Parses a generated course outline.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` on any JSON or validation failure,
/// including an unknown difficulty label or an outline without topics.
pub(crate) fn parse_outline(text: &str) -> Result<CourseOutline, GenerationError> {
    let dto: OutlineDto = serde_json::from_str(strip_code_fences(text)).map_err(malformed)?;

    let difficulty = dto
        .difficulty
        .map(|d| d.parse::<Difficulty>().map_err(malformed))
        .transpose()?;

    let mut topics = Vec::with_capacity(dto.topics.len());
    for topic in dto.topics {
        let mut subtopics = Vec::with_capacity(topic.subtopics.len());
        for subtopic in topic.subtopics {
            subtopics.push(
                Subtopic::new(subtopic.name, subtopic.description, subtopic.estimated_duration)
                    .map_err(malformed)?,
            );
        }
        topics.push(
            Topic::new(topic.topic, topic.description, topic.duration, subtopics)
                .map_err(malformed)?,
        );
    }

    CourseOutline::new(
        dto.course_title,
        dto.course_description,
        dto.total_duration,
        difficulty,
        dto.tags,
        topics,
    )
    .map_err(malformed)
}

/// Parses generated subtopic content.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` on any JSON or validation failure,
/// including empty explanations (an empty-but-parseable payload is a
/// generation failure, not a success).
pub(crate) fn parse_subtopic_content(text: &str) -> Result<SubtopicContent, GenerationError> {
    let dto: SubtopicContentDto =
        serde_json::from_str(strip_code_fences(text)).map_err(malformed)?;

    let questions = dto
        .questions
        .into_iter()
        .map(McqDto::into_mcq)
        .collect::<Result<Vec<_>, _>>()?;

    SubtopicContent::new(dto.explanations, questions, dto.examples, dto.key_takeaways)
        .map_err(malformed)
}

/// Parses a generated topic quiz.
///
/// # Errors
///
/// Returns `GenerationError::Malformed` on any JSON or validation failure,
/// including an empty MCQ list.
pub(crate) fn parse_topic_quiz(text: &str) -> Result<QuizContent, GenerationError> {
    let dto: QuizDto = serde_json::from_str(strip_code_fences(text)).map_err(malformed)?;

    let mcqs = dto
        .mcqs
        .into_iter()
        .map(McqDto::into_mcq)
        .collect::<Result<Vec<_>, _>>()?;

    QuizContent::new(mcqs).map_err(malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_CONTENT: &str = r#"{
        "explanations": ["first", "second"],
        "questions": [
            {
                "question": "Q?",
                "options": ["A", "B", "C", "D"],
                "correct": 2,
                "explanation": "because C"
            }
        ],
        "examples": ["an example"],
        "keyTakeaways": ["remember this"]
    }"#;

    #[test]
    fn strips_json_fence_and_plain_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn parses_valid_subtopic_content() {
        let content = parse_subtopic_content(VALID_CONTENT).unwrap();
        assert_eq!(content.explanations().len(), 2);
        assert_eq!(content.questions().len(), 1);
        assert_eq!(content.key_takeaways(), ["remember this"]);
    }

    #[test]
    fn parses_fenced_subtopic_content() {
        let fenced = format!("```json\n{VALID_CONTENT}\n```");
        assert!(parse_subtopic_content(&fenced).is_ok());
    }

    #[test]
    fn rejects_objects_where_strings_were_demanded() {
        let payload = r#"{
            "explanations": [{"explanation": "wrapped in an object"}],
            "questions": []
        }"#;
        let err = parse_subtopic_content(payload).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn rejects_empty_explanations() {
        let payload = r#"{"explanations": [], "questions": []}"#;
        let err = parse_subtopic_content(payload).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn rejects_out_of_range_correct_index() {
        let payload = r#"{
            "explanations": ["e"],
            "questions": [
                {"question": "Q?", "options": ["A", "B", "C", "D"], "correct": 4}
            ]
        }"#;
        let err = parse_subtopic_content(payload).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn rejects_wrong_option_count() {
        let payload = r#"{"mcqs": [{"question": "Q?", "options": ["A", "B"], "correct": 0}]}"#;
        let err = parse_topic_quiz(payload).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn rejects_empty_quiz() {
        let err = parse_topic_quiz(r#"{"mcqs": []}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn parses_valid_outline() {
        let payload = r#"{
            "courseTitle": "Learn Rust",
            "courseDescription": "From zero to ownership",
            "totalDuration": "6-8 hours",
            "difficulty": "beginner",
            "tags": ["rust", "systems"],
            "topics": [
                {
                    "topic": "Basics",
                    "description": "The fundamentals",
                    "duration": "2 hours",
                    "subtopics": [
                        {
                            "name": "Variables",
                            "description": "Bindings and mutability",
                            "estimatedDuration": "30 minutes"
                        }
                    ]
                }
            ]
        }"#;
        let outline = parse_outline(payload).unwrap();
        assert_eq!(outline.title(), "Learn Rust");
        assert_eq!(outline.topics().len(), 1);
        assert_eq!(outline.topics()[0].subtopics()[0].name(), "Variables");
    }

    #[test]
    fn rejects_unknown_difficulty() {
        let payload = r#"{
            "courseTitle": "T",
            "difficulty": "expert",
            "topics": [
                {"topic": "A", "description": "d", "subtopics": [
                    {"name": "S", "description": "d"}
                ]}
            ]
        }"#;
        let err = parse_outline(payload).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn rejects_outline_without_topics() {
        let err = parse_outline(r#"{"courseTitle": "T", "topics": []}"#).unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }
}
