//! Prompt builders for the generation endpoints.
//!
//! Every prompt that expects structured output spells out the exact JSON
//! shape and demands strings in arrays; the parser in `response` rejects
//! anything that drifts from it anyway.

use mentor_core::model::Difficulty;

const OUTLINE_SYSTEM: &str = "You are an expert mentor that creates comprehensive course \
outlines and syllabi. You must output content in strict JSON format. Create a well-structured \
learning syllabus with a clear course overview, a detailed topic breakdown with logical \
progression, subtopics with clear descriptions and learning goals, and duration and difficulty \
estimates. Do not generate detailed content yet; explanations and questions are generated \
separately per subtopic.";

const SUBTOPIC_SYSTEM: &str = "You are an expert mentor creating detailed learning content for \
a specific subtopic. You must output content in strict JSON format. Produce detailed \
explanations with practical examples, step-by-step processes where appropriate, practice \
questions for immediate understanding, and key takeaways. Make the content practical and \
appropriate for the user level.";

const QUIZ_SYSTEM: &str = "You are an expert mentor creating comprehensive quiz questions for a \
complete topic. You must output content in strict JSON format. Questions must test \
understanding of the entire topic, cover all important concepts from the subtopics, vary in \
difficulty, and carry clear explanations for the correct answers.";

const DOUBT_SYSTEM: &str = "You are a mentor helping students clarify their doubts. Provide \
clear, concise explanations based on the context provided. Answer in a conversational, \
encouraging tone. Keep your response focused and helpful.";

pub(crate) fn outline(topic: &str, situation: Option<&str>, level: Difficulty) -> String {
    let situation_line = situation.map_or_else(String::new, |s| format!("Situation: {s}\n"));
    format!(
        r#"{OUTLINE_SYSTEM}

User wants to learn: {topic}
{situation_line}Level: {level}

Generate a comprehensive course outline in JSON format:
{{
  "courseTitle": "Complete Course Title",
  "courseDescription": "Brief description of what students will learn and achieve",
  "totalDuration": "Estimated completion time (e.g., 6-8 hours)",
  "difficulty": "beginner|intermediate|advanced",
  "tags": ["tag1", "tag2", "tag3", "tag4", "tag5"],
  "topics": [
    {{
      "topic": "Topic Name",
      "description": "What this topic covers and why it matters for the learning goal",
      "duration": "Estimated time for this topic (e.g., 2 hours)",
      "subtopics": [
        {{
          "name": "Subtopic Name",
          "description": "Clear description of what will be learned in this subtopic",
          "estimatedDuration": "Time estimate (e.g., 30 minutes)"
        }}
      ]
    }}
  ]
}}

IMPORTANT REQUIREMENTS:
- Create 3-4 main topics with logical progression
- Each topic should have 2-4 subtopics
- Include realistic duration estimates
- Topics should build upon each other logically
- Match the user specified level and situation
- Tags should be relevant and comprehensive (5 tags)

Return ONLY valid JSON, no other text."#
    )
}

pub(crate) fn subtopic_content(
    course_title: &str,
    topic_title: &str,
    subtopic_title: &str,
    subtopic_description: &str,
    level: Difficulty,
) -> String {
    format!(
        r#"{SUBTOPIC_SYSTEM}

Course: {course_title}
Topic: {topic_title}
Subtopic: {subtopic_title}
Description: {subtopic_description}
User Level: {level}

Generate comprehensive content for this specific subtopic in JSON format:
{{
  "explanations": [
    "Clear explanation with context and definition",
    "Practical example or real-world analogy",
    "Technical details or step-by-step process",
    "Common applications or use cases",
    "Important notes, tips, or best practices",
    "Key takeaway or summary point"
  ],
  "questions": [
    {{
      "question": "Practice question testing immediate understanding",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correct": 1,
      "explanation": "Why this answer is correct"
    }}
  ],
  "examples": [
    "Concrete example 1",
    "Real-world scenario or application"
  ],
  "keyTakeaways": [
    "Most important point to remember",
    "Key concept or principle"
  ]
}}

IMPORTANT REQUIREMENTS:
- explanations MUST be an array of 6 STRINGS (not objects)
- Each explanation string should be self-contained and complete
- 2-3 practice MCQs for immediate understanding
- All MCQs have 4 meaningful options with exactly one correct answer
- MCQ correct answer is 0-indexed (0,1,2,3)
- 2-3 key takeaways that summarize the most important points
- ALL ARRAYS MUST CONTAIN STRINGS ONLY, NOT OBJECTS

Return ONLY valid JSON, no other text."#
    )
}

pub(crate) fn topic_quiz(
    course_title: &str,
    topic_title: &str,
    topic_description: &str,
    subtopic_names: &[String],
    level: Difficulty,
) -> String {
    let subtopics = subtopic_names.join(", ");
    format!(
        r#"{QUIZ_SYSTEM}

Course: {course_title}
Topic: {topic_title}
Topic Description: {topic_description}
Subtopics covered: {subtopics}
User Level: {level}

Generate comprehensive quiz questions for this entire topic in JSON format:
{{
  "mcqs": [
    {{
      "question": "Comprehensive question testing topic understanding",
      "options": ["Option A", "Option B", "Option C", "Option D"],
      "correct": 2,
      "explanation": "Detailed explanation of why this answer is correct"
    }}
  ]
}}

IMPORTANT REQUIREMENTS:
- Create 4-6 comprehensive quiz questions
- Questions should cover different subtopics and vary in difficulty
- All MCQs have 4 meaningful options with exactly one correct answer
- MCQ correct answer is 0-indexed (0,1,2,3)
- Include detailed explanations for correct answers
- Questions should assess mastery, not just recall
- Match the user specified level

Return ONLY valid JSON, no other text."#
    )
}

pub(crate) fn remediation(
    question: &str,
    correct_answer: &str,
    student_answer: &str,
    context: &[String],
) -> String {
    let context_text = context.join(" ");
    format!(
        "You are a helpful mentor providing personalized learning guidance.\n\n\
Context: {context_text}\n\n\
Question: {question}\n\
Correct Answer: {correct_answer}\n\
Student Answer: {student_answer}\n\n\
The student selected the wrong answer. Provide a brief, encouraging explanation that:\n\
1. Explains why their answer was incorrect (without being negative)\n\
2. Clarifies the correct concept\n\
3. Gives a helpful tip to remember this concept\n\
4. Encourages them to keep learning\n\n\
Keep the response to 2-3 sentences, friendly and supportive tone."
    )
}

pub(crate) fn doubt(question: &str, context: &[String]) -> String {
    let context_text = context.join(" ");
    format!(
        "{DOUBT_SYSTEM}\n\n\
The student is learning about this context:\n\
\"{context_text}\"\n\n\
Student doubt: \"{question}\"\n\n\
Please provide a clear, helpful explanation to resolve their doubt. Keep it concise but thorough."
    )
}
