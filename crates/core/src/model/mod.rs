mod checkpoint;
mod course;
mod ids;
mod mcq;

pub use checkpoint::{Checkpoint, Doubt};
pub use course::{
    Course, CourseError, CourseOutline, Difficulty, Subtopic, SubtopicContent, Topic,
};
pub use ids::{CourseId, UserId};
pub use mcq::{Mcq, McqError, QuizContent};
