#![forbid(unsafe_code)]

pub mod ai;
pub mod checkpoint;
pub mod course_service;
pub mod error;
pub mod generation;
pub mod materialize;
pub mod session_loop;

pub use mentor_core::Clock;

pub use ai::{GenAiClient, GenAiConfig};
pub use checkpoint::CheckpointDebouncer;
pub use course_service::CourseService;
pub use error::{CourseServiceError, GenerationError, MaterializeError, SessionLoopError};
pub use generation::{
    GenAiGenerationService, GenerationService, OutlineRequest, SubtopicContentRequest,
    TopicQuizRequest,
};
pub use materialize::MaterializeService;
pub use session_loop::{AnswerOutcome, LearningSession, SessionLoopService, SessionView};
