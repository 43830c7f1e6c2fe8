use thiserror::Error;

use crate::model::{CourseError, McqError};
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Mcq(#[from] McqError),
    #[error(transparent)]
    Session(#[from] SessionError),
}
