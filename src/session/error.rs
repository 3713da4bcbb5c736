// src/session/error.rs

use thiserror::Error;

use crate::client::ClientError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no quiz is active")]
    NoActiveQuiz,

    #[error("no questions are loaded for this quiz")]
    NoQuestions,

    #[error("the session has already started")]
    AlreadyStarted,

    #[error("the session is not in progress")]
    NotInProgress,

    #[error("a submission is already in flight")]
    SubmissionInFlight,

    /// Armed confirmation: submitting again proceeds.
    #[error("{count} question(s) unanswered, submit again to confirm")]
    UnansweredQuestions { count: usize },

    #[error("failed to load quiz: {0}")]
    Load(ClientError),

    #[error("submission failed: {0}")]
    Submission(ClientError),
}
