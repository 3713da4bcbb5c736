// src/session/mod.rs

//! Client-held quiz-taking session.
//!
//! `QuizSession` is the synchronous state machine (`NotStarted -> InProgress -> Completed`).
//! `SessionContext` shares one session between callers, runs the countdown ticker and
//! performs submissions through a `SubmissionGateway`.

pub mod context;
pub mod controller;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod loader;
pub mod timer;

pub use context::SessionContext;
pub use controller::{
    Navigation, QuizSession, SessionPhase, SessionSnapshot, SubmissionTicket, SubmitTrigger,
    TickOutcome,
};
pub use error::SessionError;
pub use gateway::{QuizSource, SubmissionGateway};
pub use ledger::AnswerLedger;
pub use loader::{LoadedQuestions, load_questions};
pub use timer::{Countdown, Ticker};
