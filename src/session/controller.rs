// src/session/controller.rs

use serde::Serialize;

use crate::{
    client::ClientError,
    models::{
        question::PublicQuestion,
        quiz::Quiz,
        result::{SubmitQuizRequest, SubmitQuizResponse},
    },
};

use super::{error::SessionError, ledger::AnswerLedger, loader::load_questions, timer::Countdown};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SessionPhase {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

/// Result of `next()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(usize),
    /// `next()` was called on the last question of a running session.
    SubmitRequested,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to count: not running, or already at zero.
    Idle,
    Running(u32),
    /// This tick reached zero; a forced submission is due.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Explicit,
    Timer,
}

/// A submission handed out by `prepare_submission`, settled by `complete_submission`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTicket {
    generation: u64,
    pub quiz_id: i64,
    pub trigger: SubmitTrigger,
    pub request: SubmitQuizRequest,
}

/// Read-only view of a session, published to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub quiz_id: Option<i64>,
    pub current_index: usize,
    pub question_count: usize,
    pub answered_count: usize,
    pub seconds_remaining: u32,
    pub submitting: bool,
    pub result_id: Option<i64>,
}

/// State machine for one quiz-taking attempt.
///
/// `generation` survives `reset()` so that tickets issued before a reset are recognized as stale.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    quiz: Option<Quiz>,
    questions: Vec<PublicQuestion>,
    ledger: AnswerLedger,
    current: usize,
    countdown: Countdown,
    phase: SessionPhase,
    submitting: bool,
    confirm_unanswered: bool,
    result_id: Option<i64>,
    generation: u64,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field back to its initial value.
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation.wrapping_add(1),
            ..Self::default()
        };
    }

    /// Makes `quiz` the active quiz and seeds the countdown from its time limit.
    /// Any previous session state is discarded.
    pub fn set_active_quiz(&mut self, quiz: Quiz) {
        self.reset();
        let minutes = u32::try_from(quiz.time_limit).unwrap_or(0);
        self.countdown = Countdown::from_minutes(minutes);
        tracing::debug!(quiz_id = quiz.id, seconds = self.countdown.remaining(), "quiz activated");
        self.quiz = Some(quiz);
    }

    /// Replaces the question list with a deduplicated copy of `raw` and a blank ledger.
    ///
    /// Returns the number of duplicates removed.
    pub fn load_questions(&mut self, raw: Vec<PublicQuestion>) -> Result<usize, SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        let loaded = load_questions(raw);
        self.questions = loaded.questions;
        self.ledger = loaded.ledger;
        self.current = 0;
        self.confirm_unanswered = false;
        Ok(loaded.duplicates_removed)
    }

    /// `NotStarted -> InProgress`. Requires an active quiz with at least one question.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != SessionPhase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }
        if self.quiz.is_none() {
            return Err(SessionError::NoActiveQuiz);
        }
        if self.questions.is_empty() {
            tracing::info!("start ignored: no questions loaded");
            return Err(SessionError::NoQuestions);
        }

        self.phase = SessionPhase::InProgress;
        self.current = 0;
        tracing::info!(
            quiz_id = ?self.quiz_id(),
            questions = self.questions.len(),
            seconds = self.countdown.remaining(),
            "session started"
        );
        Ok(())
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase != SessionPhase::NotStarted
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    pub fn quiz_id(&self) -> Option<i64> {
        self.quiz.as_ref().map(|quiz| quiz.id)
    }

    pub fn questions(&self) -> &[PublicQuestion] {
        &self.questions
    }

    pub fn ledger(&self) -> &AnswerLedger {
        &self.ledger
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.countdown.remaining()
    }

    pub fn result_id(&self) -> Option<i64> {
        self.result_id
    }

    /// Current question. A pointer outside the question list is reset to 0 first.
    pub fn current_question(&mut self) -> Option<&PublicQuestion> {
        self.heal_pointer();
        self.questions.get(self.current)
    }

    /// Restores a previously saved pointer, e.g. after a reload.
    /// An index that no longer points at a question falls back to 0.
    pub fn restore_position(&mut self, index: usize) {
        self.current = index;
        self.heal_pointer();
    }

    fn heal_pointer(&mut self) {
        if self.current != 0 && self.current >= self.questions.len() {
            tracing::warn!(
                index = self.current,
                questions = self.questions.len(),
                "stale question pointer reset to 0"
            );
            self.current = 0;
        }
    }

    /// Records an answer while the session is running.
    ///
    /// Returns `false` when the session is not running or the question is not in the ledger.
    pub fn record_answer(&mut self, question_id: i64, answer_id: Option<i64>) -> bool {
        if self.phase != SessionPhase::InProgress {
            tracing::debug!(question_id, phase = ?self.phase, "answer ignored outside a running session");
            return false;
        }

        let recorded = self.ledger.record_answer(question_id, answer_id);
        if recorded {
            self.confirm_unanswered = false;
        }
        recorded
    }

    pub fn answer_for(&self, question_id: i64) -> Option<i64> {
        self.ledger.answer_for(question_id)
    }

    /// Advances the pointer. On the last question of a running session it requests submission instead.
    pub fn next(&mut self) -> Navigation {
        self.heal_pointer();

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            Navigation::Moved(self.current)
        } else if self.phase == SessionPhase::InProgress {
            Navigation::SubmitRequested
        } else {
            Navigation::Moved(self.current)
        }
    }

    /// Moves the pointer back; stays at 0.
    pub fn previous(&mut self) -> usize {
        self.heal_pointer();
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// Jumps to `index` if it points at a question.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index < self.questions.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Advances the countdown by one second while running.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != SessionPhase::InProgress || self.countdown.is_expired() {
            return TickOutcome::Idle;
        }

        if self.countdown.decrement() {
            tracing::info!(quiz_id = ?self.quiz_id(), "time is up, forcing submission");
            TickOutcome::Expired
        } else {
            TickOutcome::Running(self.countdown.remaining())
        }
    }

    /// Checks the submission preconditions and marks a submission as in flight.
    ///
    /// An explicit submission with unanswered questions fails once with
    /// `UnansweredQuestions`; the next explicit attempt goes through unless the
    /// ledger changed in between. Timer submissions never ask for confirmation.
    pub fn prepare_submission(
        &mut self,
        user_id: i64,
        trigger: SubmitTrigger,
    ) -> Result<SubmissionTicket, SessionError> {
        if self.phase != SessionPhase::InProgress {
            return Err(SessionError::NotInProgress);
        }
        let quiz_id = self.quiz_id().ok_or(SessionError::NoActiveQuiz)?;
        if self.questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        if self.submitting {
            return Err(SessionError::SubmissionInFlight);
        }

        let unanswered = self.ledger.unanswered_count();
        if trigger == SubmitTrigger::Explicit && unanswered > 0 && !self.confirm_unanswered {
            self.confirm_unanswered = true;
            return Err(SessionError::UnansweredQuestions { count: unanswered });
        }

        self.submitting = true;
        self.confirm_unanswered = false;

        Ok(SubmissionTicket {
            generation: self.generation,
            quiz_id,
            trigger,
            request: SubmitQuizRequest {
                user_id,
                answers: self.ledger.to_answers(),
                time_taken: Some(i32::try_from(self.countdown.elapsed()).unwrap_or(i32::MAX)),
            },
        })
    }

    /// Applies the gateway's outcome for `ticket`.
    ///
    /// Success completes the session and yields the result id. Failure leaves it running.
    /// Tickets from before a `reset()` are ignored and yield `Ok(None)`.
    pub fn complete_submission(
        &mut self,
        ticket: SubmissionTicket,
        outcome: Result<SubmitQuizResponse, ClientError>,
    ) -> Result<Option<i64>, SessionError> {
        if ticket.generation != self.generation {
            tracing::debug!(quiz_id = ticket.quiz_id, "submission response for a torn-down session dropped");
            return Ok(None);
        }

        self.submitting = false;

        match outcome {
            Ok(response) => {
                self.phase = SessionPhase::Completed;
                self.result_id = Some(response.result_id);
                tracing::info!(
                    quiz_id = ticket.quiz_id,
                    result_id = response.result_id,
                    score = response.score,
                    trigger = ?ticket.trigger,
                    "session completed"
                );
                Ok(Some(response.result_id))
            }
            Err(e) => {
                tracing::warn!(quiz_id = ticket.quiz_id, "submission failed: {}", e);
                Err(SessionError::Submission(e))
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            quiz_id: self.quiz_id(),
            current_index: self.current,
            question_count: self.questions.len(),
            answered_count: self.ledger.answered_count(),
            seconds_remaining: self.countdown.remaining(),
            submitting: self.submitting,
            result_id: self.result_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(time_limit: i32) -> Quiz {
        Quiz {
            id: 7,
            owner_id: Some(1),
            title: "Rust basics".to_string(),
            description: String::new(),
            category: "programming".to_string(),
            difficulty: "easy".to_string(),
            question_count: 3,
            time_limit,
            is_active: true,
            completion_rate: 0.0,
            participant_count: 0,
            created_at: None,
        }
    }

    fn question(id: i64) -> PublicQuestion {
        PublicQuestion {
            id,
            quiz_id: Some(7),
            text: format!("Question {}", id),
            code_snippet: None,
            category: "programming".to_string(),
            difficulty: "easy".to_string(),
            options: Vec::new(),
        }
    }

    fn started_session(ids: &[i64]) -> QuizSession {
        let mut session = QuizSession::new();
        session.set_active_quiz(quiz(1));
        session
            .load_questions(ids.iter().map(|&id| question(id)).collect())
            .unwrap();
        session.start().unwrap();
        session
    }

    fn accepted(result_id: i64) -> Result<SubmitQuizResponse, ClientError> {
        Ok(SubmitQuizResponse {
            result_id,
            score: 1,
            total_questions: 2,
        })
    }

    fn rejected() -> Result<SubmitQuizResponse, ClientError> {
        Err(ClientError::Server {
            status: 500,
            message: "boom".to_string(),
        })
    }

    #[test]
    fn test_time_limit_seeds_countdown() {
        let mut session = QuizSession::new();
        session.set_active_quiz(quiz(1));
        assert_eq!(session.seconds_remaining(), 60);
    }

    #[test]
    fn test_start_without_questions_is_noop() {
        let mut session = QuizSession::new();
        session.set_active_quiz(quiz(1));

        assert!(matches!(session.start(), Err(SessionError::NoQuestions)));
        assert!(!session.is_started());
        assert_eq!(session.phase(), SessionPhase::NotStarted);
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut session = started_session(&[1]);
        assert!(matches!(session.start(), Err(SessionError::AlreadyStarted)));
    }

    #[test]
    fn test_load_deduplicates() {
        let mut session = QuizSession::new();
        session.set_active_quiz(quiz(1));
        let removed = session
            .load_questions(vec![question(1), question(2), question(1)])
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(session.questions().len(), 2);
        assert_eq!(session.ledger().len(), 2);
    }

    #[test]
    fn test_load_after_start_rejected() {
        let mut session = started_session(&[1]);
        assert!(matches!(
            session.load_questions(vec![question(9)]),
            Err(SessionError::AlreadyStarted)
        ));
        assert_eq!(session.questions().len(), 1);
    }

    #[test]
    fn test_answers_only_while_running() {
        let mut session = QuizSession::new();
        session.set_active_quiz(quiz(1));
        session.load_questions(vec![question(1)]).unwrap();
        assert!(!session.record_answer(1, Some(10)));

        session.start().unwrap();
        assert!(session.record_answer(1, Some(10)));
        assert_eq!(session.answer_for(1), Some(10));
        assert!(!session.record_answer(2, Some(20)));
    }

    #[test]
    fn test_navigation_bounds() {
        let mut session = started_session(&[1, 2, 3]);

        assert_eq!(session.previous(), 0);
        assert_eq!(session.next(), Navigation::Moved(1));
        assert_eq!(session.next(), Navigation::Moved(2));
        assert_eq!(session.next(), Navigation::SubmitRequested);
        assert_eq!(session.current_index(), 2);
        assert_eq!(session.previous(), 1);
    }

    #[test]
    fn test_go_to_rejects_out_of_range() {
        let mut session = started_session(&[1, 2]);
        assert!(session.go_to(1));
        assert!(!session.go_to(2));
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn test_stale_pointer_resets_to_zero() {
        let mut session = started_session(&[1, 2]);
        session.restore_position(5);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_question().map(|q| q.id), Some(1));

        session.restore_position(1);
        assert_eq!(session.current_question().map(|q| q.id), Some(2));
    }

    #[test]
    fn test_tick_expires_exactly_once() {
        let mut session = started_session(&[1]);
        let mut expirations = 0;

        for _ in 0..60 {
            if session.tick() == TickOutcome::Expired {
                expirations += 1;
            }
        }
        assert_eq!(session.seconds_remaining(), 0);
        assert_eq!(expirations, 1);

        for _ in 0..5 {
            assert_eq!(session.tick(), TickOutcome::Idle);
        }
        assert_eq!(session.seconds_remaining(), 0);
    }

    #[test]
    fn test_tick_idle_before_start() {
        let mut session = QuizSession::new();
        session.set_active_quiz(quiz(1));
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.seconds_remaining(), 60);
    }

    #[test]
    fn test_submit_requires_running_session() {
        let mut session = QuizSession::new();
        assert!(matches!(
            session.prepare_submission(1, SubmitTrigger::Explicit),
            Err(SessionError::NotInProgress)
        ));
    }

    #[test]
    fn test_unanswered_requires_confirmation() {
        let mut session = started_session(&[1, 2]);
        session.record_answer(1, Some(10));

        assert!(matches!(
            session.prepare_submission(1, SubmitTrigger::Explicit),
            Err(SessionError::UnansweredQuestions { count: 1 })
        ));
        assert!(!session.is_submitting());

        let ticket = session.prepare_submission(1, SubmitTrigger::Explicit).unwrap();
        assert_eq!(ticket.request.answers.len(), 2);
        assert_eq!(ticket.request.user_id, 1);
        assert_eq!(ticket.quiz_id, 7);
    }

    #[test]
    fn test_ledger_change_rearms_confirmation() {
        let mut session = started_session(&[1, 2]);

        assert!(session.prepare_submission(1, SubmitTrigger::Explicit).is_err());
        session.record_answer(1, Some(10));
        assert!(matches!(
            session.prepare_submission(1, SubmitTrigger::Explicit),
            Err(SessionError::UnansweredQuestions { count: 1 })
        ));
    }

    #[test]
    fn test_timer_submission_skips_confirmation() {
        let mut session = started_session(&[1, 2]);
        assert!(session.prepare_submission(1, SubmitTrigger::Timer).is_ok());
    }

    #[test]
    fn test_second_submission_rejected_while_in_flight() {
        let mut session = started_session(&[1]);
        session.record_answer(1, Some(10));

        let ticket = session.prepare_submission(1, SubmitTrigger::Explicit).unwrap();
        assert!(matches!(
            session.prepare_submission(1, SubmitTrigger::Explicit),
            Err(SessionError::SubmissionInFlight)
        ));

        assert_eq!(session.complete_submission(ticket, accepted(99)).unwrap(), Some(99));
        assert_eq!(session.phase(), SessionPhase::Completed);
        assert_eq!(session.result_id(), Some(99));
    }

    #[test]
    fn test_failed_submission_keeps_session_running() {
        let mut session = started_session(&[1]);
        session.record_answer(1, Some(10));

        let ticket = session.prepare_submission(1, SubmitTrigger::Explicit).unwrap();
        assert!(matches!(
            session.complete_submission(ticket, rejected()),
            Err(SessionError::Submission(_))
        ));
        assert_eq!(session.phase(), SessionPhase::InProgress);
        assert!(!session.is_submitting());
        assert_eq!(session.answer_for(1), Some(10));

        let retry = session.prepare_submission(1, SubmitTrigger::Explicit).unwrap();
        assert!(session.complete_submission(retry, accepted(5)).is_ok());
        assert!(session.is_completed());
    }

    #[test]
    fn test_response_after_reset_is_ignored() {
        let mut session = started_session(&[1]);
        session.record_answer(1, Some(10));
        let ticket = session.prepare_submission(1, SubmitTrigger::Explicit).unwrap();

        session.reset();
        assert_eq!(session.complete_submission(ticket, accepted(3)).unwrap(), None);
        assert_eq!(session.phase(), SessionPhase::NotStarted);
        assert_eq!(session.result_id(), None);
    }

    #[test]
    fn test_completed_session_stays_completed() {
        let mut session = started_session(&[1]);
        session.record_answer(1, Some(10));
        let ticket = session.prepare_submission(1, SubmitTrigger::Explicit).unwrap();
        session.complete_submission(ticket, accepted(1)).unwrap();

        assert!(matches!(session.start(), Err(SessionError::AlreadyStarted)));
        assert!(matches!(
            session.prepare_submission(1, SubmitTrigger::Explicit),
            Err(SessionError::NotInProgress)
        ));
        assert_eq!(session.next(), Navigation::Moved(0));
        assert_eq!(session.tick(), TickOutcome::Idle);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = started_session(&[1, 2]);
        session.next();
        session.record_answer(1, Some(10));
        session.tick();

        session.reset();
        assert_eq!(session.snapshot(), SessionSnapshot::default());
        assert!(session.quiz().is_none());
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn test_time_taken_tracks_elapsed_seconds() {
        let mut session = started_session(&[1]);
        for _ in 0..12 {
            session.tick();
        }
        let ticket = session.prepare_submission(1, SubmitTrigger::Timer).unwrap();
        assert_eq!(ticket.request.time_taken, Some(12));
    }
}
