// src/session/context.rs

use std::{
    ops::ControlFlow,
    sync::{Arc, Weak},
};

use tokio::sync::{Mutex, watch};

use crate::{client::ApiClient, models::question::PublicQuestion};

use super::{
    controller::{Navigation, QuizSession, SessionSnapshot, SubmitTrigger, TickOutcome},
    error::SessionError,
    gateway::{QuizSource, SubmissionGateway},
    timer::{TICK_PERIOD, Ticker},
};

struct SessionState {
    session: QuizSession,
    /// Present while the countdown runs.
    ticker: Option<Ticker>,
}

struct Shared {
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
    source: Arc<dyn QuizSource>,
    gateway: Arc<dyn SubmissionGateway>,
    user_id: i64,
}

impl Shared {
    fn publish(&self, session: &QuizSession) {
        self.updates.send_replace(session.snapshot());
    }

    /// Runs one submission. The lock is released while the gateway call is pending.
    async fn submit(&self, trigger: SubmitTrigger) -> Result<Option<i64>, SessionError> {
        let ticket = {
            let mut state = self.state.lock().await;
            let ticket = state.session.prepare_submission(self.user_id, trigger)?;
            self.publish(&state.session);
            ticket
        };

        tracing::debug!(quiz_id = ticket.quiz_id, trigger = ?trigger, "submitting answers");
        let outcome = self.gateway.submit(ticket.quiz_id, &ticket.request).await;

        let mut state = self.state.lock().await;
        let result = state.session.complete_submission(ticket, outcome);
        if state.session.is_completed() {
            state.ticker = None;
        }
        self.publish(&state.session);
        result
    }
}

/// Shared handle to one quiz session.
///
/// Clones refer to the same session. Every mutation goes through a method here and
/// is published to `subscribe()` receivers. When the last clone is dropped the
/// countdown ticker is cancelled and pending submission responses are discarded.
#[derive(Clone)]
pub struct SessionContext {
    shared: Arc<Shared>,
}

impl SessionContext {
    pub fn new(
        source: Arc<dyn QuizSource>,
        gateway: Arc<dyn SubmissionGateway>,
        user_id: i64,
    ) -> Self {
        let session = QuizSession::new();
        let (updates, _) = watch::channel(session.snapshot());

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SessionState {
                    session,
                    ticker: None,
                }),
                updates,
                source,
                gateway,
                user_id,
            }),
        }
    }

    /// Uses one `ApiClient` for both loading and submitting.
    pub fn with_client(client: ApiClient, user_id: i64) -> Self {
        let client = Arc::new(client);
        Self::new(client.clone(), client, user_id)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.shared.state.lock().await.session.snapshot()
    }

    /// Fetches a quiz and its questions and makes it the active session.
    /// Whatever session was running before is torn down.
    ///
    /// Returns the number of questions loaded after deduplication.
    pub async fn open(&self, quiz_id: i64) -> Result<usize, SessionError> {
        let (quiz, questions) = tokio::try_join!(
            self.shared.source.fetch_quiz(quiz_id),
            self.shared.source.fetch_questions(quiz_id),
        )
        .map_err(SessionError::Load)?;

        let mut state = self.shared.state.lock().await;
        state.ticker = None;
        state.session.set_active_quiz(quiz);
        state.session.load_questions(questions)?;
        let loaded = state.session.questions().len();
        self.shared.publish(&state.session);
        Ok(loaded)
    }

    /// Starts the session and its countdown.
    pub async fn start(&self) -> Result<(), SessionError> {
        let mut state = self.shared.state.lock().await;
        state.session.start()?;
        state.ticker = Some(spawn_ticker(Arc::downgrade(&self.shared)));
        self.shared.publish(&state.session);
        Ok(())
    }

    pub async fn record_answer(&self, question_id: i64, answer_id: Option<i64>) -> bool {
        let mut state = self.shared.state.lock().await;
        let recorded = state.session.record_answer(question_id, answer_id);
        self.shared.publish(&state.session);
        recorded
    }

    pub async fn answer_for(&self, question_id: i64) -> Option<i64> {
        self.shared.state.lock().await.session.answer_for(question_id)
    }

    pub async fn current_question(&self) -> Option<PublicQuestion> {
        let mut state = self.shared.state.lock().await;
        state.session.current_question().cloned()
    }

    /// Moves to the next question; on the last one this submits instead.
    pub async fn next(&self) -> Result<Navigation, SessionError> {
        let navigation = {
            let mut state = self.shared.state.lock().await;
            let navigation = state.session.next();
            self.shared.publish(&state.session);
            navigation
        };

        if navigation == Navigation::SubmitRequested {
            self.submit().await?;
        }
        Ok(navigation)
    }

    pub async fn previous(&self) -> usize {
        let mut state = self.shared.state.lock().await;
        let index = state.session.previous();
        self.shared.publish(&state.session);
        index
    }

    pub async fn go_to(&self, index: usize) -> bool {
        let mut state = self.shared.state.lock().await;
        let moved = state.session.go_to(index);
        self.shared.publish(&state.session);
        moved
    }

    /// Explicit submission. Returns the result id once the session is completed.
    pub async fn submit(&self) -> Result<Option<i64>, SessionError> {
        self.shared.submit(SubmitTrigger::Explicit).await
    }

    /// Cancels the countdown and clears the session.
    pub async fn reset(&self) {
        let mut state = self.shared.state.lock().await;
        state.ticker = None;
        state.session.reset();
        self.shared.publish(&state.session);
    }
}

/// The ticker only holds a weak reference, so it never keeps a session alive.
fn spawn_ticker(shared: Weak<Shared>) -> Ticker {
    Ticker::spawn(TICK_PERIOD, move || {
        let shared = shared.clone();
        async move {
            let Some(shared) = shared.upgrade() else {
                return ControlFlow::Break(());
            };

            let outcome = {
                let mut state = shared.state.lock().await;
                let outcome = state.session.tick();
                shared.publish(&state.session);
                outcome
            };

            match outcome {
                TickOutcome::Running(_) => ControlFlow::Continue(()),
                TickOutcome::Idle => ControlFlow::Break(()),
                TickOutcome::Expired => {
                    // No retry: a failure (or an explicit submission already in flight)
                    // leaves the session running at zero until the user submits again.
                    if let Err(e) = shared.submit(SubmitTrigger::Timer).await {
                        tracing::warn!("forced submission not completed, waiting for an explicit submit: {}", e);
                    }
                    ControlFlow::Break(())
                }
            }
        }
    })
}
