// src/session/gateway.rs

use async_trait::async_trait;

use crate::{
    client::ClientError,
    models::{
        question::PublicQuestion,
        quiz::Quiz,
        result::{SubmitQuizRequest, SubmitQuizResponse},
    },
};

/// Where a session loads its quiz and questions from.
#[async_trait]
pub trait QuizSource: Send + Sync {
    async fn fetch_quiz(&self, quiz_id: i64) -> Result<Quiz, ClientError>;

    async fn fetch_questions(&self, quiz_id: i64) -> Result<Vec<PublicQuestion>, ClientError>;
}

/// Scoring endpoint a session submits its ledger to.
#[async_trait]
pub trait SubmissionGateway: Send + Sync {
    async fn submit(
        &self,
        quiz_id: i64,
        request: &SubmitQuizRequest,
    ) -> Result<SubmitQuizResponse, ClientError>;
}
