// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use super::quiz::validate_difficulty;

/// Option as sent to quiz takers (correctness flag excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

/// DTO for sending a question to the client, options included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub quiz_id: Option<i64>,
    pub text: String,
    pub code_snippet: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub options: Vec<PublicOption>,
}

/// One row of the `questions LEFT JOIN options` query.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionOptionRow {
    pub question_id: i64,
    pub quiz_id: Option<i64>,
    pub text: String,
    pub code_snippet: Option<String>,
    pub category: String,
    pub difficulty: String,
    pub option_id: Option<i64>,
    pub option_text: Option<String>,
}

/// Folds joined rows (ordered by question, then option) into public questions.
/// Consecutive rows of the same question are merged; order is preserved.
pub fn assemble_questions(rows: Vec<QuestionOptionRow>) -> Vec<PublicQuestion> {
    let mut questions: Vec<PublicQuestion> = Vec::new();

    for row in rows {
        let option = match (row.option_id, row.option_text) {
            (Some(id), Some(text)) => Some(PublicOption { id, text }),
            _ => None,
        };

        match questions.last_mut() {
            Some(last) if last.id == row.question_id => last.options.extend(option),
            _ => questions.push(PublicQuestion {
                id: row.question_id,
                quiz_id: row.quiz_id,
                text: row.text,
                code_snippet: row.code_snippet,
                category: row.category,
                difficulty: row.difficulty,
                options: option.into_iter().collect(),
            }),
        }
    }

    questions
}

/// DTO for one option of a new question.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOptionRequest {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub text: String,
    #[validate(length(max = 5000))]
    pub code_snippet: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<CreateOptionRequest>,
}

fn validate_options(options: &[CreateOptionRequest]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.text.is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_empty"));
        }
        if opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
