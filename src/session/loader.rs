// src/session/loader.rs

use std::collections::HashSet;

use crate::models::question::PublicQuestion;

use super::ledger::AnswerLedger;

/// Deduplicated questions plus the matching blank ledger.
#[derive(Debug, Clone, Default)]
pub struct LoadedQuestions {
    pub questions: Vec<PublicQuestion>,
    pub ledger: AnswerLedger,
    pub duplicates_removed: usize,
}

/// Drops repeated question ids, keeping the first occurrence and its position,
/// then builds one blank ledger entry per surviving question.
pub fn load_questions(raw: Vec<PublicQuestion>) -> LoadedQuestions {
    let total = raw.len();
    let mut seen = HashSet::with_capacity(total);

    let questions: Vec<PublicQuestion> = raw
        .into_iter()
        .filter(|question| seen.insert(question.id))
        .collect();

    let duplicates_removed = total - questions.len();
    if duplicates_removed > 0 {
        tracing::warn!(duplicates_removed, "duplicate questions removed on load");
    } else {
        tracing::debug!(count = questions.len(), "questions loaded");
    }

    let ledger = AnswerLedger::with_questions(questions.iter().map(|q| q.id));

    LoadedQuestions {
        questions,
        ledger,
        duplicates_removed,
    }
}
