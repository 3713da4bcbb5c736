// src/session/ledger.rs

use std::collections::HashMap;

use crate::models::result::UserAnswer;

/// Ordered mapping question id -> selected option for one session.
///
/// Holds exactly one entry per question id; order follows insertion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerLedger {
    entries: Vec<UserAnswer>,
    index: HashMap<i64, usize>,
}

impl AnswerLedger {
    /// Builds a blank ledger. Repeated ids keep their first position.
    pub fn with_questions(question_ids: impl IntoIterator<Item = i64>) -> Self {
        let mut ledger = Self::default();
        for question_id in question_ids {
            if ledger.index.contains_key(&question_id) {
                continue;
            }
            ledger.index.insert(question_id, ledger.entries.len());
            ledger.entries.push(UserAnswer::blank(question_id));
        }
        ledger
    }

    /// Replaces the answer for `question_id`.
    ///
    /// Returns `false` and leaves the ledger untouched when the question is not part of it.
    pub fn record_answer(&mut self, question_id: i64, answer_id: Option<i64>) -> bool {
        match self.index.get(&question_id) {
            Some(&position) => {
                self.entries[position].answer_id = answer_id;
                true
            }
            None => {
                tracing::debug!(question_id, "answer for unknown question ignored");
                false
            }
        }
    }

    /// Recorded option, `None` when unanswered or unknown.
    pub fn answer_for(&self, question_id: i64) -> Option<i64> {
        self.index
            .get(&question_id)
            .and_then(|&position| self.entries[position].answer_id)
    }

    pub fn contains(&self, question_id: i64) -> bool {
        self.index.contains_key(&question_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.entries.iter().filter(|e| e.answer_id.is_some()).count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.len() - self.answered_count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserAnswer> {
        self.entries.iter()
    }

    /// Snapshot in wire form.
    pub fn to_answers(&self) -> Vec<UserAnswer> {
        self.entries.clone()
    }
}
