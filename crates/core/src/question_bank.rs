//! Static mapping from class to question set.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::model::{ClassId, IdError, QuestionDraft, QuestionError, QuestionSet};

const BUILTIN_QUESTIONS: &str = include_str!("../data/builtin_questions.json");

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionBankError {
    #[error("question table is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid class key {key:?}: {source}")]
    ClassKey {
        key: String,
        #[source]
        source: IdError,
    },

    #[error("class {class}: {source}")]
    Class {
        class: ClassId,
        #[source]
        source: QuestionError,
    },
}

/// Read-only question table keyed by class.
///
/// Classes without an entry have no quiz.
#[derive(Debug, Clone, Default)]
pub struct QuestionBank {
    sets: HashMap<ClassId, QuestionSet>,
}

impl QuestionBank {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample questions shipped with the application.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` if the embedded table fails validation.
    pub fn builtin() -> Result<Self, QuestionBankError> {
        Self::from_json_str(BUILTIN_QUESTIONS)
    }

    /// Parse a table of the form `{ "<class>": [ { "question", "options", "answer" } ] }`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionBankError` for malformed JSON, an unknown class key,
    /// or an invalid question.
    pub fn from_json_str(raw: &str) -> Result<Self, QuestionBankError> {
        let doc: BTreeMap<String, Vec<QuestionDraft>> = serde_json::from_str(raw)?;
        let mut bank = Self::new();
        for (key, drafts) in doc {
            let class: ClassId = key
                .parse()
                .map_err(|source| QuestionBankError::ClassKey {
                    key: key.clone(),
                    source,
                })?;
            let set = QuestionSet::from_drafts(drafts)
                .map_err(|source| QuestionBankError::Class { class, source })?;
            bank.insert(class, set);
        }
        Ok(bank)
    }

    /// Add or replace the set for `class`.
    pub fn insert(&mut self, class: ClassId, set: QuestionSet) {
        self.sets.insert(class, set);
    }

    #[must_use]
    pub fn get(&self, class: ClassId) -> Option<&QuestionSet> {
        self.sets.get(&class)
    }

    /// Classes that have a quiz, in ascending order.
    #[must_use]
    pub fn classes(&self) -> Vec<ClassId> {
        let mut classes: Vec<_> = self.sets.keys().copied().collect();
        classes.sort_unstable();
        classes
    }
}
