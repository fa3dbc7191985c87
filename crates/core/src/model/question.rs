use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("option cannot be empty")]
    EmptyOption,

    #[error("correct answer {0:?} is not one of the options")]
    AnswerNotAnOption(String),

    #[error("question set cannot be empty")]
    EmptySet,

    #[error("question {index}: {source}")]
    AtIndex {
        index: usize,
        #[source]
        source: Box<QuestionError>,
    },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question with exactly one correct option.
///
/// The correct option is matched by value, not by position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionDraft")]
pub struct Question {
    #[serde(rename = "question")]
    text: String,
    options: Vec<String>,
    answer: String,
}

/// Unvalidated question shape as it appears in a question table document.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionDraft {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

impl TryFrom<QuestionDraft> for Question {
    type Error = QuestionError;

    fn try_from(draft: QuestionDraft) -> Result<Self, Self::Error> {
        Self::new(draft.question, draft.options, draft.answer)
    }
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError` if the text or an option is blank, fewer than
    /// two options are given, or `answer` is not among the options.
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        answer: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        let answer = answer.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        if options.iter().any(|opt| opt.trim().is_empty()) {
            return Err(QuestionError::EmptyOption);
        }
        if !options.contains(&answer) {
            return Err(QuestionError::AnswerNotAnOption(answer));
        }
        Ok(Self {
            text,
            options,
            answer,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn is_correct(&self, choice: &str) -> bool {
        self.answer == choice
    }
}

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

/// Ordered, non-empty list of questions for one class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Question>", into = "Vec<Question>")]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl TryFrom<Vec<Question>> for QuestionSet {
    type Error = QuestionError;

    fn try_from(questions: Vec<Question>) -> Result<Self, Self::Error> {
        Self::new(questions)
    }
}

impl From<QuestionSet> for Vec<Question> {
    fn from(set: QuestionSet) -> Self {
        set.questions
    }
}

impl QuestionSet {
    /// # Errors
    ///
    /// Returns `QuestionError::EmptySet` if `questions` is empty.
    pub fn new(questions: Vec<Question>) -> Result<Self, QuestionError> {
        if questions.is_empty() {
            return Err(QuestionError::EmptySet);
        }
        Ok(Self { questions })
    }

    /// Validate raw drafts, reporting the index of the first bad question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::AtIndex` wrapping the first failing question, or
    /// `QuestionError::EmptySet`.
    pub fn from_drafts(drafts: Vec<QuestionDraft>) -> Result<Self, QuestionError> {
        let questions = drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                Question::try_from(draft).map_err(|source| QuestionError::AtIndex {
                    index,
                    source: Box::new(source),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Number of pages of `page_size` questions: `ceil(len / page_size)`.
    #[must_use]
    pub fn page_count(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.questions.len().div_ceil(page_size)
    }

    /// Global index range covered by `page_index`. Empty past the last page.
    #[must_use]
    pub fn page_range(&self, page_index: usize, page_size: usize) -> Range<usize> {
        let start = page_index.saturating_mul(page_size).min(self.questions.len());
        let end = start.saturating_add(page_size).min(self.questions.len());
        start..end
    }

    /// Page on which the question at `index` is shown.
    #[must_use]
    pub fn page_of(&self, index: usize, page_size: usize) -> Option<usize> {
        (index < self.questions.len() && page_size > 0).then(|| index / page_size)
    }

    /// Count of answers that exactly equal the question's correct option.
    ///
    /// Missing answers and answers for unknown indices never count.
    #[must_use]
    pub fn score(&self, answers: &BTreeMap<usize, String>) -> u32 {
        let correct = self
            .questions
            .iter()
            .enumerate()
            .filter(|(idx, q)| answers.get(idx).is_some_and(|choice| q.is_correct(choice)))
            .count();
        u32::try_from(correct).unwrap_or(u32::MAX)
    }
}
