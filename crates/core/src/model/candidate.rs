use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ClassId, IdError, RollNumber};
use crate::model::settings::RollNumberRule;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandidateError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("roll number must be {expected}")]
    RollNumberFormat { expected: String },

    #[error(transparent)]
    Id(#[from] IdError),
}

/// Identity captured at intake and handed to the quiz session through the
/// local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredCandidate")]
pub struct Candidate {
    name: String,
    #[serde(rename = "roll")]
    roll_number: RollNumber,
    #[serde(rename = "className")]
    class_id: ClassId,
}

impl Candidate {
    /// Builds a candidate from already-validated parts.
    ///
    /// # Errors
    ///
    /// Returns `CandidateError::EmptyName` if the trimmed name is empty.
    pub fn new(
        name: impl Into<String>,
        roll_number: RollNumber,
        class_id: ClassId,
    ) -> Result<Self, CandidateError> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            return Err(CandidateError::EmptyName);
        }
        Ok(Self {
            name,
            roll_number,
            class_id,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn roll_number(&self) -> &RollNumber {
        &self.roll_number
    }

    #[must_use]
    pub fn class_id(&self) -> ClassId {
        self.class_id
    }
}

/// Wire shape read back from the local store; re-validated on load.
#[derive(Deserialize)]
struct StoredCandidate {
    name: String,
    roll: RollNumber,
    #[serde(rename = "className")]
    class_name: ClassId,
}

impl TryFrom<StoredCandidate> for Candidate {
    type Error = CandidateError;

    fn try_from(raw: StoredCandidate) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.roll, raw.class_name)
    }
}

/// Raw intake form input, before validation.
#[derive(Debug, Clone, Default)]
pub struct CandidateDraft {
    pub name: String,
    pub roll: String,
    pub class: String,
}

impl CandidateDraft {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        roll: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            roll: roll.into(),
            class: class.into(),
        }
    }

    /// Validate the draft against the intake's roll-number rule.
    ///
    /// # Errors
    ///
    /// Returns `CandidateError` for an empty name, a roll number violating
    /// `rule`, or a class outside the offered range.
    pub fn validate(self, rule: &RollNumberRule) -> Result<Candidate, CandidateError> {
        let roll_number = RollNumber::new(self.roll)?;
        if !rule.accepts(roll_number.as_str()) {
            return Err(CandidateError::RollNumberFormat {
                expected: rule.describe(),
            });
        }
        let class_id: ClassId = self.class.parse()?;
        Candidate::new(self.name, roll_number, class_id)
    }
}
