use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Lowest class number offered at intake.
pub const MIN_CLASS: u8 = 1;
/// Highest class number offered at intake.
pub const MAX_CLASS: u8 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("class must be between {MIN_CLASS} and {MAX_CLASS}, got {0}")]
    ClassOutOfRange(i64),

    #[error("invalid class value: {0:?}")]
    InvalidClass(String),

    #[error("roll number cannot be empty")]
    EmptyRollNumber,

    #[error("invalid result id: {0:?}")]
    InvalidResultId(String),
}

/// Class (grade) a candidate belongs to. Selects the question set and the
/// per-class results table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct ClassId(u8);

impl ClassId {
    /// Creates a `ClassId`, rejecting values outside `1..=10`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::ClassOutOfRange` for values outside the offered classes.
    pub fn new(value: i64) -> Result<Self, IdError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (MIN_CLASS..=MAX_CLASS).contains(v))
            .map(Self)
            .ok_or(IdError::ClassOutOfRange(value))
    }

    /// Returns the underlying class number
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Iterates over every class offered at intake.
    pub fn all() -> impl Iterator<Item = ClassId> {
        (MIN_CLASS..=MAX_CLASS).map(Self)
    }
}

impl TryFrom<i64> for ClassId {
    type Error = IdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ClassId> for i64 {
    fn from(id: ClassId) -> Self {
        i64::from(id.0)
    }
}

impl FromStr for ClassId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| IdError::InvalidClass(trimmed.to_owned()))?;
        Self::new(value)
    }
}

/// Roll number identifying a candidate within a class.
///
/// Only non-emptiness is enforced here; length and digit rules belong to the
/// intake configuration.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RollNumber(String);

impl RollNumber {
    /// # Errors
    ///
    /// Returns `IdError::EmptyRollNumber` if the trimmed value is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyRollNumber);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RollNumber {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RollNumber> for String {
    fn from(roll: RollNumber) -> Self {
        roll.0
    }
}

/// Store-assigned identifier of a persisted result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultId(Uuid);

impl ResultId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl FromStr for ResultId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| IdError::InvalidResultId(s.to_owned()))
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Debug for RollNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RollNumber({})", self.0)
    }
}

impl fmt::Debug for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultId({})", self.0)
    }
}

// ─── Display Implementations ───────────────────────────────────────────────────

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RollNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
