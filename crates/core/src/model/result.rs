use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::candidate::Candidate;
use crate::model::ids::{ClassId, ResultId, RollNumber};

/// Persisted outcome of one completed attempt.
///
/// At most one record is expected per `(class_id, roll_number)`; the quiz
/// session checks for an existing record before writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub class_id: ClassId,
    pub name: String,
    pub roll_number: RollNumber,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ResultRecord {
    #[must_use]
    pub fn for_candidate(
        candidate: &Candidate,
        score: u32,
        submitted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            class_id: candidate.class_id(),
            name: candidate.name().to_owned(),
            roll_number: candidate.roll_number().clone(),
            score,
            submitted_at,
        }
    }
}

/// A result together with the identifier the store assigned to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub id: ResultId,
    pub record: ResultRecord,
}

impl StoredResult {
    #[must_use]
    pub fn new(id: ResultId, record: ResultRecord) -> Self {
        Self { id, record }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::candidate::CandidateDraft;
    use crate::model::settings::RollNumberRule;
    use crate::time::fixed_now;

    #[test]
    fn built_from_candidate() {
        let candidate = CandidateDraft::new("Ravi", "00012345", "4")
            .validate(&RollNumberRule::any())
            .unwrap();
        let record = ResultRecord::for_candidate(&candidate, 7, Some(fixed_now()));
        assert_eq!(record.class_id.value(), 4);
        assert_eq!(record.name, "Ravi");
        assert_eq!(record.roll_number.as_str(), "00012345");
        assert_eq!(record.score, 7);
        assert_eq!(record.submitted_at, Some(fixed_now()));
    }

    #[test]
    fn timestamp_is_omitted_when_absent() {
        let candidate = CandidateDraft::new("Ravi", "1", "4")
            .validate(&RollNumberRule::any())
            .unwrap();
        let record = ResultRecord::for_candidate(&candidate, 2, None);
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("submitted_at").is_none());
    }
}
