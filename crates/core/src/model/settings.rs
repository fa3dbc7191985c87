use thiserror::Error;

/// Questions shown per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 5;
/// Countdown length used when the timer is enabled without an explicit limit.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 100;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("page size must be > 0")]
    InvalidPageSize,

    #[error("time limit must be > 0 seconds when the timer is enabled")]
    InvalidTimeLimit,

    #[error("roll number minimum length ({min}) exceeds maximum ({max})")]
    InvalidRollLengthBounds { min: usize, max: usize },
}

//
// ─── QUIZ SETTINGS ─────────────────────────────────────────────────────────────
//

/// Knobs for a quiz session: timed or untimed, page size, and whether the
/// stored result carries a submission timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizSettings {
    enable_timer: bool,
    time_limit_secs: u32,
    page_size: usize,
    record_timestamp: bool,
}

impl QuizSettings {
    /// # Errors
    ///
    /// Returns `SettingsError` if the page size is zero or the timer is enabled
    /// with a zero time limit.
    pub fn new(
        enable_timer: bool,
        time_limit_secs: u32,
        page_size: usize,
        record_timestamp: bool,
    ) -> Result<Self, SettingsError> {
        if page_size == 0 {
            return Err(SettingsError::InvalidPageSize);
        }
        if enable_timer && time_limit_secs == 0 {
            return Err(SettingsError::InvalidTimeLimit);
        }
        Ok(Self {
            enable_timer,
            time_limit_secs,
            page_size,
            record_timestamp,
        })
    }

    /// Timed variant with the given limit and default paging.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidTimeLimit` for a zero limit.
    pub fn timed(time_limit_secs: u32) -> Result<Self, SettingsError> {
        Self::new(true, time_limit_secs, DEFAULT_PAGE_SIZE, false)
    }

    #[must_use]
    pub fn with_record_timestamp(mut self, record_timestamp: bool) -> Self {
        self.record_timestamp = record_timestamp;
        self
    }

    #[must_use]
    pub fn enable_timer(&self) -> bool {
        self.enable_timer
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_secs
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn record_timestamp(&self) -> bool {
        self.record_timestamp
    }
}

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            enable_timer: false,
            time_limit_secs: DEFAULT_TIME_LIMIT_SECS,
            page_size: DEFAULT_PAGE_SIZE,
            record_timestamp: false,
        }
    }
}

//
// ─── ROLL NUMBER RULE ──────────────────────────────────────────────────────────
//

/// Intake-side format constraint for roll numbers.
///
/// The quiz session only requires a non-empty roll number; deployments pick
/// their own length (5 or 8 digits have both been used) through this rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RollNumberRule {
    min_len: Option<usize>,
    max_len: Option<usize>,
    digits_only: bool,
}

impl RollNumberRule {
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidRollLengthBounds` if `min_len > max_len`.
    pub fn new(
        min_len: Option<usize>,
        max_len: Option<usize>,
        digits_only: bool,
    ) -> Result<Self, SettingsError> {
        if let (Some(min), Some(max)) = (min_len, max_len) {
            if min > max {
                return Err(SettingsError::InvalidRollLengthBounds { min, max });
            }
        }
        Ok(Self {
            min_len,
            max_len,
            digits_only,
        })
    }

    /// Accepts any non-empty roll number.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    /// Exactly `len` ASCII digits.
    #[must_use]
    pub fn exact_digits(len: usize) -> Self {
        Self {
            min_len: Some(len),
            max_len: Some(len),
            digits_only: true,
        }
    }

    #[must_use]
    pub fn accepts(&self, roll: &str) -> bool {
        let len = roll.chars().count();
        if self.min_len.is_some_and(|min| len < min) {
            return false;
        }
        if self.max_len.is_some_and(|max| len > max) {
            return false;
        }
        !self.digits_only || roll.chars().all(|c| c.is_ascii_digit())
    }

    /// Human-readable summary used in validation messages.
    #[must_use]
    pub fn describe(&self) -> String {
        let kind = if self.digits_only { "digits" } else { "characters" };
        match (self.min_len, self.max_len) {
            (Some(min), Some(max)) if min == max => format!("exactly {min} {kind}"),
            (Some(min), Some(max)) => format!("between {min} and {max} {kind}"),
            (Some(min), None) => format!("at least {min} {kind}"),
            (None, Some(max)) => format!("at most {max} {kind}"),
            (None, None) if self.digits_only => "digits only".to_owned(),
            (None, None) => "non-empty".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_untimed_pages_of_five() {
        let settings = QuizSettings::default();
        assert!(!settings.enable_timer());
        assert_eq!(settings.page_size(), 5);
        assert_eq!(settings.time_limit_secs(), 100);
        assert!(!settings.record_timestamp());
    }

    #[test]
    fn rejects_zero_page_size_and_zero_timer() {
        assert_eq!(
            QuizSettings::new(false, 100, 0, false),
            Err(SettingsError::InvalidPageSize)
        );
        assert_eq!(QuizSettings::timed(0), Err(SettingsError::InvalidTimeLimit));
        // A zero limit is irrelevant while the timer is off.
        assert!(QuizSettings::new(false, 0, 5, false).is_ok());
    }

    #[test]
    fn roll_rule_bounds() {
        let rule = RollNumberRule::new(Some(5), Some(8), true).unwrap();
        assert!(rule.accepts("12345"));
        assert!(rule.accepts("12345678"));
        assert!(!rule.accepts("1234"));
        assert!(!rule.accepts("123456789"));
        assert!(!rule.accepts("12a45"));
        assert_eq!(rule.describe(), "between 5 and 8 digits");

        assert_eq!(
            RollNumberRule::new(Some(9), Some(8), false),
            Err(SettingsError::InvalidRollLengthBounds { min: 9, max: 8 })
        );
    }

    #[test]
    fn exact_digits_description() {
        assert_eq!(RollNumberRule::exact_digits(8).describe(), "exactly 8 digits");
        assert_eq!(RollNumberRule::any().describe(), "non-empty");
        assert!(RollNumberRule::any().accepts("R-12"));
    }
}
