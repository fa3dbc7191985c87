use quiz_core::model::{ClassId, PageActions, RollNumber};

/// One question as shown on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView<'a> {
    /// Global 0-based index, used when recording an answer.
    pub index: usize,
    pub text: &'a str,
    pub options: &'a [String],
    pub selected: Option<&'a str>,
}

impl QuestionView<'_> {
    /// 1-based number for display.
    #[must_use]
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Everything a front end needs to render the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView<'a> {
    pub page_index: usize,
    pub page_count: usize,
    pub questions: Vec<QuestionView<'a>>,
    pub actions: PageActions,
    pub remaining_secs: Option<u32>,
}

impl PageView<'_> {
    #[must_use]
    pub fn progress_label(&self) -> String {
        format!("Page {} of {}", self.page_index + 1, self.page_count)
    }
}

/// Shown after a completed submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultView {
    pub name: String,
    pub class_id: ClassId,
    pub roll_number: RollNumber,
    pub score: u32,
    pub total: usize,
}

/// Renders a countdown as `m:ss`.
#[must_use]
pub fn format_remaining(secs: u32) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_countdown() {
        assert_eq!(format_remaining(100), "1:40");
        assert_eq!(format_remaining(59), "0:59");
        assert_eq!(format_remaining(0), "0:00");
    }

    #[test]
    fn progress_label_is_one_based() {
        let view = PageView {
            page_index: 1,
            page_count: 3,
            questions: Vec::new(),
            actions: PageActions {
                back: true,
                next: true,
                submit: false,
            },
            remaining_secs: None,
        };
        assert_eq!(view.progress_label(), "Page 2 of 3");
    }
}
