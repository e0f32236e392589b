//! Violation categories and the severity table.
//!
//! Severity is a pure function of the category. The table is evaluated in
//! priority order and the first matching row wins; anything not listed is
//! [`Severity::Low`].

string_enum! {
    /// Why content or a member was reported or sanctioned.
    pub enum ViolationCategory ("violation category") {
        HateSpeech => "hate_speech",
        Threats => "threats",
        Doxxing => "doxxing",
        PersonalAttack => "personal_attack",
        OffensiveLanguage => "offensive_language",
        Misinformation => "misinformation",
        Spam => "spam",
        Trolling => "trolling",
        OffTopic => "off_topic",
        /// Free-form; requires a written explanation on reports.
        Other => "other",
    }
}

string_enum! {
    /// Triage priority derived from a [`ViolationCategory`].
    ///
    /// Ordered from least to most urgent so `Ord` compares by urgency.
    #[derive(PartialOrd, Ord)]
    pub enum Severity ("severity") {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Severity table, highest priority first.
const SEVERITY_TABLE: &[(&[ViolationCategory], Severity)] = &[
    (
        &[
            ViolationCategory::HateSpeech,
            ViolationCategory::Threats,
            ViolationCategory::Doxxing,
        ],
        Severity::Critical,
    ),
    (
        &[
            ViolationCategory::PersonalAttack,
            ViolationCategory::OffensiveLanguage,
        ],
        Severity::High,
    ),
    (
        &[
            ViolationCategory::Misinformation,
            ViolationCategory::Spam,
            ViolationCategory::Trolling,
        ],
        Severity::Medium,
    ),
];

impl ViolationCategory {
    /// Classify this category.
    pub fn severity(self) -> Severity {
        SEVERITY_TABLE
            .iter()
            .find(|(categories, _)| categories.contains(&self))
            .map(|(_, severity)| *severity)
            .unwrap_or(Severity::Low)
    }

    /// Whether a report in this category must carry an explanation.
    #[inline]
    pub fn requires_explanation(self) -> bool {
        matches!(self, ViolationCategory::Other)
    }
}
