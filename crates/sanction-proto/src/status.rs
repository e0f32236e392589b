//! Lifecycle states for reports and appeals, and reviewer decisions.

string_enum! {
    /// Report lifecycle: `pending -> under_review -> resolved | dismissed`.
    pub enum ReportStatus ("report status") {
        Pending => "pending",
        UnderReview => "under_review",
        Resolved => "resolved",
        Dismissed => "dismissed",
    }
}

impl ReportStatus {
    /// Resolved and dismissed reports accept no further transitions.
    #[inline]
    pub fn is_closed(self) -> bool {
        matches!(self, ReportStatus::Resolved | ReportStatus::Dismissed)
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        use ReportStatus::*;
        matches!(
            (self, next),
            (Pending, UnderReview)
                | (Pending, Resolved)
                | (Pending, Dismissed)
                | (UnderReview, Resolved)
                | (UnderReview, Dismissed)
        )
    }
}

string_enum! {
    /// Appeal lifecycle. `upheld`, `overturned` and `reduced` are terminal.
    pub enum AppealStatus ("appeal status") {
        Pending => "pending",
        UnderReview => "under_review",
        Upheld => "upheld",
        Overturned => "overturned",
        Reduced => "reduced",
    }
}

impl AppealStatus {
    /// Non-terminal states, as stored.
    pub const OPEN: &'static [AppealStatus] = &[AppealStatus::Pending, AppealStatus::UnderReview];

    #[inline]
    pub fn is_terminal(self) -> bool {
        !Self::OPEN.contains(&self)
    }
}

string_enum! {
    /// A reviewer's ruling on an appeal.
    pub enum Decision ("decision") {
        Uphold => "uphold",
        Overturn => "overturn",
        ReducePenalty => "reduce_penalty",
    }
}

impl Decision {
    /// Terminal appeal state reached by this decision.
    pub fn outcome(self) -> AppealStatus {
        match self {
            Decision::Uphold => AppealStatus::Upheld,
            Decision::Overturn => AppealStatus::Overturned,
            Decision::ReducePenalty => AppealStatus::Reduced,
        }
    }
}
