//! Persisted moderation records.
//!
//! These are plain data. Rules live in the engine; the only logic here is
//! derived state that every consumer must compute the same way.

use crate::category::{Severity, ViolationCategory};
use crate::sanction::{term_in_effect, ActionStatus, ActionType, AppealType, SanctionRef, Tier};
use crate::status::{AppealStatus, ReportStatus};
use crate::target::TargetRef;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// An abuse report filed by a member against one piece of content.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    pub id: Uuid,
    pub reporter_id: Uuid,
    pub target: TargetRef,
    pub violation_category: ViolationCategory,
    pub severity_level: Severity,
    pub status: ReportStatus,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Removal of content, applied synchronously.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModerationAction {
    pub id: Uuid,
    pub report_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub target: TargetRef,
    /// Author of the content at the time of the action.
    pub content_author_id: Uuid,
    /// Community the content belongs to.
    pub community_id: Uuid,
    pub action_type: ActionType,
    pub removal_type: Tier,
    pub reason_category: ViolationCategory,
    pub reason_text: String,
    /// Moderator-only notes. Cleared by [`ModerationAction::redacted`].
    pub internal_notes: Option<String>,
    pub status: ActionStatus,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ModerationAction {
    /// Copy suitable for the affected member: internal notes removed.
    pub fn redacted(&self) -> Self {
        Self {
            internal_notes: None,
            ..self.clone()
        }
    }
}

/// Ban from a single community.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommunityBan {
    pub id: Uuid,
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub issued_by: Uuid,
    pub reason_category: ViolationCategory,
    pub reason_text: String,
    pub is_permanent: bool,
    /// Present iff `is_permanent` is false.
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl CommunityBan {
    pub fn in_effect(&self, now: DateTime<Utc>) -> bool {
        term_in_effect(self.is_active, self.is_permanent, self.expiration_date, now)
    }
}

/// Platform-wide suspension.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlatformSuspension {
    pub id: Uuid,
    pub user_id: Uuid,
    pub issued_by: Uuid,
    pub reason_category: ViolationCategory,
    pub reason_text: String,
    pub is_permanent: bool,
    /// Present iff `is_permanent` is false.
    pub expiration_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PlatformSuspension {
    pub fn in_effect(&self, now: DateTime<Utc>) -> bool {
        term_in_effect(self.is_active, self.is_permanent, self.expiration_date, now)
    }
}

/// Any enforceable moderation outcome.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Sanction {
    ModerationAction(ModerationAction),
    CommunityBan(CommunityBan),
    PlatformSuspension(PlatformSuspension),
}

impl Sanction {
    pub fn reference(&self) -> SanctionRef {
        match self {
            Sanction::ModerationAction(a) => SanctionRef::ModerationAction(a.id),
            Sanction::CommunityBan(b) => SanctionRef::CommunityBan(b.id),
            Sanction::PlatformSuspension(s) => SanctionRef::PlatformSuspension(s.id),
        }
    }

    /// Authority tier the sanction was issued at.
    pub fn tier(&self) -> Tier {
        match self {
            Sanction::ModerationAction(a) => a.removal_type,
            Sanction::CommunityBan(_) => Tier::Community,
            Sanction::PlatformSuspension(_) => Tier::Platform,
        }
    }

    /// Community the sanction is bounded to, if any.
    pub fn community_id(&self) -> Option<Uuid> {
        match self {
            Sanction::ModerationAction(a) => Some(a.community_id),
            Sanction::CommunityBan(b) => Some(b.community_id),
            Sanction::PlatformSuspension(_) => None,
        }
    }

    /// Member entitled to appeal: the banned/suspended user or the content author.
    pub fn affected_user(&self) -> Uuid {
        match self {
            Sanction::ModerationAction(a) => a.content_author_id,
            Sanction::CommunityBan(b) => b.user_id,
            Sanction::PlatformSuspension(s) => s.user_id,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Sanction::ModerationAction(a) => a.is_active,
            Sanction::CommunityBan(b) => b.is_active,
            Sanction::PlatformSuspension(s) => s.is_active,
        }
    }

    /// Whether the sanction currently restricts anyone.
    pub fn in_effect(&self, now: DateTime<Utc>) -> bool {
        match self {
            Sanction::ModerationAction(a) => a.is_active,
            Sanction::CommunityBan(b) => b.in_effect(now),
            Sanction::PlatformSuspension(s) => s.in_effect(now),
        }
    }

    /// `(is_permanent, expiration_date)` for bans and suspensions.
    pub fn term(&self) -> Option<(bool, Option<DateTime<Utc>>)> {
        match self {
            Sanction::ModerationAction(_) => None,
            Sanction::CommunityBan(b) => Some((b.is_permanent, b.expiration_date)),
            Sanction::PlatformSuspension(s) => Some((s.is_permanent, s.expiration_date)),
        }
    }
}

/// Replacement term requested with a `reduce_penalty` decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PenaltyModification {
    /// New term length, counted from the moment of resolution.
    pub duration_days: u32,
}

impl PenaltyModification {
    /// New expiration counted from `now`, or `None` past the representable range.
    pub fn expiration_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_days(i64::from(self.duration_days))
            .and_then(|term| now.checked_add_signed(term))
    }
}

/// A member's request to review one sanction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Appeal {
    pub id: Uuid,
    pub appellant_id: Uuid,
    pub sanction: SanctionRef,
    pub appeal_type: AppealType,
    pub appeal_text: String,
    pub status: AppealStatus,
    pub decision_explanation: Option<String>,
    pub penalty_modification: Option<PenaltyModification>,
    pub is_escalated: bool,
    /// Advisory deadline; resolving later is still valid.
    pub expected_resolution_at: DateTime<Utc>,
    pub reviewer_id: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Appeal {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now > self.expected_resolution_at
    }
}
