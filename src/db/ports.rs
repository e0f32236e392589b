//! Storage ports, one per aggregate.
//!
//! Every method takes `&mut self` on a transaction handle, so a mutation
//! can only happen inside a transaction the caller opened and commits.

use super::DbError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sanction_proto::{
    Appeal, AppealStatus, CommunityBan, ModerationAction, PenaltyModification, PlatformSuspension,
    Report, ReportStatus, Sanction, SanctionRef, TargetRef,
};
use uuid::Uuid;

/// Report counts for one reporter, both taken against the same instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportCounts {
    pub last_hour: u32,
    pub last_day: u32,
}

/// Abuse report log.
#[async_trait]
pub trait ReportLog: Send {
    async fn insert_report(&mut self, report: &Report) -> Result<(), DbError>;

    async fn find_report(&mut self, id: Uuid) -> Result<Option<Report>, DbError>;

    /// Reports filed by `reporter_id` after `hour_since` and after `day_since`.
    async fn report_counts(
        &mut self,
        reporter_id: Uuid,
        hour_since: DateTime<Utc>,
        day_since: DateTime<Utc>,
    ) -> Result<ReportCounts, DbError>;

    /// Id of a report by `reporter_id` on `target` filed after `since`, if any.
    async fn recent_report_on(
        &mut self,
        reporter_id: Uuid,
        target: TargetRef,
        since: DateTime<Utc>,
    ) -> Result<Option<Uuid>, DbError>;

    /// Compare-and-set the status. Returns `false` if the report was not in `from`.
    async fn set_report_status(
        &mut self,
        id: Uuid,
        from: ReportStatus,
        to: ReportStatus,
    ) -> Result<bool, DbError>;
}

/// Durable store of sanctions. No business rules.
#[async_trait]
pub trait SanctionRegistry: Send {
    async fn insert_action(&mut self, action: &ModerationAction) -> Result<(), DbError>;

    async fn insert_ban(&mut self, ban: &CommunityBan) -> Result<(), DbError>;

    async fn insert_suspension(&mut self, suspension: &PlatformSuspension)
    -> Result<(), DbError>;

    async fn get(&mut self, sanction: SanctionRef) -> Result<Option<Sanction>, DbError>;

    /// Returns `false` if no such sanction exists.
    async fn set_active(&mut self, sanction: SanctionRef, active: bool) -> Result<bool, DbError>;

    /// Replace the term of a ban or suspension. Returns `false` for unknown
    /// ids and for moderation actions, which have no term.
    async fn modify_expiration(
        &mut self,
        sanction: SanctionRef,
        expiration_date: Option<DateTime<Utc>>,
        is_permanent: bool,
    ) -> Result<bool, DbError>;

    /// Moderation actions on `target` with `is_active = true`.
    async fn active_actions_on(
        &mut self,
        target: TargetRef,
    ) -> Result<Vec<ModerationAction>, DbError>;

    /// Bans with `is_active = true` for a member in one community.
    async fn active_bans_for(
        &mut self,
        user_id: Uuid,
        community_id: Uuid,
    ) -> Result<Vec<CommunityBan>, DbError>;

    /// Suspensions with `is_active = true` for a member.
    async fn active_suspensions_for(
        &mut self,
        user_id: Uuid,
    ) -> Result<Vec<PlatformSuspension>, DbError>;
}

/// Terminal outcome written by a reviewer.
#[derive(Debug, Clone)]
pub struct AppealDecisionRecord {
    pub status: AppealStatus,
    pub decision_explanation: String,
    pub penalty_modification: Option<PenaltyModification>,
    pub reviewer_id: Uuid,
    pub reviewed_at: DateTime<Utc>,
}

/// Appeals. Never deleted.
#[async_trait]
pub trait AppealLedger: Send {
    async fn insert_appeal(&mut self, appeal: &Appeal) -> Result<(), DbError>;

    async fn find_appeal(&mut self, id: Uuid) -> Result<Option<Appeal>, DbError>;

    /// The non-terminal appeal against `sanction`, if one exists.
    async fn open_appeal_for(&mut self, sanction: SanctionRef) -> Result<Option<Appeal>, DbError>;

    /// Every appeal ever filed against `sanction`, oldest first.
    async fn appeals_for(&mut self, sanction: SanctionRef) -> Result<Vec<Appeal>, DbError>;

    /// `pending -> under_review`. Returns `false` if the appeal was not pending.
    async fn mark_under_review(&mut self, id: Uuid, reviewer_id: Uuid) -> Result<bool, DbError>;

    /// Set `is_escalated` on an open appeal. Returns `false` if not open.
    async fn mark_escalated(&mut self, id: Uuid) -> Result<bool, DbError>;

    /// Move an open appeal to a terminal state. Returns `false` if it was
    /// already terminal.
    async fn record_decision(
        &mut self,
        id: Uuid,
        decision: &AppealDecisionRecord,
    ) -> Result<bool, DbError>;
}

/// Author and community of a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentInfo {
    pub target: TargetRef,
    pub author_id: Uuid,
    pub community_id: Uuid,
}

/// Read side of the host application's content store.
#[async_trait]
pub trait ContentDirectory: Send {
    async fn lookup(&mut self, target: TargetRef) -> Result<Option<ContentInfo>, DbError>;
}

/// One audit row.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub at: DateTime<Utc>,
    pub actor_id: Uuid,
    pub action: String,
    pub subject_kind: String,
    pub subject_id: Uuid,
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn new(
        at: DateTime<Utc>,
        actor_id: Uuid,
        action: &str,
        subject_kind: &str,
        subject_id: Uuid,
    ) -> Self {
        Self {
            at,
            actor_id,
            action: action.to_string(),
            subject_kind: subject_kind.to_string(),
            subject_id,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Append-only audit trail.
#[async_trait]
pub trait AuditTrail: Send {
    async fn record(&mut self, entry: &AuditEntry) -> Result<(), DbError>;

    async fn entries_for(
        &mut self,
        subject_kind: &str,
        subject_id: Uuid,
    ) -> Result<Vec<AuditEntry>, DbError>;
}

/// A transaction exposing every port.
#[async_trait]
pub trait StoreTx:
    ReportLog + SanctionRegistry + AppealLedger + ContentDirectory + AuditTrail + Send
{
    async fn commit(self) -> Result<(), DbError>;
}

/// Source of transactions.
#[async_trait]
pub trait Store: Send + Sync {
    type Tx: StoreTx;

    /// Open a transaction. Transient store failures are retried a bounded
    /// number of times before surfacing.
    async fn begin(&self) -> Result<Self::Tx, DbError>;
}
