//! Sanction authority: removals, bans, suspensions and report triage.
//!
//! A platform-tier removal does not replace a community-tier one on the
//! same content. Both stay on record and the effective state is the
//! highest-tier active removal.

use super::{Engine, observe, require_text, sanction_entry, scope_of, subject};
use crate::caps::{AuthorityScope, Principal};
use crate::db::{
    AuditEntry, AuditTrail, ContentDirectory, ReportLog, SanctionRegistry, Store, StoreTx,
};
use crate::error::{ModerationError, ModerationResult};
use crate::telemetry::OperationTimer;
use chrono::{DateTime, Utc};
use sanction_proto::{
    ActionStatus, ActionType, CommunityBan, ModerationAction, PlatformSuspension, ReportStatus,
    Sanction, SanctionRef, TargetRef, Tier, ViolationCategory, check_term, stored_expiration,
};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

/// Longest reason text accepted on a sanction.
const MAX_REASON_LEN: usize = 2000;

/// A content removal.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub target: TargetRef,
    pub action_type: ActionType,
    pub scope: Tier,
    pub reason_category: ViolationCategory,
    pub reason_text: String,
    pub internal_notes: Option<String>,
    pub report_id: Option<Uuid>,
    /// Where the linked report goes: `resolved` (default) or `under_review`.
    pub report_status: Option<ReportStatus>,
}

/// A ban from one community.
#[derive(Debug, Clone)]
pub struct BanRequest {
    pub community_id: Uuid,
    pub user_id: Uuid,
    pub reason_category: ViolationCategory,
    pub reason_text: String,
    pub is_permanent: bool,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// A platform-wide suspension.
#[derive(Debug, Clone)]
pub struct SuspensionRequest {
    pub user_id: Uuid,
    pub reason_category: ViolationCategory,
    pub reason_text: String,
    pub is_permanent: bool,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Effective visibility of one piece of content.
#[derive(Debug, Clone, Serialize)]
pub struct ContentState {
    pub target: TargetRef,
    pub removed: bool,
    /// Highest-tier active removal.
    pub effective: Option<ModerationAction>,
    /// Every active removal, oldest first.
    pub active_actions: Vec<ModerationAction>,
}

/// Restrictions currently in effect on a member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberStanding {
    pub member_id: Uuid,
    pub community_id: Option<Uuid>,
    pub suspension: Option<PlatformSuspension>,
    pub ban: Option<CommunityBan>,
    /// A suspension dominates any community ban.
    pub restricted_by: Option<Tier>,
}

pub struct SanctionAuthority<'e, S: Store> {
    engine: &'e Engine<S>,
}

impl<'e, S: Store> SanctionAuthority<'e, S> {
    pub(super) fn new(engine: &'e Engine<S>) -> Self {
        Self { engine }
    }

    // ========================================================================
    // Content removal
    // ========================================================================

    /// Remove content. Applied synchronously; the returned action is `completed`.
    #[instrument(
        skip(self, request),
        fields(actor = %principal, target = %request.target, scope = %request.scope)
    )]
    pub async fn apply_action(
        &self,
        principal: &Principal,
        request: ActionRequest,
    ) -> ModerationResult<ModerationAction> {
        let _timer = OperationTimer::new("apply_action");
        observe("apply_action", self.apply_action_inner(principal, request).await)
    }

    async fn apply_action_inner(
        &self,
        principal: &Principal,
        request: ActionRequest,
    ) -> ModerationResult<ModerationAction> {
        let now = self.engine.clock.now();
        require_text("reason_text", &request.reason_text, MAX_REASON_LEN)?;
        let report_status = request.report_status.unwrap_or(ReportStatus::Resolved);
        if !matches!(report_status, ReportStatus::Resolved | ReportStatus::UnderReview) {
            return Err(ModerationError::validation(
                "report_status must be `resolved` or `under_review`",
            ));
        }

        let mut tx = self.engine.store.begin().await?;

        let content = tx.lookup(request.target).await?.ok_or_else(|| {
            ModerationError::not_found(format!("{} does not exist", request.target))
        })?;

        let scope = AuthorityScope {
            tier: request.scope,
            community_id: Some(content.community_id),
        };
        self.engine
            .authority
            .request_removal_cap(principal, scope)
            .ok_or_else(|| {
                ModerationError::forbidden(format!(
                    "not allowed to remove content at {} scope here",
                    request.scope
                ))
            })?;

        let report = match request.report_id {
            Some(report_id) => {
                let report = tx.find_report(report_id).await?.ok_or_else(|| {
                    ModerationError::not_found(format!("report {report_id} not found"))
                })?;
                if report.target != request.target {
                    return Err(ModerationError::validation(
                        "linked report concerns different content",
                    ));
                }
                if report.status.is_closed() {
                    return Err(ModerationError::conflict(format!(
                        "report {report_id} is already {}",
                        report.status
                    )));
                }
                Some(report)
            }
            None => None,
        };

        let existing = tx.active_actions_on(request.target).await?;
        if existing.iter().any(|a| a.removal_type == request.scope) {
            return Err(ModerationError::conflict(format!(
                "content already has an active {} removal",
                request.scope
            )));
        }

        let action = ModerationAction {
            id: Uuid::new_v4(),
            report_id: request.report_id,
            actor_id: principal.id(),
            target: request.target,
            content_author_id: content.author_id,
            community_id: content.community_id,
            action_type: request.action_type,
            removal_type: request.scope,
            reason_category: request.reason_category,
            reason_text: request.reason_text.trim().to_string(),
            internal_notes: request.internal_notes.filter(|n| !n.trim().is_empty()),
            status: ActionStatus::Completed,
            is_active: true,
            created_at: now,
        };
        tx.insert_action(&action).await?;

        if let Some(ref report) = report
            && report.status != report_status
        {
            if !report.status.can_transition_to(report_status)
                || !tx
                    .set_report_status(report.id, report.status, report_status)
                    .await?
            {
                return Err(ModerationError::conflict(format!(
                    "report {} cannot move to {report_status}",
                    report.id
                )));
            }
            tx.record(
                &AuditEntry::new(now, principal.id(), "report.triaged", subject::REPORT, report.id)
                    .with_detail(format!("{} -> {report_status}", report.status)),
            )
            .await?;
        }

        let reference = SanctionRef::ModerationAction(action.id);
        tx.record(
            &sanction_entry(now, principal.id(), "sanction.applied", reference)
                .with_detail(format!("{} {}", action.action_type, action.removal_type)),
        )
        .await?;
        tx.commit().await?;

        crate::metrics::record_sanction("moderation_action", action.removal_type.as_str());
        info!(action = %action.id, author = %action.content_author_id, "Content removed");

        if let Some(report) = report
            && report_status == ReportStatus::Resolved
        {
            self.engine
                .eligibility
                .note_actioned_report(report.reporter_id, now)
                .await;
        }
        self.engine
            .eligibility
            .note_sanction(action.content_author_id, now)
            .await;

        Ok(action)
    }

    // ========================================================================
    // Bans and suspensions
    // ========================================================================

    /// Ban a member from one community.
    #[instrument(
        skip(self, request),
        fields(actor = %principal, member = %request.user_id, community = %request.community_id)
    )]
    pub async fn apply_ban(
        &self,
        principal: &Principal,
        request: BanRequest,
    ) -> ModerationResult<CommunityBan> {
        let _timer = OperationTimer::new("apply_ban");
        observe("apply_ban", self.apply_ban_inner(principal, request).await)
    }

    async fn apply_ban_inner(
        &self,
        principal: &Principal,
        request: BanRequest,
    ) -> ModerationResult<CommunityBan> {
        let now = self.engine.clock.now();
        require_text("reason_text", &request.reason_text, MAX_REASON_LEN)?;
        let expiration_date = stored_expiration(request.expiration_date);
        check_term(request.is_permanent, expiration_date, now)?;

        self.engine
            .authority
            .request_ban_cap(principal, request.community_id)
            .ok_or_else(|| ModerationError::forbidden("not a moderator of this community"))?;

        let mut tx = self.engine.store.begin().await?;

        let active = tx
            .active_bans_for(request.user_id, request.community_id)
            .await?;
        if let Some(existing) = active.iter().find(|b| b.in_effect(now)) {
            return Err(ModerationError::conflict(format!(
                "member already has an active ban in this community ({})",
                existing.id
            )));
        }

        let ban = CommunityBan {
            id: Uuid::new_v4(),
            community_id: request.community_id,
            user_id: request.user_id,
            issued_by: principal.id(),
            reason_category: request.reason_category,
            reason_text: request.reason_text.trim().to_string(),
            is_permanent: request.is_permanent,
            expiration_date,
            is_active: true,
            created_at: now,
        };
        tx.insert_ban(&ban).await?;
        tx.record(
            &sanction_entry(now, principal.id(), "sanction.applied", SanctionRef::CommunityBan(ban.id))
                .with_detail(term_detail(ban.is_permanent, ban.expiration_date)),
        )
        .await?;
        tx.commit().await?;

        crate::metrics::record_sanction("community_ban", Tier::Community.as_str());
        info!(ban = %ban.id, permanent = ban.is_permanent, "Member banned");
        self.engine.eligibility.note_sanction(ban.user_id, now).await;

        Ok(ban)
    }

    /// Suspend a member platform-wide. Admins only.
    #[instrument(skip(self, request), fields(actor = %principal, member = %request.user_id))]
    pub async fn apply_suspension(
        &self,
        principal: &Principal,
        request: SuspensionRequest,
    ) -> ModerationResult<PlatformSuspension> {
        let _timer = OperationTimer::new("apply_suspension");
        observe(
            "apply_suspension",
            self.apply_suspension_inner(principal, request).await,
        )
    }

    async fn apply_suspension_inner(
        &self,
        principal: &Principal,
        request: SuspensionRequest,
    ) -> ModerationResult<PlatformSuspension> {
        let now = self.engine.clock.now();
        require_text("reason_text", &request.reason_text, MAX_REASON_LEN)?;
        let expiration_date = stored_expiration(request.expiration_date);
        check_term(request.is_permanent, expiration_date, now)?;

        self.engine
            .authority
            .request_suspension_cap(principal)
            .ok_or_else(|| ModerationError::forbidden("platform suspensions require an admin"))?;

        let mut tx = self.engine.store.begin().await?;

        let active = tx.active_suspensions_for(request.user_id).await?;
        if let Some(existing) = active.iter().find(|s| s.in_effect(now)) {
            return Err(ModerationError::conflict(format!(
                "member is already suspended ({})",
                existing.id
            )));
        }

        let suspension = PlatformSuspension {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            issued_by: principal.id(),
            reason_category: request.reason_category,
            reason_text: request.reason_text.trim().to_string(),
            is_permanent: request.is_permanent,
            expiration_date,
            is_active: true,
            created_at: now,
        };
        tx.insert_suspension(&suspension).await?;
        tx.record(
            &sanction_entry(
                now,
                principal.id(),
                "sanction.applied",
                SanctionRef::PlatformSuspension(suspension.id),
            )
            .with_detail(term_detail(suspension.is_permanent, suspension.expiration_date)),
        )
        .await?;
        tx.commit().await?;

        crate::metrics::record_sanction("platform_suspension", Tier::Platform.as_str());
        info!(suspension = %suspension.id, permanent = suspension.is_permanent, "Member suspended");
        self.engine
            .eligibility
            .note_sanction(suspension.user_id, now)
            .await;

        Ok(suspension)
    }

    // ========================================================================
    // Report triage
    // ========================================================================

    /// Move a report along `pending -> under_review -> resolved | dismissed`.
    #[instrument(skip(self), fields(actor = %principal))]
    pub async fn triage_report(
        &self,
        principal: &Principal,
        report_id: Uuid,
        to: ReportStatus,
    ) -> ModerationResult<sanction_proto::Report> {
        let _timer = OperationTimer::new("triage_report");
        observe(
            "triage_report",
            self.triage_report_inner(principal, report_id, to).await,
        )
    }

    async fn triage_report_inner(
        &self,
        principal: &Principal,
        report_id: Uuid,
        to: ReportStatus,
    ) -> ModerationResult<sanction_proto::Report> {
        let now = self.engine.clock.now();
        let mut tx = self.engine.store.begin().await?;

        let mut report = tx
            .find_report(report_id)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("report {report_id} not found")))?;

        // Content missing from the directory leaves only platform-wide reviewers.
        let community = tx.lookup(report.target).await?.map(|c| c.community_id);
        let scope = AuthorityScope {
            tier: Tier::Community,
            community_id: community,
        };
        self.engine
            .authority
            .request_triage_cap(principal, scope)
            .ok_or_else(|| ModerationError::forbidden("not allowed to triage this report"))?;

        if !report.status.can_transition_to(to)
            || !tx.set_report_status(report.id, report.status, to).await?
        {
            return Err(ModerationError::conflict(format!(
                "report cannot move from {} to {to}",
                report.status
            )));
        }
        tx.record(
            &AuditEntry::new(now, principal.id(), "report.triaged", subject::REPORT, report.id)
                .with_detail(format!("{} -> {to}", report.status)),
        )
        .await?;
        tx.commit().await?;

        info!(report = %report.id, from = %report.status, to = %to, "Report triaged");
        report.status = to;
        Ok(report)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Fetch a sanction. The affected member sees it without internal notes;
    /// reviewers with authority at its tier see everything.
    pub async fn sanction(
        &self,
        principal: &Principal,
        reference: SanctionRef,
    ) -> ModerationResult<Sanction> {
        let mut tx = self.engine.store.begin().await?;
        let sanction = tx
            .get(reference)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{reference} not found")))?;

        let scope = scope_of(&sanction);
        if principal.can_act_at(scope.tier, scope.community_id) {
            return Ok(sanction);
        }
        if sanction.affected_user() == principal.id() {
            return Ok(match sanction {
                Sanction::ModerationAction(a) => Sanction::ModerationAction(a.redacted()),
                other => other,
            });
        }
        Err(ModerationError::forbidden("not allowed to view this sanction"))
    }

    /// Effective removal state of a piece of content.
    pub async fn content_state(&self, target: TargetRef) -> ModerationResult<ContentState> {
        let mut tx = self.engine.store.begin().await?;
        if tx.lookup(target).await?.is_none() {
            return Err(ModerationError::not_found(format!("{target} does not exist")));
        }
        let active_actions = tx.active_actions_on(target).await?;
        let effective = active_actions
            .iter()
            .max_by_key(|a| (a.removal_type, a.created_at))
            .cloned();

        Ok(ContentState {
            target,
            removed: effective.is_some(),
            effective,
            active_actions,
        })
    }

    /// Suspension and, when `community_id` is given, ban currently in effect.
    pub async fn member_standing(
        &self,
        member_id: Uuid,
        community_id: Option<Uuid>,
    ) -> ModerationResult<MemberStanding> {
        let now = self.engine.clock.now();
        let mut tx = self.engine.store.begin().await?;

        let suspension = tx
            .active_suspensions_for(member_id)
            .await?
            .into_iter()
            .find(|s| s.in_effect(now));
        let ban = match community_id {
            Some(community) => tx
                .active_bans_for(member_id, community)
                .await?
                .into_iter()
                .find(|b| b.in_effect(now)),
            None => None,
        };

        let restricted_by = if suspension.is_some() {
            Some(Tier::Platform)
        } else if ban.is_some() {
            Some(Tier::Community)
        } else {
            None
        };

        Ok(MemberStanding {
            member_id,
            community_id,
            suspension,
            ban,
            restricted_by,
        })
    }
}

fn term_detail(is_permanent: bool, expiration_date: Option<DateTime<Utc>>) -> String {
    match expiration_date {
        Some(at) if !is_permanent => format!("until {}", at.to_rfc3339()),
        _ => "permanent".to_string(),
    }
}
