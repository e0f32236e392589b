//! Appeal process: filing, review start and escalation.

use super::{Engine, observe, require_text, sanction_entry, scope_of, subject};
use crate::caps::Principal;
use crate::db::{AppealLedger, AuditEntry, AuditTrail, SanctionRegistry, Store, StoreTx};
use crate::error::{ModerationError, ModerationResult};
use crate::telemetry::OperationTimer;
use sanction_proto::{Appeal, AppealStatus, AppealType, SanctionRef, Tier};
use tracing::{info, instrument};
use uuid::Uuid;

/// An affected member's appeal against one sanction.
#[derive(Debug, Clone)]
pub struct AppealRequest {
    pub sanction: SanctionRef,
    pub appeal_type: AppealType,
    pub appeal_text: String,
}

pub struct AppealProcess<'e, S: Store> {
    engine: &'e Engine<S>,
}

impl<'e, S: Store> AppealProcess<'e, S> {
    pub(super) fn new(engine: &'e Engine<S>) -> Self {
        Self { engine }
    }

    /// File an appeal. At most one open appeal may exist per sanction.
    #[instrument(
        skip(self, request),
        fields(appellant = %appellant_id, sanction = %request.sanction)
    )]
    pub async fn submit(
        &self,
        appellant_id: Uuid,
        request: AppealRequest,
    ) -> ModerationResult<Appeal> {
        let _timer = OperationTimer::new("submit_appeal");
        observe("submit_appeal", self.submit_inner(appellant_id, request).await)
    }

    async fn submit_inner(
        &self,
        appellant_id: Uuid,
        request: AppealRequest,
    ) -> ModerationResult<Appeal> {
        let now = self.engine.clock.now();

        if request.sanction.appeal_type() != request.appeal_type {
            return Err(ModerationError::validation(format!(
                "appeal_type `{}` does not match a {} reference",
                request.appeal_type,
                request.sanction.appeal_type()
            )));
        }
        require_text(
            "appeal_text",
            &request.appeal_text,
            self.engine.appeals.max_text_len,
        )?;

        let mut tx = self.engine.store.begin().await?;

        let sanction = tx
            .get(request.sanction)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{} not found", request.sanction)))?;
        if sanction.affected_user() != appellant_id {
            return Err(ModerationError::forbidden(
                "only the sanctioned member may appeal",
            ));
        }
        if !sanction.in_effect(now) {
            return Err(ModerationError::validation(
                "sanction is no longer in effect",
            ));
        }
        if let Some(open) = tx.open_appeal_for(request.sanction).await? {
            return Err(ModerationError::conflict(format!(
                "appeal {} is already open for this sanction",
                open.id
            )));
        }

        let appeal = Appeal {
            id: Uuid::new_v4(),
            appellant_id,
            sanction: request.sanction,
            appeal_type: request.appeal_type,
            appeal_text: request.appeal_text.trim().to_string(),
            status: AppealStatus::Pending,
            decision_explanation: None,
            penalty_modification: None,
            is_escalated: false,
            expected_resolution_at: now + self.engine.appeals.sla(),
            reviewer_id: None,
            reviewed_at: None,
            created_at: now,
        };
        tx.insert_appeal(&appeal).await?;
        tx.record(&AuditEntry::new(
            now,
            appellant_id,
            "appeal.submitted",
            subject::APPEAL,
            appeal.id,
        ))
        .await?;
        tx.record(
            &sanction_entry(now, appellant_id, "sanction.appealed", request.sanction)
                .with_detail(appeal.id.to_string()),
        )
        .await?;
        tx.commit().await?;

        crate::metrics::record_appeal(appeal.appeal_type.as_str());
        info!(appeal = %appeal.id, due = %appeal.expected_resolution_at, "Appeal filed");
        Ok(appeal)
    }

    /// Move a pending appeal to `under_review`.
    #[instrument(skip(self), fields(actor = %principal))]
    pub async fn begin_review(
        &self,
        principal: &Principal,
        appeal_id: Uuid,
    ) -> ModerationResult<Appeal> {
        let _timer = OperationTimer::new("begin_review");
        observe(
            "begin_review",
            self.begin_review_inner(principal, appeal_id).await,
        )
    }

    async fn begin_review_inner(
        &self,
        principal: &Principal,
        appeal_id: Uuid,
    ) -> ModerationResult<Appeal> {
        let now = self.engine.clock.now();
        let mut tx = self.engine.store.begin().await?;

        let mut appeal = find(&mut tx, appeal_id).await?;
        let sanction = tx
            .get(appeal.sanction)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{} not found", appeal.sanction)))?;

        self.engine
            .authority
            .request_review_cap(principal, scope_of(&sanction), appeal.is_escalated)
            .ok_or_else(|| ModerationError::forbidden("not allowed to review this appeal"))?;

        if appeal.status != AppealStatus::Pending
            || !tx.mark_under_review(appeal.id, principal.id()).await?
        {
            return Err(ModerationError::conflict(format!(
                "appeal is {}, not pending",
                appeal.status
            )));
        }
        tx.record(&AuditEntry::new(
            now,
            principal.id(),
            "appeal.review_started",
            subject::APPEAL,
            appeal.id,
        ))
        .await?;
        tx.commit().await?;

        info!(appeal = %appeal.id, "Appeal review started");
        appeal.status = AppealStatus::UnderReview;
        appeal.reviewer_id = Some(principal.id());
        Ok(appeal)
    }

    /// Hand a community-tier appeal to platform admins.
    #[instrument(skip(self, reason), fields(actor = %principal))]
    pub async fn escalate(
        &self,
        principal: &Principal,
        appeal_id: Uuid,
        reason: Option<String>,
    ) -> ModerationResult<Appeal> {
        let _timer = OperationTimer::new("escalate_appeal");
        observe(
            "escalate_appeal",
            self.escalate_inner(principal, appeal_id, reason).await,
        )
    }

    async fn escalate_inner(
        &self,
        principal: &Principal,
        appeal_id: Uuid,
        reason: Option<String>,
    ) -> ModerationResult<Appeal> {
        let now = self.engine.clock.now();
        let mut tx = self.engine.store.begin().await?;

        let mut appeal = find(&mut tx, appeal_id).await?;
        let sanction = tx
            .get(appeal.sanction)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{} not found", appeal.sanction)))?;

        let scope = scope_of(&sanction);
        self.engine
            .authority
            .request_review_cap(principal, scope, appeal.is_escalated)
            .ok_or_else(|| ModerationError::forbidden("not allowed to escalate this appeal"))?;

        if scope.tier == Tier::Platform {
            return Err(ModerationError::validation(
                "platform-tier appeals are already reviewed by admins",
            ));
        }
        if appeal.status.is_terminal() {
            return Err(ModerationError::conflict(format!(
                "appeal is already {}",
                appeal.status
            )));
        }
        if appeal.is_escalated {
            return Err(ModerationError::conflict("appeal is already escalated"));
        }
        if !tx.mark_escalated(appeal.id).await? {
            return Err(ModerationError::conflict("appeal is no longer open"));
        }

        let mut entry = AuditEntry::new(
            now,
            principal.id(),
            "appeal.escalated",
            subject::APPEAL,
            appeal.id,
        );
        if let Some(reason) = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) {
            entry = entry.with_detail(reason);
        }
        tx.record(&entry).await?;
        tx.commit().await?;

        info!(appeal = %appeal.id, "Appeal escalated");
        appeal.is_escalated = true;
        Ok(appeal)
    }

    /// Fetch an appeal. Visible to the appellant and to eligible reviewers.
    pub async fn get(&self, principal: &Principal, appeal_id: Uuid) -> ModerationResult<Appeal> {
        let mut tx = self.engine.store.begin().await?;
        let appeal = find(&mut tx, appeal_id).await?;
        if appeal.appellant_id == principal.id() {
            return Ok(appeal);
        }

        let sanction = tx
            .get(appeal.sanction)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{} not found", appeal.sanction)))?;
        let scope = scope_of(&sanction);
        if principal.can_act_at(scope.tier, scope.community_id) {
            return Ok(appeal);
        }
        Err(ModerationError::forbidden("not allowed to view this appeal"))
    }

    /// Every appeal filed against a sanction, oldest first.
    pub async fn history(
        &self,
        principal: &Principal,
        reference: SanctionRef,
    ) -> ModerationResult<Vec<Appeal>> {
        let mut tx = self.engine.store.begin().await?;
        let sanction = tx
            .get(reference)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{reference} not found")))?;
        let scope = scope_of(&sanction);
        if sanction.affected_user() != principal.id()
            && !principal.can_act_at(scope.tier, scope.community_id)
        {
            return Err(ModerationError::forbidden(
                "not allowed to view appeals for this sanction",
            ));
        }
        Ok(tx.appeals_for(reference).await?)
    }
}

pub(super) async fn find<T: AppealLedger>(tx: &mut T, appeal_id: Uuid) -> ModerationResult<Appeal> {
    tx.find_appeal(appeal_id)
        .await?
        .ok_or_else(|| ModerationError::not_found(format!("appeal {appeal_id} not found")))
}
