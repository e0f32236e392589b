//! Appeal resolution: applies a reviewer's decision to the appeal and to
//! the sanction it contests, in one transaction.
//!
//! | decision         | sanction                               | appeal       |
//! |------------------|----------------------------------------|--------------|
//! | `uphold`         | unchanged                              | `upheld`     |
//! | `overturn`       | `is_active = false`                    | `overturned` |
//! | `reduce_penalty` | temporary, expires `now + days`        | `reduced`    |

use super::appeals::find;
use super::{Engine, observe, require_text, sanction_entry, scope_of, subject};
use crate::caps::Principal;
use crate::db::{
    AppealDecisionRecord, AppealLedger, AuditEntry, AuditTrail, SanctionRegistry, Store, StoreTx,
};
use crate::error::{ModerationError, ModerationResult};
use crate::telemetry::OperationTimer;
use chrono::{DateTime, Utc};
use sanction_proto::{Appeal, Decision, PenaltyModification, Sanction};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

/// A reviewer's ruling.
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub decision: Decision,
    pub decision_explanation: String,
    /// Required for `reduce_penalty`, rejected otherwise.
    pub penalty_modification: Option<PenaltyModification>,
}

/// The resolved appeal and the sanction as it stands afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AppealOutcome {
    pub appeal: Appeal,
    pub sanction: Sanction,
}

pub struct AppealResolution<'e, S: Store> {
    engine: &'e Engine<S>,
}

impl<'e, S: Store> AppealResolution<'e, S> {
    pub(super) fn new(engine: &'e Engine<S>) -> Self {
        Self { engine }
    }

    /// Resolve an open appeal. A resolution after `expected_resolution_at`
    /// is still valid.
    #[instrument(
        skip(self, request),
        fields(actor = %principal, decision = %request.decision)
    )]
    pub async fn resolve(
        &self,
        principal: &Principal,
        appeal_id: Uuid,
        request: ResolutionRequest,
    ) -> ModerationResult<AppealOutcome> {
        let _timer = OperationTimer::new("resolve_appeal");
        observe(
            "resolve_appeal",
            self.resolve_inner(principal, appeal_id, request).await,
        )
    }

    async fn resolve_inner(
        &self,
        principal: &Principal,
        appeal_id: Uuid,
        request: ResolutionRequest,
    ) -> ModerationResult<AppealOutcome> {
        let now = self.engine.clock.now();
        let mut tx = self.engine.store.begin().await?;

        let appeal = find(&mut tx, appeal_id).await?;
        let reference = appeal.sanction;
        let sanction = tx
            .get(reference)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{reference} not found")))?;

        self.engine
            .authority
            .request_review_cap(principal, scope_of(&sanction), appeal.is_escalated)
            .ok_or_else(|| {
                if appeal.is_escalated {
                    ModerationError::forbidden("escalated appeals are resolved by admins")
                } else {
                    ModerationError::forbidden("not allowed to resolve this appeal")
                }
            })?;

        if appeal.status.is_terminal() {
            return Err(ModerationError::conflict(format!(
                "appeal is already {}",
                appeal.status
            )));
        }

        require_text(
            "decision_explanation",
            &request.decision_explanation,
            self.engine.appeals.max_text_len,
        )?;
        let new_expiration =
            check_penalty(request.decision, request.penalty_modification, &sanction, now)?;

        match (request.decision, new_expiration) {
            (Decision::Overturn, _) => {
                if !tx.set_active(reference, false).await? {
                    return Err(ModerationError::not_found(format!("{reference} not found")));
                }
                tx.record(&sanction_entry(now, principal.id(), "sanction.lifted", reference))
                    .await?;
            }
            (Decision::ReducePenalty, Some(expires)) => {
                if !tx.modify_expiration(reference, Some(expires), false).await? {
                    return Err(ModerationError::not_found(format!("{reference} not found")));
                }
                tx.record(
                    &sanction_entry(now, principal.id(), "sanction.reduced", reference)
                        .with_detail(format!("until {}", expires.to_rfc3339())),
                )
                .await?;
            }
            _ => {}
        }

        let record = AppealDecisionRecord {
            status: request.decision.outcome(),
            decision_explanation: request.decision_explanation.trim().to_string(),
            penalty_modification: request.penalty_modification,
            reviewer_id: principal.id(),
            reviewed_at: now,
        };
        if !tx.record_decision(appeal.id, &record).await? {
            return Err(ModerationError::conflict("appeal was resolved concurrently"));
        }
        tx.record(
            &AuditEntry::new(now, principal.id(), "appeal.resolved", subject::APPEAL, appeal.id)
                .with_detail(request.decision.as_str()),
        )
        .await?;

        let appeal = find(&mut tx, appeal.id).await?;
        let sanction = tx
            .get(reference)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("{reference} not found")))?;
        tx.commit().await?;

        crate::metrics::record_decision(request.decision.as_str());
        info!(
            appeal = %appeal.id,
            sanction = %reference,
            status = %appeal.status,
            overdue_by_secs = (now - appeal.expected_resolution_at).num_seconds().max(0),
            "Appeal resolved"
        );

        Ok(AppealOutcome { appeal, sanction })
    }
}

/// Validate the penalty change for `decision` and return the new expiration
/// when one applies.
fn check_penalty(
    decision: Decision,
    penalty: Option<PenaltyModification>,
    sanction: &Sanction,
    now: DateTime<Utc>,
) -> ModerationResult<Option<DateTime<Utc>>> {
    match (decision, penalty) {
        (Decision::ReducePenalty, None) => Err(ModerationError::validation(
            "reduce_penalty requires penalty_modification",
        )),
        (Decision::ReducePenalty, Some(modification)) => {
            let Some((is_permanent, current)) = sanction.term() else {
                return Err(ModerationError::validation(
                    "content removals have no term to reduce",
                ));
            };
            if modification.duration_days == 0 {
                return Err(ModerationError::validation(
                    "penalty_modification.duration_days must be at least 1",
                ));
            }
            let expires = modification.expiration_from(now).ok_or_else(|| {
                ModerationError::validation("penalty_modification.duration_days is out of range")
            })?;
            if let Some(current) = current
                && !is_permanent
                && expires >= current
            {
                return Err(ModerationError::validation(
                    "penalty_modification must shorten the current term",
                ));
            }
            Ok(Some(expires))
        }
        (_, Some(_)) => Err(ModerationError::validation(format!(
            "penalty_modification is only accepted with {}",
            Decision::ReducePenalty
        ))),
        (_, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::clock::Clock;
    use crate::moderation::{AppealRequest, BanRequest, SuspensionRequest};
    use chrono::Duration;
    use sanction_proto::{AppealStatus, SanctionRef, ViolationCategory};

    struct Case {
        f: Fixture,
        community: Uuid,
        member: Uuid,
        ban: SanctionRef,
        appeal: Uuid,
    }

    async fn appealed_ban(is_permanent: bool) -> Case {
        let f = fixture().await;
        let community = Uuid::new_v4();
        let member = Uuid::new_v4();
        let ban = f
            .engine
            .authority()
            .apply_ban(
                &moderator(community),
                BanRequest {
                    community_id: community,
                    user_id: member,
                    reason_category: ViolationCategory::Trolling,
                    reason_text: "baiting".to_string(),
                    is_permanent,
                    expiration_date: (!is_permanent).then(|| start() + Duration::days(10)),
                },
            )
            .await
            .unwrap();
        let ban = SanctionRef::CommunityBan(ban.id);
        let appeal = f
            .engine
            .appeals()
            .submit(
                member,
                AppealRequest {
                    sanction: ban,
                    appeal_type: ban.appeal_type(),
                    appeal_text: "It was a joke between friends".to_string(),
                },
            )
            .await
            .unwrap();
        Case {
            f,
            community,
            member,
            ban,
            appeal: appeal.id,
        }
    }

    fn ruling(decision: Decision, days: Option<u32>) -> ResolutionRequest {
        ResolutionRequest {
            decision,
            decision_explanation: "Reviewed the thread history".to_string(),
            penalty_modification: days.map(|duration_days| PenaltyModification { duration_days }),
        }
    }

    fn ban_of(sanction: &Sanction) -> &sanction_proto::CommunityBan {
        match sanction {
            Sanction::CommunityBan(b) => b,
            other => panic!("expected a ban, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn overturn_lifts_sanction() {
        let c = appealed_ban(true).await;
        let outcome = c
            .f
            .engine
            .resolution()
            .resolve(&moderator(c.community), c.appeal, ruling(Decision::Overturn, None))
            .await
            .unwrap();

        assert_eq!(outcome.appeal.status, AppealStatus::Overturned);
        assert_eq!(outcome.appeal.reviewed_at, Some(start()));
        assert_eq!(
            outcome.appeal.decision_explanation.as_deref(),
            Some("Reviewed the thread history")
        );
        assert!(!outcome.sanction.is_active());

        let standing = c
            .f
            .engine
            .authority()
            .member_standing(c.member, Some(c.community))
            .await
            .unwrap();
        assert!(standing.ban.is_none());
    }

    #[tokio::test]
    async fn uphold_leaves_sanction_untouched() {
        let c = appealed_ban(true).await;
        let outcome = c
            .f
            .engine
            .resolution()
            .resolve(&admin(), c.appeal, ruling(Decision::Uphold, None))
            .await
            .unwrap();

        assert_eq!(outcome.appeal.status, AppealStatus::Upheld);
        let ban = ban_of(&outcome.sanction);
        assert!(ban.is_active);
        assert!(ban.is_permanent);
        assert_eq!(ban.expiration_date, None);
    }

    #[tokio::test]
    async fn reduce_requires_penalty_modification() {
        let c = appealed_ban(true).await;
        let resolution = c.f.engine.resolution();
        let m = moderator(c.community);

        let err = resolution
            .resolve(&m, c.appeal, ruling(Decision::ReducePenalty, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));

        let err = resolution
            .resolve(&m, c.appeal, ruling(Decision::ReducePenalty, Some(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));

        let err = resolution
            .resolve(&m, c.appeal, ruling(Decision::Uphold, Some(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));

        let outcome = resolution
            .resolve(&m, c.appeal, ruling(Decision::ReducePenalty, Some(30)))
            .await
            .unwrap();
        assert_eq!(outcome.appeal.status, AppealStatus::Reduced);
        assert_eq!(
            outcome.appeal.penalty_modification,
            Some(PenaltyModification { duration_days: 30 })
        );
        let ban = ban_of(&outcome.sanction);
        assert!(!ban.is_permanent);
        assert_eq!(ban.expiration_date, Some(start() + Duration::days(30)));
        assert!(ban.is_active);
    }

    #[tokio::test]
    async fn unrepresentable_reduction_is_rejected() {
        let c = appealed_ban(true).await;
        let resolution = c.f.engine.resolution();

        let err = resolution
            .resolve(&admin(), c.appeal, ruling(Decision::ReducePenalty, Some(u32::MAX)))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));

        let appeal = c.f.engine.appeals().get(&admin(), c.appeal).await.unwrap();
        assert_eq!(appeal.status, AppealStatus::Pending);
        let ban = c.f.engine.authority().sanction(&admin(), c.ban).await.unwrap();
        assert!(ban_of(&ban).is_permanent);
    }

    #[tokio::test]
    async fn reduction_must_shorten_temporary_term() {
        let c = appealed_ban(false).await;
        let resolution = c.f.engine.resolution();

        let err = resolution
            .resolve(&admin(), c.appeal, ruling(Decision::ReducePenalty, Some(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));

        let outcome = resolution
            .resolve(&admin(), c.appeal, ruling(Decision::ReducePenalty, Some(3)))
            .await
            .unwrap();
        assert_eq!(
            ban_of(&outcome.sanction).expiration_date,
            Some(start() + Duration::days(3))
        );
    }

    #[tokio::test]
    async fn explanation_is_mandatory() {
        let c = appealed_ban(true).await;
        let mut request = ruling(Decision::Overturn, None);
        request.decision_explanation = " ".to_string();
        let err = c
            .f
            .engine
            .resolution()
            .resolve(&admin(), c.appeal, request)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Validation(_)));
    }

    #[tokio::test]
    async fn terminal_appeal_cannot_be_resolved_again() {
        let c = appealed_ban(true).await;
        let resolution = c.f.engine.resolution();
        resolution
            .resolve(&admin(), c.appeal, ruling(Decision::Uphold, None))
            .await
            .unwrap();
        let err = resolution
            .resolve(&admin(), c.appeal, ruling(Decision::Overturn, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Conflict(_)));

        let err = resolution
            .resolve(&admin(), Uuid::new_v4(), ruling(Decision::Overturn, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));
    }

    #[tokio::test]
    async fn reviewer_tier_must_cover_sanction() {
        let f = fixture().await;
        let member = Uuid::new_v4();
        let suspension = f
            .engine
            .authority()
            .apply_suspension(
                &admin(),
                SuspensionRequest {
                    user_id: member,
                    reason_category: ViolationCategory::Doxxing,
                    reason_text: "posted a home address".to_string(),
                    is_permanent: true,
                    expiration_date: None,
                },
            )
            .await
            .unwrap();
        let reference = SanctionRef::PlatformSuspension(suspension.id);
        let appeal = f
            .engine
            .appeals()
            .submit(
                member,
                AppealRequest {
                    sanction: reference,
                    appeal_type: reference.appeal_type(),
                    appeal_text: "Address was already public".to_string(),
                },
            )
            .await
            .unwrap();

        let err = f
            .engine
            .resolution()
            .resolve(&moderator(Uuid::new_v4()), appeal.id, ruling(Decision::Overturn, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Authorization(_)));
    }

    #[tokio::test]
    async fn escalated_appeal_needs_admin() {
        let c = appealed_ban(true).await;
        let m = moderator(c.community);
        c.f.engine.appeals().escalate(&m, c.appeal, None).await.unwrap();

        let resolution = c.f.engine.resolution();
        let err = resolution
            .resolve(&m, c.appeal, ruling(Decision::Overturn, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Authorization(_)));

        resolution
            .resolve(&admin(), c.appeal, ruling(Decision::Overturn, None))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn late_resolution_is_still_valid() {
        let c = appealed_ban(true).await;
        c.f.clock.advance(Duration::days(30));

        let appeal = c
            .f
            .engine
            .appeals()
            .get(&admin(), c.appeal)
            .await
            .unwrap();
        assert!(appeal.is_overdue(c.f.clock.now()));

        let outcome = c
            .f
            .engine
            .resolution()
            .resolve(&admin(), c.appeal, ruling(Decision::Uphold, None))
            .await
            .unwrap();
        assert_eq!(outcome.appeal.reviewed_at, Some(start() + Duration::days(30)));
        assert!(!outcome.appeal.is_overdue(c.f.clock.now()));
    }

    #[tokio::test]
    async fn resolution_is_audited() {
        let c = appealed_ban(true).await;
        let reviewer = admin();
        c.f.engine
            .resolution()
            .resolve(&reviewer, c.appeal, ruling(Decision::Overturn, None))
            .await
            .unwrap();

        let appeal_log = c
            .f
            .engine
            .audit_trail(&reviewer, subject::APPEAL, c.appeal)
            .await
            .unwrap();
        let actions: Vec<_> = appeal_log.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(actions, ["appeal.submitted", "appeal.resolved"]);

        let ban_log = c
            .f
            .engine
            .audit_trail(&reviewer, subject::sanction(c.ban), c.ban.id())
            .await
            .unwrap();
        assert_eq!(ban_log.last().unwrap().action, "sanction.lifted");
        assert_eq!(ban_log.last().unwrap().actor_id, reviewer.id());
    }
}
