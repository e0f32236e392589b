//! Report intake: validation, eligibility, dedup, rate limiting, severity.

use super::{Engine, observe, subject};
use crate::caps::Principal;
use crate::db::{AuditEntry, AuditTrail, ContentDirectory, ReportLog, Store, StoreTx};
use crate::error::{ModerationError, ModerationResult};
use crate::telemetry::OperationTimer;
use chrono::Duration;
use sanction_proto::{Report, ReportStatus, TargetRef, Tier, ViolationCategory};
use tracing::{info, instrument};
use uuid::Uuid;

/// A member's abuse report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub target: TargetRef,
    pub violation_category: ViolationCategory,
    pub explanation: Option<String>,
}

pub struct ReportIntake<'e, S: Store> {
    engine: &'e Engine<S>,
}

impl<'e, S: Store> ReportIntake<'e, S> {
    pub(super) fn new(engine: &'e Engine<S>) -> Self {
        Self { engine }
    }

    /// File a report. Returns it in `pending` state with severity derived
    /// from the category.
    #[instrument(
        skip(self, request),
        fields(reporter = %reporter_id, target = %request.target, category = %request.violation_category)
    )]
    pub async fn submit(&self, reporter_id: Uuid, request: ReportRequest) -> ModerationResult<Report> {
        let _timer = OperationTimer::new("submit_report");
        observe("submit_report", self.submit_inner(reporter_id, request).await)
    }

    async fn submit_inner(
        &self,
        reporter_id: Uuid,
        request: ReportRequest,
    ) -> ModerationResult<Report> {
        let policy = &self.engine.reports;
        let now = self.engine.clock.now();

        let explanation = request
            .explanation
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if request.violation_category.requires_explanation() {
            let len = explanation.as_deref().map_or(0, |t| t.chars().count());
            if len < policy.other_min_explanation {
                return Err(ModerationError::validation(format!(
                    "category `other` requires an explanation of at least {} characters",
                    policy.other_min_explanation
                )));
            }
        }

        let trust = self.engine.eligibility.trust_score(reporter_id).await?;
        if trust < policy.min_reporter_trust {
            return Err(ModerationError::forbidden(
                "reporter is not eligible to file reports",
            ));
        }

        let mut tx = self.engine.store.begin().await?;

        if tx.lookup(request.target).await?.is_none() {
            return Err(ModerationError::not_found(format!(
                "{} does not exist",
                request.target
            )));
        }

        if let Some(existing) = tx
            .recent_report_on(reporter_id, request.target, now - policy.duplicate_window())
            .await?
        {
            return Err(ModerationError::conflict(format!(
                "already reported this content (report {existing})"
            )));
        }

        let counts = tx
            .report_counts(reporter_id, now - Duration::hours(1), now - Duration::hours(24))
            .await?;
        if counts.last_hour >= policy.hourly_cap {
            return Err(ModerationError::RateLimited(format!(
                "at most {} reports per hour",
                policy.hourly_cap
            )));
        }
        if counts.last_day >= policy.daily_cap {
            return Err(ModerationError::RateLimited(format!(
                "at most {} reports per 24 hours",
                policy.daily_cap
            )));
        }

        let report = Report {
            id: Uuid::new_v4(),
            reporter_id,
            target: request.target,
            violation_category: request.violation_category,
            severity_level: request.violation_category.severity(),
            status: ReportStatus::Pending,
            explanation,
            created_at: now,
        };
        tx.insert_report(&report).await?;
        tx.record(
            &AuditEntry::new(now, reporter_id, "report.submitted", subject::REPORT, report.id)
                .with_detail(report.severity_level.as_str()),
        )
        .await?;
        tx.commit().await?;

        crate::metrics::record_report(report.severity_level.as_str());
        info!(report = %report.id, severity = %report.severity_level, "Report filed");
        Ok(report)
    }

    /// Fetch a report. Visible to its reporter and to anyone who may triage it.
    pub async fn get(
        &self,
        principal: &Principal,
        report_id: Uuid,
    ) -> ModerationResult<Report> {
        let mut tx = self.engine.store.begin().await?;
        let report = tx
            .find_report(report_id)
            .await?
            .ok_or_else(|| ModerationError::not_found(format!("report {report_id} not found")))?;

        if report.reporter_id == principal.id() {
            return Ok(report);
        }
        let community = tx.lookup(report.target).await?.map(|c| c.community_id);
        if principal.can_act_at(Tier::Community, community) {
            Ok(report)
        } else {
            Err(ModerationError::forbidden("not allowed to view this report"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use proptest::prelude::*;

    fn spam(target: TargetRef) -> ReportRequest {
        ReportRequest {
            target,
            violation_category: ViolationCategory::Spam,
            explanation: None,
        }
    }

    #[tokio::test]
    async fn report_starts_pending_with_derived_severity() {
        let f = fixture().await;
        let target = post(&f.db, Uuid::new_v4(), Uuid::new_v4()).await;

        let report = f.engine.intake().submit(Uuid::new_v4(), spam(target)).await.unwrap();
        assert_eq!(report.status, ReportStatus::Pending);
        assert_eq!(report.severity_level, sanction_proto::Severity::Medium);
        assert_eq!(report.created_at, start());
    }

    #[tokio::test]
    async fn missing_target_is_not_found() {
        let f = fixture().await;
        let err = f
            .engine
            .intake()
            .submit(Uuid::new_v4(), spam(TargetRef::Comment(Uuid::new_v4())))
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::NotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_within_window_conflicts_then_expires() {
        let f = fixture().await;
        let reporter = Uuid::new_v4();
        let target = post(&f.db, Uuid::new_v4(), Uuid::new_v4()).await;

        f.engine.intake().submit(reporter, spam(target)).await.unwrap();

        f.clock.advance(Duration::hours(23));
        let err = f.engine.intake().submit(reporter, spam(target)).await.unwrap_err();
        assert!(matches!(err, ModerationError::Conflict(_)));

        // Exactly 24 hours after the first report.
        f.clock.advance(Duration::hours(1));
        f.engine.intake().submit(reporter, spam(target)).await.unwrap();
    }

    #[tokio::test]
    async fn eleventh_report_in_an_hour_is_rate_limited() {
        let f = fixture().await;
        let reporter = Uuid::new_v4();
        let community = Uuid::new_v4();

        for _ in 0..10 {
            let target = post(&f.db, Uuid::new_v4(), community).await;
            f.engine.intake().submit(reporter, spam(target)).await.unwrap();
            f.clock.advance(Duration::minutes(1));
        }

        let target = post(&f.db, Uuid::new_v4(), community).await;
        let err = f.engine.intake().submit(reporter, spam(target)).await.unwrap_err();
        assert!(matches!(err, ModerationError::RateLimited(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn fifty_first_report_in_a_day_is_rate_limited() {
        let f = fixture().await;
        let reporter = Uuid::new_v4();
        let community = Uuid::new_v4();

        for _ in 0..5 {
            for _ in 0..10 {
                let target = post(&f.db, Uuid::new_v4(), community).await;
                f.engine.intake().submit(reporter, spam(target)).await.unwrap();
            }
            f.clock.advance(Duration::hours(1));
        }

        let target = post(&f.db, Uuid::new_v4(), community).await;
        let mut request = spam(target);
        request.violation_category = ViolationCategory::Threats;
        let err = f.engine.intake().submit(reporter, request).await.unwrap_err();
        assert!(matches!(err, ModerationError::RateLimited(_)));
    }

    #[tokio::test]
    async fn low_trust_reporters_are_refused() {
        let mut f = fixture().await;
        f.engine.reports.min_reporter_trust = 5;
        let reporter = Uuid::new_v4();
        let target = post(&f.db, Uuid::new_v4(), Uuid::new_v4()).await;

        let err = f.engine.intake().submit(reporter, spam(target)).await.unwrap_err();
        assert!(matches!(err, ModerationError::Authorization(_)));

        f.reputation.set_trust_score(reporter, 5, start()).await.unwrap();
        f.engine.intake().submit(reporter, spam(target)).await.unwrap();
    }

    #[tokio::test]
    async fn reports_are_private_to_reporter_and_moderators() {
        let f = fixture().await;
        let reporter = Uuid::new_v4();
        let community = Uuid::new_v4();
        let target = post(&f.db, Uuid::new_v4(), community).await;
        let report = f.engine.intake().submit(reporter, spam(target)).await.unwrap();

        let intake = f.engine.intake();
        assert!(intake.get(&Principal::Member { id: reporter }, report.id).await.is_ok());
        assert!(intake.get(&moderator(community), report.id).await.is_ok());
        let err = intake
            .get(&Principal::Member { id: Uuid::new_v4() }, report.id)
            .await
            .unwrap_err();
        assert!(matches!(err, ModerationError::Authorization(_)));
    }

    fn other_with(explanation: String) -> (usize, ModerationResult<Report>) {
        let len = explanation.trim().chars().count();
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = rt.block_on(async {
            let f = fixture().await;
            let target = post(&f.db, Uuid::new_v4(), Uuid::new_v4()).await;
            let request = ReportRequest {
                target,
                violation_category: ViolationCategory::Other,
                explanation: Some(explanation),
            };
            f.engine.intake().submit(Uuid::new_v4(), request).await
        });
        (len, result)
    }

    #[test]
    fn other_explanation_boundary_is_twenty() {
        let (_, short) = other_with("x".repeat(19));
        assert!(matches!(short, Err(ModerationError::Validation(_))));
        let (_, exact) = other_with("x".repeat(20));
        assert!(exact.is_ok());
        // Surrounding whitespace does not count.
        let (_, padded) = other_with(format!("   {}   ", "x".repeat(19)));
        assert!(matches!(padded, Err(ModerationError::Validation(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn other_explanation_length_decides(text in "[a-z ]{0,40}") {
            let (len, result) = other_with(text);
            if len >= 20 {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(ModerationError::Validation(_))));
            }
        }
    }
}
